use super::types::{QaPair, OTHER_CHOICE};
use crate::editor::{char_slice, Suggestion};

/// Generate the system prompt for question generation
pub fn questions_system_prompt() -> String {
    "Generate 3-5 follow-up questions to refine a prompt. Questions should address gaps, \
     clarify goals, identify constraints, and understand use cases. Return one question per line."
        .to_string()
}

/// Generate the user prompt for question generation
pub fn questions_user_prompt(initial_prompt: &str) -> String {
    let excerpt = char_slice(initial_prompt, 0, 500);
    format!(
        r#"Initial prompt: "{excerpt}"

Generate 3-5 follow-up questions to help refine this prompt."#
    )
}

pub fn regenerate_question_system_prompt() -> String {
    "Generate a new follow-up question different from existing ones. Return ONLY the question."
        .to_string()
}

/// Only the first three existing questions are echoed back
pub fn regenerate_question_user_prompt(initial_prompt: &str, existing: &[String]) -> String {
    let excerpt = char_slice(initial_prompt, 0, 300);
    let existing = existing
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Initial prompt: "{excerpt}"

Existing questions:
{existing}

Generate a new, different follow-up question."#
    )
}

/// Ask for five questions, each with multiple-choice answers
pub fn choice_questions_prompt(initial_prompt: &str) -> String {
    format!(
        r#"Generate 5 questions with multiple-choice options to help refine the following prompt: "{initial_prompt}".

For each question:
1. Focus on different aspects of the prompt that could be improved or clarified
2. Make sure the questions are diverse and don't overlap too much
3. Provide 3-4 specific answer choices for each question
4. Always include "{OTHER_CHOICE}" as the last option

Format your response as a JSON array with the following structure:
[
  {{
    "question": "Question text here?",
    "choices": ["Option 1", "Option 2", "Option 3", "{OTHER_CHOICE}"]
  }}
]

Only return the JSON array, nothing else."#
    )
}

pub fn regenerate_choice_question_prompt(initial_prompt: &str, existing: &[String]) -> String {
    let existing = existing
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Generate a new question with multiple-choice options to help refine the following prompt: "{initial_prompt}".

The question should be different from these existing questions:
{existing}

For the new question:
1. Focus on an aspect of the prompt that could be improved or clarified that hasn't been addressed yet
2. Make sure the question is different from the existing ones
3. Provide 3-4 specific answer choices
4. Always include "{OTHER_CHOICE}" as the last option

Format your response as a JSON object with the following structure:
{{
  "question": "Question text here?",
  "choices": ["Option 1", "Option 2", "Option 3", "{OTHER_CHOICE}"]
}}

Only return the JSON object, nothing else."#
    )
}

fn format_qa(qa: &[QaPair]) -> String {
    qa.iter()
        .map(|pair| format!("Q: {}\nA: {}", pair.question, pair.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the RICCE synthesis prompt; `fresh_approach` asks for a different structure
pub fn synthesis_prompt(initial_prompt: &str, qa: &[QaPair], fresh_approach: bool) -> String {
    let questions_and_answers = format_qa(qa);
    let mut prompt = format!(
        r#"I want to refine this initial prompt: "{initial_prompt}"

Based on the following questions and answers, create an improved version of the prompt that incorporates all the details and clarifications:

{questions_and_answers}

Generate a well-structured, detailed prompt that follows the RICCE framework:
- Role: Who the AI should act as
- Instruction: What the AI should do
- Context: Relevant background information
- Criteria: What makes a good response
- Example: (if applicable)

The refined prompt should be comprehensive but concise, and should incorporate all the information from the questions and answers."#
    );

    if fresh_approach {
        prompt.push_str(
            "\n\nIMPORTANT: Generate a completely different approach from any previous attempts, \
             with a fresh structure and perspective.",
        );
    }

    prompt
}

/// Ask for a rewrite that applies each suggestion and the guidance
pub fn optimization_prompt(base: &str, suggestions: &[Suggestion], guidance: &str) -> String {
    let mut sections = vec![format!(
        "I have a prompt that I want to optimize:\n\n\"{base}\""
    )];

    if !suggestions.is_empty() {
        let list = suggestions
            .iter()
            .map(|s| {
                format!(
                    "- Replace \"{}\" with \"{}\"",
                    s.original_text, s.replacement_text
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Please apply these specific improvements:\n{list}"));
    }

    if !guidance.trim().is_empty() {
        sections.push(format!(
            "Also consider this additional context:\n{}",
            guidance.trim()
        ));
    }

    sections.push(
        "Please provide an optimized version of the prompt that incorporates these suggestions \
         while maintaining the original intent and structure. The optimized prompt should still \
         follow the RICCE framework. Respond with the prompt only."
            .to_string(),
    );

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_prompt_truncates_idea() {
        let idea = "a".repeat(800);
        let prompt = questions_user_prompt(&idea);
        assert!(prompt.contains(&"a".repeat(500)));
        assert!(!prompt.contains(&"a".repeat(501)));
    }

    #[test]
    fn test_regenerate_prompt_echoes_three_questions() {
        let existing: Vec<String> = (1..=5).map(|i| format!("Question {i}?")).collect();
        let prompt = regenerate_question_user_prompt("idea", &existing);
        assert!(prompt.contains("Question 3?"));
        assert!(!prompt.contains("Question 4?"));
    }

    #[test]
    fn test_choice_prompt_names_sentinel() {
        assert!(choice_questions_prompt("idea").contains(OTHER_CHOICE));
        let prompt = regenerate_choice_question_prompt("idea", &["Who?".to_string()]);
        assert!(prompt.contains("1. Who?"));
    }

    #[test]
    fn test_synthesis_prompt_lists_answers() {
        let qa = vec![QaPair::new("Audience?", "Kids"), QaPair::new("Tone?", "Playful")];
        let prompt = synthesis_prompt("story", &qa, false);
        assert!(prompt.contains("Q: Audience?\nA: Kids\n\nQ: Tone?\nA: Playful"));
        assert!(prompt.contains("RICCE"));
        assert!(!prompt.contains("completely different approach"));
        assert!(synthesis_prompt("story", &qa, true).contains("completely different approach"));
    }

    #[test]
    fn test_optimization_prompt_sections() {
        let suggestions = vec![Suggestion {
            original_text: "story".to_string(),
            replacement_text: "poem".to_string(),
            start_index: 8,
            end_index: 13,
        }];

        let prompt = optimization_prompt("Write a story", &suggestions, "  ");
        assert!(prompt.contains("- Replace \"story\" with \"poem\""));
        assert!(!prompt.contains("additional context"));

        let prompt = optimization_prompt("Write a story", &[], "for vegans");
        assert!(!prompt.contains("specific improvements"));
        assert!(prompt.contains("additional context:\nfor vegans"));
    }
}
