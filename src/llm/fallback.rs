//! Defaults callers use when a model response cannot be parsed.

use super::types::ChoiceQuestion;

pub fn default_questions() -> Vec<String> {
    vec![
        "What specific goal are you trying to achieve with this prompt?".to_string(),
        "Who is the target audience for this output?".to_string(),
        "What tone or style would you prefer in the responses?".to_string(),
        "Are there any specific constraints or requirements to consider?".to_string(),
    ]
}

pub fn default_choice_question() -> ChoiceQuestion {
    ChoiceQuestion::new(
        "What other aspects of this prompt would you like to improve?",
        ["Clarity", "Specificity", "Context"],
    )
}

/// [`default_questions`] as free-form choice questions
pub fn default_choice_questions() -> Vec<ChoiceQuestion> {
    free_form(default_questions())
}

/// Plain questions whose only choice is the free-form sentinel
pub fn free_form(questions: impl IntoIterator<Item = String>) -> Vec<ChoiceQuestion> {
    questions
        .into_iter()
        .map(|q| ChoiceQuestion::new(q, Vec::<String>::new()))
        .collect()
}
