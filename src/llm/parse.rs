//! Turning model text into typed values.
//!
//! Parsers never invent content. When the text does not have the requested
//! shape they return [`Parsed::ParseError`] with the raw text and the caller
//! picks a fallback.

use super::types::ChoiceQuestion;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Ok(T),
    ParseError { raw: String },
}

impl<T> Parsed<T> {
    fn error(raw: &str) -> Self {
        Parsed::ParseError {
            raw: raw.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Parsed::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Parsed::Ok(value) => Some(value),
            Parsed::ParseError { .. } => None,
        }
    }

    /// Use the parsed value, or build a fallback from the raw text
    pub fn unwrap_or_else(self, fallback: impl FnOnce(&str) -> T) -> T {
        match self {
            Parsed::Ok(value) => value,
            Parsed::ParseError { raw } => fallback(&raw),
        }
    }
}

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").expect("valid list marker regex"));

static FIRST_QUESTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+\?").expect("valid question regex"));

/// Strip markdown code blocks from LLM response
pub fn strip_markdown_code_blocks(text: &str) -> String {
    let text = text.trim();

    // Check for ```json or ``` at start
    if text.starts_with("```") {
        // Find the end of the first line (after ```json or ```)
        let start = text.find('\n').map(|i| i + 1).unwrap_or(text.len());

        // Find the closing ``` (search from after the opening)
        let end = text[start..]
            .rfind("```")
            .map(|i| start + i)
            .unwrap_or(text.len());

        return text[start..end].trim().to_string();
    }

    text.to_string()
}

/// A JSON array of strings, or one question per line
pub fn parse_question_list(text: &str) -> Parsed<Vec<String>> {
    let body = strip_markdown_code_blocks(text);

    if let Ok(questions) = serde_json::from_str::<Vec<String>>(&body) {
        let questions: Vec<String> = questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if !questions.is_empty() {
            return Parsed::Ok(questions);
        }
    }

    let questions: Vec<String> = body
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|line| line.ends_with('?') && line.chars().count() > 5)
        .collect();

    if questions.is_empty() {
        tracing::warn!("No questions found in model response");
        Parsed::error(text)
    } else {
        Parsed::Ok(questions)
    }
}

/// A JSON array of `{question, choices}` objects
pub fn parse_choice_questions(text: &str) -> Parsed<Vec<ChoiceQuestion>> {
    let body = strip_markdown_code_blocks(text);

    match serde_json::from_str::<Vec<ChoiceQuestion>>(&body) {
        Ok(items) => {
            let questions: Vec<ChoiceQuestion> = items
                .into_iter()
                .filter(|item| !item.question.trim().is_empty())
                .map(normalize)
                .collect();
            if questions.is_empty() {
                Parsed::error(text)
            } else {
                Parsed::Ok(questions)
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Error parsing questions response");
            Parsed::error(text)
        }
    }
}

/// A single `{question, choices}` object
pub fn parse_choice_question(text: &str) -> Parsed<ChoiceQuestion> {
    let body = strip_markdown_code_blocks(text);

    match serde_json::from_str::<ChoiceQuestion>(&body) {
        Ok(item) if !item.question.trim().is_empty() => Parsed::Ok(normalize(item)),
        Ok(_) => Parsed::error(text),
        Err(e) => {
            tracing::warn!(error = %e, "Error parsing regenerated question response");
            Parsed::error(text)
        }
    }
}

/// One plain question; prose around it is dropped
pub fn parse_single_question(text: &str) -> Parsed<String> {
    let question = text.trim();
    if question.ends_with('?') {
        return Parsed::Ok(question.to_string());
    }

    match FIRST_QUESTION.find(question) {
        Some(found) => {
            tracing::debug!(original = question, "Extracted question from response");
            Parsed::Ok(found.as_str().trim().to_string())
        }
        None => Parsed::error(text),
    }
}

fn normalize(mut item: ChoiceQuestion) -> ChoiceQuestion {
    item.question = item.question.trim().to_string();
    item.ensure_other_choice();
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::OTHER_CHOICE;

    #[test]
    fn test_strip_markdown_code_blocks() {
        assert_eq!(strip_markdown_code_blocks("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_markdown_code_blocks("```\n{}\n```\n"), "{}");
        assert_eq!(strip_markdown_code_blocks("  plain  "), "plain");
    }

    #[test]
    fn test_question_list_from_json() {
        let parsed = parse_question_list(r#"["Who reads it?", " What tone? "]"#);
        assert_eq!(
            parsed,
            Parsed::Ok(vec!["Who reads it?".to_string(), "What tone?".to_string()])
        );
    }

    #[test]
    fn test_question_list_from_numbered_lines() {
        let text = "Here are some questions:\n1. Who is the audience?\n2) How long should it be?\n- Any style?\nThanks!";
        let parsed = parse_question_list(text).ok().unwrap();
        assert_eq!(
            parsed,
            vec![
                "Who is the audience?",
                "How long should it be?",
                "Any style?"
            ]
        );
    }

    #[test]
    fn test_question_list_drops_short_lines() {
        let parsed = parse_question_list("Why?\nWhat is the deadline?").ok().unwrap();
        assert_eq!(parsed, vec!["What is the deadline?"]);
    }

    #[test]
    fn test_question_list_without_questions_is_error() {
        let parsed = parse_question_list("I cannot help with that.");
        assert_eq!(
            parsed,
            Parsed::ParseError {
                raw: "I cannot help with that.".to_string()
            }
        );
    }

    #[test]
    fn test_choice_questions_adds_sentinel() {
        let text = r#"```json
[
  {"question": "Audience?", "choices": ["Kids", "Adults", "Other (please specify)"]},
  {"question": "Length?", "choices": ["Short", "Long"]},
  {"question": "  ", "choices": []}
]
```"#;
        let questions = parse_choice_questions(text).ok().unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].choices.len(), 3);
        assert_eq!(questions[1].choices, vec!["Short", "Long", OTHER_CHOICE]);
    }

    #[test]
    fn test_choice_questions_not_json() {
        assert!(!parse_choice_questions("1. Audience?").is_ok());
        assert!(!parse_choice_questions("[]").is_ok());
    }

    #[test]
    fn test_choice_question_object() {
        let parsed = parse_choice_question(r#"{"question":"Format?","choices":["List"]}"#);
        assert_eq!(
            parsed.ok().unwrap().choices,
            vec!["List".to_string(), OTHER_CHOICE.to_string()]
        );
        assert!(!parse_choice_question("nope").is_ok());
    }

    #[test]
    fn test_single_question_extraction() {
        assert_eq!(
            parse_single_question("  What format do you need?  ").ok().unwrap(),
            "What format do you need?"
        );
        assert_eq!(
            parse_single_question("Sure. What format do you need? Let me know.")
                .ok()
                .unwrap(),
            "What format do you need?"
        );
        assert!(!parse_single_question("No question here.").is_ok());
    }

    #[test]
    fn test_unwrap_or_else_sees_raw() {
        let parsed: Parsed<Vec<String>> = parse_question_list("garbage");
        let fallback = parsed.unwrap_or_else(|raw| vec![raw.to_uppercase()]);
        assert_eq!(fallback, vec!["GARBAGE"]);
    }
}
