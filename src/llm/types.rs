use serde::{Deserialize, Serialize};

/// Last choice of every multiple-choice question; picking it means a free-form answer
pub const OTHER_CHOICE: &str = "Other (please specify)";

/// A clarifying question and the user's answer to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A clarifying question with suggested answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceQuestion {
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

impl ChoiceQuestion {
    /// Builds a question whose choices end with [`OTHER_CHOICE`]
    pub fn new<I, S>(question: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut question = Self {
            question: question.into(),
            choices: choices.into_iter().map(Into::into).collect(),
        };
        question.ensure_other_choice();
        question
    }

    /// Append the free-form sentinel unless it is already last
    pub fn ensure_other_choice(&mut self) {
        self.choices.retain(|c| !c.trim().is_empty());
        if self.choices.last().map(String::as_str) != Some(OTHER_CHOICE) {
            self.choices.retain(|c| c != OTHER_CHOICE);
            self.choices.push(OTHER_CHOICE.to_string());
        }
    }

    /// Index of the free-form sentinel
    pub fn other_index(&self) -> usize {
        self.choices.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_sentinel() {
        let q = ChoiceQuestion::new("Tone?", ["Formal", "Casual"]);
        assert_eq!(q.choices, vec!["Formal", "Casual", OTHER_CHOICE]);
        assert_eq!(q.other_index(), 2);
    }

    #[test]
    fn test_sentinel_not_duplicated() {
        let q = ChoiceQuestion::new("Tone?", ["Formal", OTHER_CHOICE]);
        assert_eq!(q.choices, vec!["Formal", OTHER_CHOICE]);
    }

    #[test]
    fn test_misplaced_sentinel_moved_last() {
        let q = ChoiceQuestion::new("Tone?", [OTHER_CHOICE, "Formal", ""]);
        assert_eq!(q.choices, vec!["Formal", OTHER_CHOICE]);
    }
}
