use crate::llm::{ChoiceQuestion, QaPair};

/// A clarifying question as the user works through it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionItem {
    pub question: String,
    /// Suggested answers; the last one is the free-form sentinel
    pub choices: Vec<String>,
    pub selected: Option<usize>,
    pub answer: String,
}

impl From<ChoiceQuestion> for QuestionItem {
    fn from(mut item: ChoiceQuestion) -> Self {
        item.ensure_other_choice();
        Self {
            question: item.question,
            choices: item.choices,
            selected: None,
            answer: String::new(),
        }
    }
}

impl QuestionItem {
    pub fn is_other(&self, choice: usize) -> bool {
        choice + 1 == self.choices.len()
    }

    /// Pick a choice. Regular choices become the answer; the sentinel keeps
    /// whatever the user already typed.
    pub fn select_choice(&mut self, choice: usize) -> bool {
        if choice >= self.choices.len() {
            return false;
        }

        self.selected = Some(choice);
        if !self.is_other(choice) {
            self.answer = self.choices[choice].clone();
        }
        true
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answer = answer.into();
    }

    pub fn is_answered(&self) -> bool {
        if !self.answer.trim().is_empty() {
            return true;
        }
        matches!(self.selected, Some(choice) if !self.is_other(choice))
    }

    pub fn qa_pair(&self) -> QaPair {
        QaPair::new(self.question.clone(), self.answer.trim())
    }
}
