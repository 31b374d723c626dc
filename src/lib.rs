pub mod chat;
pub mod config;
pub mod editor;
pub mod export;
pub mod llm;
pub mod tui;
pub mod wizard;

pub use config::Config;
pub use editor::SuggestionEditor;
pub use wizard::Wizard;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptsmithError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Response is stale: editor moved from revision {expected} to {current}")]
    StaleResponse { expected: u64, current: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// User input the wizard declines to act on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter an initial prompt to continue")]
    EmptyIdea,

    #[error("Please answer all {0} remaining questions to continue")]
    Unanswered(usize),

    #[error("Complete previous steps before opening step {0}")]
    StepLocked(u8),

    #[error("No question at index {0}")]
    NoSuchQuestion(usize),

    #[error("No choice {choice} for question {question}")]
    NoSuchChoice { question: usize, choice: usize },
}

pub type Result<T> = std::result::Result<T, PromptsmithError>;
