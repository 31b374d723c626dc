pub mod client;
pub mod fallback;
pub mod parse;
pub mod prompt;
pub mod providers;
pub mod retry;
pub mod service;
mod types;

pub use client::{create_client, ChatMessage, CompletionRequest, LlmClient, Role};
pub use parse::Parsed;
pub use retry::{with_retry, RetryPolicy};
pub use service::{LlmPromptService, PromptService};
pub use types::{ChoiceQuestion, QaPair, OTHER_CHOICE};

#[cfg(test)]
pub use client::MockLlmClient;
#[cfg(test)]
pub use service::MockPromptService;
