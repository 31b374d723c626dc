use crate::config::Config;
use crate::PromptsmithError;
use serde::{Deserialize, Serialize};

use super::providers::anthropic::AnthropicClient;
use super::providers::deepseek::DeepSeekClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One text completion request, independent of provider
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A single user turn
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::conversation(vec![ChatMessage::user(text)])
    }

    pub fn conversation(messages: Vec<ChatMessage>) -> Self {
        Self {
            system: None,
            messages,
            max_tokens: 2048,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Trait for LLM clients
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Return the model's text for `request`
    async fn complete(&self, request: &CompletionRequest) -> Result<String, PromptsmithError>;
}

/// Create an LLM client based on configuration
pub fn create_client(config: &Config) -> Result<Box<dyn LlmClient>, PromptsmithError> {
    let api_key = || {
        std::env::var(&config.llm.api_key_env).map_err(|_| {
            PromptsmithError::Config(format!(
                "API key not found in environment variable: {}",
                config.llm.api_key_env
            ))
        })
    };

    match config.llm.provider.as_str() {
        "deepseek" => Ok(Box::new(DeepSeekClient::new(
            api_key()?,
            config.llm.model.clone(),
            config.llm.base_url.clone(),
        ))),
        "anthropic" => Ok(Box::new(AnthropicClient::new(
            api_key()?,
            config.llm.model.clone(),
            config.llm.base_url.clone(),
        ))),
        provider => Err(PromptsmithError::Config(format!(
            "Unsupported LLM provider: {}",
            provider
        ))),
    }
}

// Re-export async_trait for providers
pub use async_trait::async_trait;
