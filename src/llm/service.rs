use super::client::{CompletionRequest, LlmClient};
use super::parse::{self, Parsed};
use super::prompt;
use super::retry::{with_retry, RetryPolicy};
use super::types::{ChoiceQuestion, QaPair};
use crate::config::Config;
use crate::editor::Suggestion;
use crate::PromptsmithError;
use std::sync::Arc;

/// Model-backed operations the wizard and editor depend on.
///
/// Every method is fallible. Callers treat any error as "nothing changed".
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PromptService: Send + Sync {
    /// Three to five plain clarifying questions
    async fn generate_questions(&self, prompt: &str) -> Result<Parsed<Vec<String>>, PromptsmithError>;

    /// One plain question unlike `existing`
    async fn regenerate_question(
        &self,
        prompt: &str,
        existing: &[String],
    ) -> Result<Parsed<String>, PromptsmithError>;

    /// Clarifying questions whose choices end with the free-form sentinel
    async fn generate_questions_with_choices(
        &self,
        prompt: &str,
    ) -> Result<Parsed<Vec<ChoiceQuestion>>, PromptsmithError>;

    /// One multiple-choice question unlike `existing`
    async fn regenerate_question_with_choices(
        &self,
        prompt: &str,
        existing: &[String],
    ) -> Result<Parsed<ChoiceQuestion>, PromptsmithError>;

    async fn synthesize_prompt(&self, original: &str, qa: &[QaPair]) -> Result<String, PromptsmithError>;

    /// Like `synthesize_prompt`, asking for a materially different structure
    async fn regenerate_prompt(&self, original: &str, qa: &[QaPair]) -> Result<String, PromptsmithError>;

    async fn optimize_prompt(
        &self,
        base: &str,
        suggestions: &[Suggestion],
        guidance: &str,
    ) -> Result<String, PromptsmithError>;
}

/// [`PromptService`] on top of any [`LlmClient`], with retries around each call
pub struct LlmPromptService {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    max_tokens: u32,
    temperature: f32,
}

impl LlmPromptService {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    pub fn from_config(client: Arc<dyn LlmClient>, config: &Config) -> Self {
        Self {
            client,
            retry: RetryPolicy::from(&config.retry),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn run(&self, name: &str, request: CompletionRequest) -> Result<String, PromptsmithError> {
        tracing::info!(
            operation = name,
            prompt_length = request.messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "API request"
        );
        let text = with_retry(&self.retry, name, || self.client.complete(&request)).await?;
        tracing::debug!(operation = name, response_length = text.len(), "API response");
        Ok(text)
    }

    fn request(&self, user_prompt: String) -> CompletionRequest {
        CompletionRequest::prompt(user_prompt)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

/// Model text that is empty after trimming counts as a failed call
fn non_blank(text: String, what: &str) -> Result<String, PromptsmithError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PromptsmithError::Llm(format!("Model returned an empty {what}")));
    }
    Ok(trimmed.to_string())
}

#[async_trait::async_trait]
impl PromptService for LlmPromptService {
    async fn generate_questions(&self, prompt: &str) -> Result<Parsed<Vec<String>>, PromptsmithError> {
        let request = CompletionRequest::prompt(prompt::questions_user_prompt(prompt))
            .with_system(prompt::questions_system_prompt())
            .with_temperature(self.temperature)
            .with_max_tokens(300);

        let text = self.run("generate-questions", request).await?;
        Ok(parse::parse_question_list(&text))
    }

    async fn regenerate_question(
        &self,
        prompt: &str,
        existing: &[String],
    ) -> Result<Parsed<String>, PromptsmithError> {
        let request =
            CompletionRequest::prompt(prompt::regenerate_question_user_prompt(prompt, existing))
                .with_system(prompt::regenerate_question_system_prompt())
                .with_temperature(self.temperature)
                .with_max_tokens(100);

        let text = self.run("regenerate-question", request).await?;
        Ok(parse::parse_single_question(&text))
    }

    async fn generate_questions_with_choices(
        &self,
        prompt: &str,
    ) -> Result<Parsed<Vec<ChoiceQuestion>>, PromptsmithError> {
        let request = self.request(prompt::choice_questions_prompt(prompt));
        let text = self.run("generate-questions-with-choices", request).await?;
        Ok(parse::parse_choice_questions(&text))
    }

    async fn regenerate_question_with_choices(
        &self,
        prompt: &str,
        existing: &[String],
    ) -> Result<Parsed<ChoiceQuestion>, PromptsmithError> {
        let request = self.request(prompt::regenerate_choice_question_prompt(prompt, existing));
        let text = self.run("regenerate-question-with-choices", request).await?;
        Ok(parse::parse_choice_question(&text))
    }

    async fn synthesize_prompt(&self, original: &str, qa: &[QaPair]) -> Result<String, PromptsmithError> {
        let request = self.request(prompt::synthesis_prompt(original, qa, false));
        let text = self.run("synthesize-prompt", request).await?;
        non_blank(text, "prompt")
    }

    async fn regenerate_prompt(&self, original: &str, qa: &[QaPair]) -> Result<String, PromptsmithError> {
        let request = self.request(prompt::synthesis_prompt(original, qa, true));
        let text = self.run("regenerate-prompt", request).await?;
        non_blank(text, "prompt")
    }

    async fn optimize_prompt(
        &self,
        base: &str,
        suggestions: &[Suggestion],
        guidance: &str,
    ) -> Result<String, PromptsmithError> {
        let request = self.request(prompt::optimization_prompt(base, suggestions, guidance));
        let text = self.run("optimize-prompt", request).await?;
        non_blank(text, "optimized prompt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, OTHER_CHOICE};
    use std::time::Duration;

    fn service(client: MockLlmClient) -> LlmPromptService {
        LlmPromptService::new(Arc::new(client)).with_retry_policy(RetryPolicy {
            retries: 1,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.5,
        })
    }

    #[tokio::test]
    async fn test_generate_questions_parses_lines() {
        let mut client = MockLlmClient::new();
        client
            .expect_complete()
            .withf(|request| {
                request.max_tokens == 300
                    && request.system.as_deref().unwrap_or_default().contains("3-5")
            })
            .returning(|_| Ok("1. Who is it for?\n2. How long should it be?".to_string()));

        let questions = service(client).generate_questions("a dog story").await.unwrap();
        assert_eq!(
            questions,
            Parsed::Ok(vec![
                "Who is it for?".to_string(),
                "How long should it be?".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_choices_parse_error_keeps_raw() {
        let mut client = MockLlmClient::new();
        client
            .expect_complete()
            .returning(|_| Ok("Sorry, no JSON today".to_string()));

        let parsed = service(client)
            .generate_questions_with_choices("idea")
            .await
            .unwrap();
        assert_eq!(
            parsed,
            Parsed::ParseError {
                raw: "Sorry, no JSON today".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_regenerate_choice_question() {
        let mut client = MockLlmClient::new();
        client
            .expect_complete()
            .withf(|request| request.messages[0].content.contains("1. Existing?"))
            .returning(|_| Ok(r#"{"question":"Format?","choices":["Essay","List"]}"#.to_string()));

        let question = service(client)
            .regenerate_question_with_choices("idea", &["Existing?".to_string()])
            .await
            .unwrap()
            .ok()
            .unwrap();
        assert_eq!(question.question, "Format?");
        assert_eq!(question.choices.last().map(String::as_str), Some(OTHER_CHOICE));
    }

    #[tokio::test]
    async fn test_call_is_retried() {
        let mut client = MockLlmClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(PromptsmithError::Llm("503".to_string())));
        client
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("  A refined prompt  ".to_string()));

        let prompt = service(client)
            .synthesize_prompt("idea", &[QaPair::new("Who?", "Kids")])
            .await
            .unwrap();
        assert_eq!(prompt, "A refined prompt");
    }

    #[tokio::test]
    async fn test_failure_after_retries_propagates() {
        let mut client = MockLlmClient::new();
        client
            .expect_complete()
            .times(2)
            .returning(|_| Err(PromptsmithError::Llm("down".to_string())));

        let result = service(client).regenerate_prompt("idea", &[]).await;
        assert!(matches!(result, Err(PromptsmithError::Llm(_))));
    }

    #[tokio::test]
    async fn test_blank_optimization_is_error() {
        let mut client = MockLlmClient::new();
        client.expect_complete().returning(|_| Ok("   ".to_string()));

        let result = service(client).optimize_prompt("base", &[], "shorter").await;
        assert!(matches!(result, Err(PromptsmithError::Llm(_))));
    }

    #[tokio::test]
    async fn test_optimize_sends_suggestions() {
        let mut client = MockLlmClient::new();
        client
            .expect_complete()
            .withf(|request| {
                let content = &request.messages[0].content;
                content.contains("Replace \"story\" with \"poem\"") && content.contains("for kids")
            })
            .returning(|_| Ok("Write a poem for kids.".to_string()));

        let suggestions = vec![Suggestion {
            original_text: "story".to_string(),
            replacement_text: "poem".to_string(),
            start_index: 8,
            end_index: 13,
        }];
        let rewritten = service(client)
            .optimize_prompt("Write a story.", &suggestions, "for kids")
            .await
            .unwrap();
        assert_eq!(rewritten, "Write a poem for kids.");
    }
}
