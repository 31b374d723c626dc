//! The four-step refinement flow: idea, clarifying questions, prompt editing, result.

mod question;

pub use question::QuestionItem;

use crate::editor::{OptimizeOutcome, SuggestionEditor};
use crate::llm::{fallback, ChoiceQuestion, Parsed, PromptService, QaPair};
use crate::{Result, ValidationError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Idea = 1,
    Questions = 2,
    Prompt = 3,
    Result = 4,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Idea, Step::Questions, Step::Prompt, Step::Result];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Step> {
        Self::ALL.into_iter().find(|step| step.number() == number)
    }

    pub fn previous(self) -> Step {
        Step::from_number(self.number().saturating_sub(1)).unwrap_or(Step::Idea)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Idea => "Idea",
            Step::Questions => "Questions",
            Step::Prompt => "Prompt",
            Step::Result => "Result",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

pub struct Wizard {
    session_id: String,
    step: Step,
    /// Completion flags for steps 1 to 3; the result step is never "completed"
    completed: [bool; 3],
    idea: String,
    questions: Vec<QuestionItem>,
    editor: SuggestionEditor,
    generated_prompt: String,
    refined_prompt: String,
    guidance: String,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(session_id = %session_id, "Prompt refiner session started");

        Self {
            session_id,
            step: Step::Idea,
            completed: [false; 3],
            idea: String::new(),
            questions: Vec::new(),
            editor: SuggestionEditor::default(),
            generated_prompt: String::new(),
            refined_prompt: String::new(),
            guidance: String::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn questions(&self) -> &[QuestionItem] {
        &self.questions
    }

    pub fn editor(&self) -> &SuggestionEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut SuggestionEditor {
        &mut self.editor
    }

    /// The prompt as first synthesized from the answers
    pub fn generated_prompt(&self) -> &str {
        &self.generated_prompt
    }

    /// The prompt the user will export
    pub fn refined_prompt(&self) -> &str {
        &self.refined_prompt
    }

    /// Guidance sent with the last optimize request
    pub fn guidance(&self) -> &str {
        &self.guidance
    }

    pub fn is_completed(&self, step: Step) -> bool {
        match step {
            Step::Result => false,
            _ => self.completed[step.number() as usize - 1],
        }
    }

    fn mark_completed(&mut self, step: Step) {
        if step != Step::Result {
            self.completed[step.number() as usize - 1] = true;
        }
    }

    /// A step opens once every step before it is completed
    pub fn can_access(&self, step: Step) -> bool {
        Step::ALL
            .iter()
            .take_while(|earlier| **earlier < step)
            .all(|earlier| self.is_completed(*earlier))
    }

    pub fn set_idea(&mut self, idea: impl Into<String>) {
        self.idea = idea.into();
    }

    /// Leave step 1: generate questions for the idea and open step 2
    pub async fn submit_idea(&mut self, service: &dyn PromptService) -> Result<()> {
        if self.idea.trim().is_empty() {
            tracing::warn!(session_id = %self.session_id, "Empty prompt submission");
            return Err(ValidationError::EmptyIdea.into());
        }

        tracing::info!(
            session_id = %self.session_id,
            prompt_length = self.idea.len(),
            "Step 1 completed"
        );

        self.generate_questions(service).await?;
        self.mark_completed(Step::Idea);
        self.step = Step::Questions;
        Ok(())
    }

    /// Replace the question list with freshly generated questions.
    ///
    /// Unparsable choice questions fall back to plain questions, then to the
    /// built-in defaults.
    pub async fn generate_questions(&mut self, service: &dyn PromptService) -> Result<()> {
        let parsed = service.generate_questions_with_choices(&self.idea).await?;

        let mut generated = match parsed {
            Parsed::Ok(questions) => questions,
            Parsed::ParseError { raw } => {
                tracing::warn!(
                    session_id = %self.session_id,
                    raw = %raw,
                    "Could not parse choice questions, asking for plain questions"
                );
                self.plain_questions(service).await
            }
        };
        if generated.is_empty() {
            generated = fallback::default_choice_questions();
        }

        tracing::info!(
            session_id = %self.session_id,
            question_count = generated.len(),
            "Questions generated successfully"
        );

        self.questions = generated.into_iter().map(QuestionItem::from).collect();
        Ok(())
    }

    async fn plain_questions(&self, service: &dyn PromptService) -> Vec<ChoiceQuestion> {
        match service.generate_questions(&self.idea).await {
            Ok(parsed) => {
                fallback::free_form(parsed.unwrap_or_else(|_| fallback::default_questions()))
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Using default questions");
                fallback::default_choice_questions()
            }
        }
    }

    /// One more question unlike the current ones, with the same fallback
    /// chain as [`Wizard::generate_questions`]
    async fn next_question(&self, service: &dyn PromptService) -> Result<ChoiceQuestion> {
        let existing = self.existing_questions();
        let parsed = service
            .regenerate_question_with_choices(&self.idea, &existing)
            .await?;
        if let Parsed::Ok(question) = parsed {
            return Ok(question);
        }

        let question = match service.regenerate_question(&self.idea, &existing).await {
            Ok(Parsed::Ok(question)) => ChoiceQuestion::new(question, Vec::<String>::new()),
            Ok(Parsed::ParseError { .. }) => fallback::default_choice_question(),
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Using default question");
                fallback::default_choice_question()
            }
        };
        Ok(question)
    }

    fn question_mut(&mut self, index: usize) -> Result<&mut QuestionItem> {
        self.questions
            .get_mut(index)
            .ok_or_else(|| ValidationError::NoSuchQuestion(index).into())
    }

    pub fn select_choice(&mut self, question: usize, choice: usize) -> Result<()> {
        tracing::debug!(session_id = %self.session_id, question, choice, "User selected choice");
        if self.question_mut(question)?.select_choice(choice) {
            Ok(())
        } else {
            Err(ValidationError::NoSuchChoice { question, choice }.into())
        }
    }

    pub fn set_answer(&mut self, question: usize, answer: impl Into<String>) -> Result<()> {
        self.question_mut(question)?.set_answer(answer);
        Ok(())
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.iter().filter(|q| !q.is_answered()).count()
    }

    fn existing_questions(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.question.clone()).collect()
    }

    /// Swap question `index` for a new one; its answer starts over
    pub async fn regenerate_question(
        &mut self,
        service: &dyn PromptService,
        index: usize,
    ) -> Result<()> {
        if index >= self.questions.len() {
            return Err(ValidationError::NoSuchQuestion(index).into());
        }

        let replacement = self.next_question(service).await?;

        tracing::info!(
            session_id = %self.session_id,
            question_index = index,
            new_question = %replacement.question,
            "Question regenerated successfully"
        );

        self.questions[index] = replacement.into();
        Ok(())
    }

    pub async fn add_question(&mut self, service: &dyn PromptService) -> Result<()> {
        let question = self.next_question(service).await?;

        tracing::info!(
            session_id = %self.session_id,
            new_question = %question.question,
            "New question added successfully"
        );

        self.questions.push(question.into());
        Ok(())
    }

    pub fn remove_question(&mut self, index: usize) -> Result<QuestionItem> {
        if index >= self.questions.len() {
            return Err(ValidationError::NoSuchQuestion(index).into());
        }

        let removed = self.questions.remove(index);
        tracing::info!(
            session_id = %self.session_id,
            question_index = index,
            question = %removed.question,
            "User removed question"
        );
        Ok(removed)
    }

    pub fn qa_pairs(&self) -> Vec<QaPair> {
        self.questions.iter().map(QuestionItem::qa_pair).collect()
    }

    /// Leave step 2: synthesize the prompt from the answers and open step 3
    pub async fn submit_answers(&mut self, service: &dyn PromptService) -> Result<()> {
        let unanswered = self.unanswered_count();
        if unanswered > 0 {
            tracing::warn!(
                session_id = %self.session_id,
                unanswered_count = unanswered,
                total_questions = self.questions.len(),
                "Incomplete answers"
            );
            return Err(ValidationError::Unanswered(unanswered).into());
        }

        self.synthesize(service).await?;
        self.mark_completed(Step::Questions);
        self.step = Step::Prompt;
        Ok(())
    }

    async fn synthesize(&mut self, service: &dyn PromptService) -> Result<()> {
        let prompt = service
            .synthesize_prompt(&self.idea, &self.qa_pairs())
            .await?;

        tracing::info!(
            session_id = %self.session_id,
            prompt_length = prompt.len(),
            "Initial prompt generated successfully"
        );

        self.install_prompt(prompt);
        Ok(())
    }

    /// Ask for a differently structured prompt; pending suggestions are dropped
    pub async fn regenerate_prompt(&mut self, service: &dyn PromptService) -> Result<()> {
        let prompt = service
            .regenerate_prompt(&self.idea, &self.qa_pairs())
            .await?;

        tracing::info!(
            session_id = %self.session_id,
            prompt_length = prompt.len(),
            "Prompt regenerated successfully"
        );

        self.install_prompt(prompt);
        Ok(())
    }

    fn install_prompt(&mut self, prompt: String) {
        self.editor.set_base_text(prompt.clone());
        self.refined_prompt = prompt.clone();
        self.generated_prompt = prompt;
    }

    /// Send the editor's suggestions plus `guidance` to the optimizer
    pub async fn optimize(
        &mut self,
        service: &dyn PromptService,
        guidance: &str,
    ) -> Result<OptimizeOutcome> {
        self.guidance = guidance.to_string();

        let outcome = self.editor.optimize(service, guidance).await?;
        if outcome == OptimizeOutcome::Rewritten {
            tracing::info!(
                session_id = %self.session_id,
                optimized_length = self.editor.text().len(),
                "Prompt optimized successfully"
            );
            self.refined_prompt = self.editor.text().to_string();
            self.generated_prompt = self.refined_prompt.clone();
        }

        Ok(outcome)
    }

    /// Leave step 3 for the result
    pub fn finish(&mut self) -> Result<()> {
        if !self.can_access(Step::Prompt) || self.editor.is_blank() {
            return Err(ValidationError::StepLocked(Step::Result.number()).into());
        }

        self.refined_prompt = self.editor.text().to_string();
        self.mark_completed(Step::Prompt);
        self.step = Step::Result;

        tracing::info!(
            session_id = %self.session_id,
            prompt_length = self.refined_prompt.len(),
            "Step 3 completed"
        );
        Ok(())
    }

    pub fn go_back(&mut self) {
        self.step = self.step.previous();
    }

    /// Jump to an unlocked step, generating whatever it needs first
    pub async fn go_to(&mut self, service: &dyn PromptService, target: Step) -> Result<()> {
        if !self.can_access(target) {
            tracing::warn!(
                session_id = %self.session_id,
                current_step = self.step.number(),
                target_step = target.number(),
                "User attempted to access locked step"
            );
            return Err(ValidationError::StepLocked(target.number()).into());
        }

        if target == Step::Questions && self.questions.is_empty() {
            self.generate_questions(service).await?;
        }
        if target == Step::Prompt && self.generated_prompt.is_empty() {
            self.synthesize(service).await?;
        }

        self.step = target;
        Ok(())
    }

    /// Throw everything away and start at step 1 with a new session id
    pub fn restart(&mut self) {
        tracing::info!(session_id = %self.session_id, "Prompt refiner session ended");
        *self = Wizard::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChoiceQuestion, MockPromptService, Parsed};
    use crate::PromptsmithError;

    fn two_questions() -> Vec<ChoiceQuestion> {
        vec![
            ChoiceQuestion::new("Audience?", ["Kids", "Adults"]),
            ChoiceQuestion::new("Length?", ["Short", "Long"]),
        ]
    }

    fn service_with_questions() -> MockPromptService {
        let mut service = MockPromptService::new();
        service
            .expect_generate_questions_with_choices()
            .returning(|_| Ok(Parsed::Ok(two_questions())));
        service
    }

    async fn at_questions(service: &MockPromptService) -> Wizard {
        let mut wizard = Wizard::new();
        wizard.set_idea("A story about a dog");
        wizard.submit_idea(service).await.unwrap();
        wizard
    }

    #[test]
    fn test_step_numbers() {
        assert_eq!(Step::from_number(3), Some(Step::Prompt));
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::Idea.previous(), Step::Idea);
        assert_eq!(Step::Result.previous(), Step::Prompt);
        assert_eq!(Step::Questions.to_string(), "2. Questions");
    }

    #[test]
    fn test_new_wizard_gating() {
        let wizard = Wizard::new();
        assert_eq!(wizard.step(), Step::Idea);
        assert!(wizard.can_access(Step::Idea));
        assert!(!wizard.can_access(Step::Questions));
        assert!(!wizard.can_access(Step::Result));
        assert!(!wizard.session_id().is_empty());
    }

    #[tokio::test]
    async fn test_blank_idea_rejected_without_call() {
        let mut service = MockPromptService::new();
        service.expect_generate_questions_with_choices().never();

        let mut wizard = Wizard::new();
        wizard.set_idea("   ");
        let err = wizard.submit_idea(&service).await.unwrap_err();
        assert!(matches!(
            err,
            PromptsmithError::Validation(ValidationError::EmptyIdea)
        ));
        assert_eq!(wizard.step(), Step::Idea);
    }

    #[tokio::test]
    async fn test_submit_idea_opens_questions() {
        let service = service_with_questions();
        let wizard = at_questions(&service).await;
        assert_eq!(wizard.step(), Step::Questions);
        assert!(wizard.is_completed(Step::Idea));
        assert!(wizard.can_access(Step::Questions));
        assert_eq!(wizard.questions().len(), 2);
        assert_eq!(wizard.unanswered_count(), 2);
    }

    fn unparsable<T>() -> Result<Parsed<T>> {
        Ok(Parsed::ParseError {
            raw: "nonsense".to_string(),
        })
    }

    #[tokio::test]
    async fn test_unparsable_choices_fall_back_to_plain_questions() {
        let mut service = MockPromptService::new();
        service
            .expect_generate_questions_with_choices()
            .returning(|_| unparsable());
        service
            .expect_generate_questions()
            .times(1)
            .returning(|_| Ok(Parsed::Ok(vec!["Who is it for?".to_string()])));

        let mut wizard = Wizard::new();
        wizard.set_idea("idea");
        wizard.submit_idea(&service).await.unwrap();
        assert_eq!(wizard.questions().len(), 1);
        assert_eq!(wizard.questions()[0].question, "Who is it for?");
        assert_eq!(wizard.questions()[0].choices, vec![crate::llm::OTHER_CHOICE]);
    }

    #[tokio::test]
    async fn test_unparsable_questions_fall_back_to_defaults() {
        let mut service = MockPromptService::new();
        service
            .expect_generate_questions_with_choices()
            .returning(|_| unparsable());
        service
            .expect_generate_questions()
            .returning(|_| Err(PromptsmithError::Llm("down".to_string())));

        let mut wizard = Wizard::new();
        wizard.set_idea("idea");
        wizard.submit_idea(&service).await.unwrap();
        assert_eq!(wizard.questions().len(), fallback::default_questions().len());
        // Defaults are free-form only
        assert_eq!(wizard.questions()[0].choices.len(), 1);
    }

    #[tokio::test]
    async fn test_question_failure_keeps_step() {
        let mut service = MockPromptService::new();
        service
            .expect_generate_questions_with_choices()
            .returning(|_| Err(PromptsmithError::Llm("timeout".to_string())));

        let mut wizard = Wizard::new();
        wizard.set_idea("idea");
        assert!(wizard.submit_idea(&service).await.is_err());
        assert_eq!(wizard.step(), Step::Idea);
        assert!(!wizard.is_completed(Step::Idea));
    }

    #[tokio::test]
    async fn test_unanswered_blocks_synthesis() {
        let mut service = service_with_questions();
        service.expect_synthesize_prompt().never();

        let mut wizard = at_questions(&service).await;
        wizard.select_choice(0, 0).unwrap();
        let err = wizard.submit_answers(&service).await.unwrap_err();
        assert!(matches!(
            err,
            PromptsmithError::Validation(ValidationError::Unanswered(1))
        ));
        assert_eq!(wizard.step(), Step::Questions);
    }

    #[tokio::test]
    async fn test_submit_answers_installs_prompt() {
        let mut service = service_with_questions();
        service
            .expect_synthesize_prompt()
            .withf(|original, qa| {
                original == "A story about a dog"
                    && qa == [QaPair::new("Audience?", "Kids"), QaPair::new("Length?", "A novella")]
            })
            .returning(|_, _| Ok("Role: storyteller".to_string()));

        let mut wizard = at_questions(&service).await;
        wizard.select_choice(0, 0).unwrap();
        wizard.select_choice(1, 2).unwrap();
        wizard.set_answer(1, "A novella").unwrap();
        wizard.submit_answers(&service).await.unwrap();

        assert_eq!(wizard.step(), Step::Prompt);
        assert_eq!(wizard.editor().text(), "Role: storyteller");
        assert_eq!(wizard.refined_prompt(), "Role: storyteller");
        assert_eq!(wizard.generated_prompt(), "Role: storyteller");
    }

    #[tokio::test]
    async fn test_regenerate_question_resets_answer() {
        let mut service = service_with_questions();
        service
            .expect_regenerate_question_with_choices()
            .withf(|_, existing| existing.len() == 2)
            .returning(|_, _| Ok(Parsed::Ok(ChoiceQuestion::new("Tone?", ["Funny"]))));

        let mut wizard = at_questions(&service).await;
        wizard.select_choice(1, 0).unwrap();
        wizard.regenerate_question(&service, 1).await.unwrap();

        let question = &wizard.questions()[1];
        assert_eq!(question.question, "Tone?");
        assert_eq!(question.selected, None);
        assert!(question.answer.is_empty());
    }

    #[tokio::test]
    async fn test_add_question_uses_fallback_on_parse_error() {
        let mut service = service_with_questions();
        service
            .expect_regenerate_question_with_choices()
            .returning(|_, _| unparsable());
        service
            .expect_regenerate_question()
            .returning(|_, _| unparsable());

        let mut wizard = at_questions(&service).await;
        wizard.add_question(&service).await.unwrap();
        assert_eq!(wizard.questions().len(), 3);
        assert_eq!(
            wizard.questions()[2],
            QuestionItem::from(fallback::default_choice_question())
        );
    }

    #[tokio::test]
    async fn test_add_question_falls_back_to_plain_question() {
        let mut service = service_with_questions();
        service
            .expect_regenerate_question_with_choices()
            .returning(|_, _| unparsable());
        service
            .expect_regenerate_question()
            .withf(|_, existing| existing.len() == 2)
            .returning(|_, _| Ok(Parsed::Ok("Any deadline?".to_string())));

        let mut wizard = at_questions(&service).await;
        wizard.add_question(&service).await.unwrap();
        assert_eq!(wizard.questions()[2].question, "Any deadline?");
        assert_eq!(wizard.questions()[2].choices.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_question() {
        let service = service_with_questions();
        let mut wizard = at_questions(&service).await;
        let removed = wizard.remove_question(0).unwrap();
        assert_eq!(removed.question, "Audience?");
        assert_eq!(wizard.questions().len(), 1);
        assert!(wizard.remove_question(5).is_err());
    }

    #[tokio::test]
    async fn test_optimize_updates_refined_prompt() {
        let mut service = service_with_questions();
        service
            .expect_synthesize_prompt()
            .returning(|_, _| Ok("Write a story about a dog.".to_string()));
        service
            .expect_optimize_prompt()
            .returning(|_, _, _| Ok("Write a poem about a dog.".to_string()));

        let mut wizard = at_questions(&service).await;
        wizard.select_choice(0, 0).unwrap();
        wizard.select_choice(1, 0).unwrap();
        wizard.submit_answers(&service).await.unwrap();

        wizard.editor_mut().select_range(8, 13);
        assert!(wizard.editor_mut().propose_suggestion("poem"));

        let outcome = wizard.optimize(&service, "").await.unwrap();
        assert_eq!(outcome, OptimizeOutcome::Rewritten);
        assert_eq!(wizard.refined_prompt(), "Write a poem about a dog.");
        assert!(wizard.editor().suggestions().is_empty());

        wizard.finish().unwrap();
        assert_eq!(wizard.step(), Step::Result);
        assert!(wizard.can_access(Step::Result));
    }

    #[tokio::test]
    async fn test_go_to_locked_step() {
        let service = MockPromptService::new();
        let mut wizard = Wizard::new();
        let err = wizard.go_to(&service, Step::Prompt).await.unwrap_err();
        assert!(matches!(
            err,
            PromptsmithError::Validation(ValidationError::StepLocked(3))
        ));
    }

    #[tokio::test]
    async fn test_go_back_and_forward() {
        let service = service_with_questions();
        let mut wizard = at_questions(&service).await;
        wizard.go_back();
        assert_eq!(wizard.step(), Step::Idea);
        wizard.go_to(&service, Step::Questions).await.unwrap();
        assert_eq!(wizard.step(), Step::Questions);
        // Questions were already generated, so no second call was needed
        assert_eq!(wizard.questions().len(), 2);
    }

    #[tokio::test]
    async fn test_finish_requires_prompt() {
        let service = service_with_questions();
        let mut wizard = at_questions(&service).await;
        assert!(wizard.finish().is_err());
    }

    #[tokio::test]
    async fn test_restart_gives_new_session() {
        let service = service_with_questions();
        let mut wizard = at_questions(&service).await;
        let old_id = wizard.session_id().to_string();
        wizard.restart();
        assert_eq!(wizard.step(), Step::Idea);
        assert!(wizard.questions().is_empty());
        assert_ne!(wizard.session_id(), old_id);
    }
}
