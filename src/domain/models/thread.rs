//! Thread domain model.
//!
//! A thread is one end-to-end processing session for a single user
//! prompt, including every rewrite attempt and clarification exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::finding::{Finding, ValidationOutput};

/// Status of a thread in the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadStatus {
    /// The processor is actively generating, validating, or rewriting
    Processing,
    /// Suspended until the user answers follow-up questions
    AwaitingUserInput,
    /// Terminal: a final response has been produced
    Completed,
    /// Terminal: processing failed or validation was impossible
    Error,
}

impl Default for ThreadStatus {
    fn default() -> Self {
        Self::Processing
    }
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "PROCESSING",
            Self::AwaitingUserInput => "AWAITING_USER_INPUT",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PROCESSING" => Some(Self::Processing),
            "AWAITING_USER_INPUT" => Some(Self::AwaitingUserInput),
            "COMPLETED" => Some(Self::Completed),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Type of iteration in the rewriting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationType {
    /// Driven by validation findings
    ArFeedback,
    /// Driven by a question/answer exchange with the user
    UserClarification,
}

/// The decision the LLM took for one rewrite turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LlmDecision {
    /// Iteration 0: no decision was requested yet
    Initial,
    /// The model produced a corrected answer
    Rewrite,
    /// The model asked the user for clarification
    AskQuestions,
    /// The model declared the question unanswerable under the policy
    Impossible,
}

impl LlmDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Rewrite => "REWRITE",
            Self::AskQuestions => "ASK_QUESTIONS",
            Self::Impossible => "IMPOSSIBLE",
        }
    }
}

/// Sub-kind of an AR feedback iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteKind {
    /// The initial generation, before any findings were acted on
    Initial,
    /// A rewrite driven by validation findings
    Rewriting,
    /// A turn that surfaced follow-up questions instead of an answer
    FollowUpQuestion,
    /// The model gave up and explained why no answer exists
    Impossible,
}

/// One question/answer exchange between the model and the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswerExchange {
    /// Questions the model asked
    pub questions: Vec<String>,
    /// The user's answers, in question order; `None` until answered
    pub answers: Option<Vec<String>>,
    /// Whether the user declined to answer
    pub skipped: bool,
}

impl QuestionAnswerExchange {
    /// Create a pending exchange for the given questions.
    pub const fn pending(questions: Vec<String>) -> Self {
        Self {
            questions,
            answers: None,
            skipped: false,
        }
    }
}

/// Variant payload of an iteration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IterationData {
    /// Payload for [`IterationType::ArFeedback`] iterations
    ArFeedback {
        /// Findings recorded for this turn
        findings: Vec<Finding>,
        /// Overall validation outcome for this turn
        validation_output: ValidationOutput,
        /// Index of the finding acted on, if any
        processed_finding_index: Option<usize>,
        /// The model's decision for this turn
        llm_decision: LlmDecision,
        /// Sub-kind of the turn
        rewrite_kind: RewriteKind,
    },
    /// Payload for [`IterationType::UserClarification`] iterations
    Clarification {
        /// The question/answer exchange
        qa_exchange: QuestionAnswerExchange,
        /// Context text derived from the answers, once available
        context_augmentation: Option<String>,
        /// Index of the finding that triggered the questions, if any
        processed_finding_index: Option<usize>,
        /// The decision that led here, if the rewrite loop triggered it
        llm_decision: Option<LlmDecision>,
        /// Validation outcome of the post-clarification re-check
        validation_output: Option<ValidationOutput>,
        /// Findings of the post-clarification re-check
        validation_findings: Vec<Finding>,
    },
}

impl IterationData {
    /// The iteration type this payload belongs to.
    pub const fn iteration_type(&self) -> IterationType {
        match self {
            Self::ArFeedback { .. } => IterationType::ArFeedback,
            Self::Clarification { .. } => IterationType::UserClarification,
        }
    }
}

/// One recorded step of the rewrite loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedIteration {
    /// Position in the budget sequence; 0 is the initial generation
    pub iteration_number: u32,
    /// Whether this step was findings-driven or clarification-driven
    pub iteration_type: IterationType,
    /// The answer being revised (empty for iteration 0)
    pub original_answer: String,
    /// The result of the revision
    pub rewritten_answer: String,
    /// The exact prompt that produced `rewritten_answer`
    pub rewriting_prompt: String,
    /// Variant payload
    pub data: IterationData,
}

impl TypedIteration {
    /// Create an iteration record; the type tag is derived from the payload.
    pub fn new(
        iteration_number: u32,
        original_answer: impl Into<String>,
        rewritten_answer: impl Into<String>,
        rewriting_prompt: impl Into<String>,
        data: IterationData,
    ) -> Self {
        Self {
            iteration_number,
            iteration_type: data.iteration_type(),
            original_answer: original_answer.into(),
            rewritten_answer: rewritten_answer.into(),
            rewriting_prompt: rewriting_prompt.into(),
            data,
        }
    }
}

/// One conversation/rewrite session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Unique identifier, generated at creation
    pub thread_id: Uuid,
    /// The original question, immutable
    pub user_prompt: String,
    /// Identifier of the LLM used for this thread, immutable
    pub model_id: String,
    /// Current status
    pub status: ThreadStatus,
    /// Set exactly once, at the terminal transition
    pub final_response: Option<String>,
    /// Set when the response is accepted despite incomplete validation
    pub warning_message: Option<String>,
    /// Ordered, append-only iteration history; index 0 is the initial
    /// generation
    pub iterations: Vec<TypedIteration>,
    /// Monotonic budget counter; tracks rewrite turns, not array
    /// positions
    pub iteration_counter: u32,
    /// Upper bound copied from config at creation time, so later config
    /// changes never affect in-flight threads
    pub max_iterations: u32,
    /// Finding indices already acted on within the current turn
    pub processed_finding_indices: HashSet<usize>,
    /// Findings from the most recent validation call
    pub current_findings: Vec<Finding>,
    /// Every question/answer exchange used to augment context
    pub all_clarifications: Vec<QuestionAnswerExchange>,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// When the thread reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
    /// When the thread last suspended for user input
    pub awaiting_input_since: Option<DateTime<Utc>>,
}

impl Thread {
    /// Create a new thread in `Processing` state.
    pub fn new(user_prompt: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            thread_id: Uuid::new_v4(),
            user_prompt: user_prompt.into(),
            model_id: model_id.into(),
            status: ThreadStatus::default(),
            final_response: None,
            warning_message: None,
            iterations: Vec::new(),
            iteration_counter: 0,
            max_iterations: 5,
            processed_finding_indices: HashSet::new(),
            current_findings: Vec::new(),
            all_clarifications: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            awaiting_input_since: None,
        }
    }

    /// Set the iteration budget.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check if the thread is in a terminal state.
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the rewrite budget is exhausted.
    pub const fn budget_exhausted(&self) -> bool {
        self.iteration_counter >= self.max_iterations
    }

    /// The most recent iteration record, if any.
    pub fn last_iteration(&self) -> Option<&TypedIteration> {
        self.iterations.last()
    }

    /// Validate thread invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_prompt.trim().is_empty() {
            return Err("Thread prompt cannot be empty".to_string());
        }
        if self.model_id.is_empty() {
            return Err("Thread model id cannot be empty".to_string());
        }
        let mut prev: Option<u32> = None;
        for iteration in &self.iterations {
            if let Some(p) = prev {
                if iteration.iteration_number <= p {
                    return Err(format!(
                        "Iteration numbers must be strictly increasing: {} follows {}",
                        iteration.iteration_number, p
                    ));
                }
            }
            prev = Some(iteration.iteration_number);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_creation() {
        let thread = Thread::new("What is the refund policy?", "anthropic.claude-3-5-haiku");
        assert_eq!(thread.status, ThreadStatus::Processing);
        assert_eq!(thread.iteration_counter, 0);
        assert_eq!(thread.max_iterations, 5);
        assert!(thread.iterations.is_empty());
        assert!(thread.final_response.is_none());
        assert!(!thread.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ThreadStatus::Processing,
            ThreadStatus::AwaitingUserInput,
            ThreadStatus::Completed,
            ThreadStatus::Error,
        ] {
            assert_eq!(ThreadStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ThreadStatus::from_str("PAUSED"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ThreadStatus::Completed.is_terminal());
        assert!(ThreadStatus::Error.is_terminal());
        assert!(!ThreadStatus::Processing.is_terminal());
        assert!(!ThreadStatus::AwaitingUserInput.is_terminal());
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut thread = Thread::new("prompt", "model").with_max_iterations(2);
        assert!(!thread.budget_exhausted());
        thread.iteration_counter = 2;
        assert!(thread.budget_exhausted());
    }

    #[test]
    fn test_iteration_type_derived_from_payload() {
        let ar = IterationData::ArFeedback {
            findings: vec![],
            validation_output: ValidationOutput::Valid,
            processed_finding_index: None,
            llm_decision: LlmDecision::Initial,
            rewrite_kind: RewriteKind::Initial,
        };
        let iteration = TypedIteration::new(0, "", "answer", "", ar);
        assert_eq!(iteration.iteration_type, IterationType::ArFeedback);

        let clar = IterationData::Clarification {
            qa_exchange: QuestionAnswerExchange::pending(vec!["Which plan?".to_string()]),
            context_augmentation: None,
            processed_finding_index: None,
            llm_decision: Some(LlmDecision::AskQuestions),
            validation_output: None,
            validation_findings: vec![],
        };
        let iteration = TypedIteration::new(1, "answer", "", "", clar);
        assert_eq!(iteration.iteration_type, IterationType::UserClarification);
    }

    #[test]
    fn test_validate_rejects_non_increasing_numbers() {
        let mut thread = Thread::new("prompt", "model");
        let data = || IterationData::ArFeedback {
            findings: vec![],
            validation_output: ValidationOutput::Valid,
            processed_finding_index: None,
            llm_decision: LlmDecision::Initial,
            rewrite_kind: RewriteKind::Initial,
        };
        thread
            .iterations
            .push(TypedIteration::new(0, "", "a", "", data()));
        thread
            .iterations
            .push(TypedIteration::new(2, "a", "b", "p", data()));
        assert!(thread.validate().is_ok());

        thread
            .iterations
            .push(TypedIteration::new(2, "b", "c", "p", data()));
        assert!(thread.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prompt() {
        let thread = Thread::new("   ", "model");
        assert!(thread.validate().is_err());
    }
}
