use async_trait::async_trait;

use super::errors::LlmError;
use crate::domain::models::{Finding, QuestionAnswerExchange};

/// Port trait for the LLM collaborator
///
/// The processor depends on this trait, not on a concrete model client.
/// Adapters own transport, request formatting, and retry; from the
/// processor's point of view both methods are plain blocking calls.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; methods take `&self` so one
/// client can serve many concurrently processing threads.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for the given prompt.
    ///
    /// Fails with a generic [`LlmError`] on any underlying failure
    /// (network, throttling, model error). Not retried by the caller.
    async fn generate_response(&self, prompt: &str) -> Result<String, LlmError>;

    /// Build the prompt that asks the model to correct a prior answer.
    ///
    /// `findings` carries the validation evidence to correct against
    /// (highest priority first), `clarifications` the accumulated
    /// question/answer exchanges used to augment context.
    async fn generate_rewriting_prompt(
        &self,
        findings: &[Finding],
        original_prompt: &str,
        original_response: &str,
        clarifications: &[QuestionAnswerExchange],
    ) -> Result<String, LlmError>;
}
