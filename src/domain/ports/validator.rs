use async_trait::async_trait;

use super::errors::ValidationError;
use crate::domain::models::ValidationResult;

/// Port trait for the formal-reasoning guardrail
///
/// Given the user's prompt and a candidate answer, the guardrail
/// classifies the answer against a policy and returns categorized
/// findings. The concrete wire format (the guardrail service's JSON) is
/// an adapter concern; see `infrastructure::guardrail` for the decoder.
#[async_trait]
pub trait ResponseValidator: Send + Sync {
    /// Validate a candidate answer against the policy.
    async fn validate(
        &self,
        prompt: &str,
        response: &str,
    ) -> Result<ValidationResult, ValidationError>;
}
