use async_trait::async_trait;

use crate::domain::models::{Finding, Thread};

/// Port trait for compliance audit notifications
///
/// The processor reports terminal outcomes here; what happens to the
/// record (file, database, log stream) is the implementation's business.
/// Audit failures must never fail the thread, so these methods are
/// infallible from the caller's point of view.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record a response that passed validation.
    async fn log_valid_response(&self, thread: &Thread, findings: &[Finding]);

    /// Record a thread that exhausted its iteration budget while still
    /// invalid.
    async fn log_max_iterations(
        &self,
        thread: &Thread,
        iteration_summaries: &[String],
        last_finding: &Finding,
    );
}
