//! Audit logging for terminal thread outcomes.
//!
//! Compliance wants a durable record of every response that left the
//! system: what was asked, what was returned, and what the guardrail said
//! about it. This module provides the in-memory [`AuditSink`]
//! implementation; entries are additionally emitted as structured tracing
//! events so an operator can ship them wherever the deployment logs go.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::domain::models::{Finding, IterationData, QuestionAnswerExchange, Thread};
use crate::domain::ports::AuditSink;

/// Configuration for the audit log service.
#[derive(Debug, Clone)]
pub struct AuditLogConfig {
    /// Maximum entries to keep in memory.
    pub max_entries: usize,
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

/// Type of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// A response passed validation and was returned
    ValidResponse,
    /// The iteration budget ran out before validation succeeded
    MaxIterationsReached,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidResponse => "VALID_RESPONSE",
            Self::MaxIterationsReached => "MAX_ITERATIONS_REACHED",
        }
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Event type.
    pub event_type: AuditEventType,
    /// The thread this entry belongs to.
    pub thread_id: Uuid,
    /// The user's original prompt.
    pub prompt: String,
    /// The response that left the system.
    pub response: Option<String>,
    /// The model that produced the response.
    pub model_id: String,
    /// Findings backing the outcome.
    pub findings: Vec<Finding>,
    /// Q&A exchanges that shaped the response, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qa_exchanges: Vec<QuestionAnswerExchange>,
    /// Per-iteration summaries (budget-exhaustion entries only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iteration_summaries: Vec<String>,
}

/// Statistics about the audit log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    pub total_entries: usize,
    pub valid_responses: usize,
    pub max_iterations_reached: usize,
}

/// In-memory audit log service.
pub struct AuditLogService {
    config: AuditLogConfig,
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
}

impl AuditLogService {
    /// Create a new audit log service.
    pub fn new(config: AuditLogConfig) -> Self {
        Self {
            config,
            entries: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AuditLogConfig::default())
    }

    async fn push(&self, entry: AuditEntry) {
        info!(
            event_type = entry.event_type.as_str(),
            thread_id = %entry.thread_id,
            model_id = %entry.model_id,
            findings = entry.findings.len(),
            "audit entry recorded"
        );

        let mut entries = self.entries.write().await;
        while entries.len() >= self.config.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The most recent `limit` entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Entries recorded for a specific thread.
    pub async fn entries_for_thread(&self, thread_id: Uuid) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.thread_id == thread_id)
            .cloned()
            .collect()
    }

    /// Aggregate statistics.
    pub async fn stats(&self) -> AuditStats {
        let entries = self.entries.read().await;
        let mut stats = AuditStats {
            total_entries: entries.len(),
            ..Default::default()
        };
        for entry in entries.iter() {
            match entry.event_type {
                AuditEventType::ValidResponse => stats.valid_responses += 1,
                AuditEventType::MaxIterationsReached => stats.max_iterations_reached += 1,
            }
        }
        stats
    }
}

/// Pull the answered Q&A exchanges out of a thread's clarification
/// iterations.
fn extract_qa_exchanges(thread: &Thread) -> Vec<QuestionAnswerExchange> {
    thread
        .iterations
        .iter()
        .filter_map(|iteration| match &iteration.data {
            IterationData::Clarification { qa_exchange, .. } => Some(qa_exchange.clone()),
            IterationData::ArFeedback { .. } => None,
        })
        .collect()
}

#[async_trait]
impl AuditSink for AuditLogService {
    async fn log_valid_response(&self, thread: &Thread, findings: &[Finding]) {
        self.push(AuditEntry {
            timestamp: Utc::now(),
            event_type: AuditEventType::ValidResponse,
            thread_id: thread.thread_id,
            prompt: thread.user_prompt.clone(),
            response: thread.final_response.clone(),
            model_id: thread.model_id.clone(),
            findings: findings.to_vec(),
            qa_exchanges: extract_qa_exchanges(thread),
            iteration_summaries: Vec::new(),
        })
        .await;
    }

    async fn log_max_iterations(
        &self,
        thread: &Thread,
        iteration_summaries: &[String],
        last_finding: &Finding,
    ) {
        self.push(AuditEntry {
            timestamp: Utc::now(),
            event_type: AuditEventType::MaxIterationsReached,
            thread_id: thread.thread_id,
            prompt: thread.user_prompt.clone(),
            response: thread.final_response.clone(),
            model_id: thread.model_id.clone(),
            findings: vec![last_finding.clone()],
            qa_exchanges: extract_qa_exchanges(thread),
            iteration_summaries: iteration_summaries.to_vec(),
        })
        .await;
    }
}
