//! Veritor - Validation-Driven Rewriting Engine
//!
//! Veritor orchestrates the validate-and-rewrite loop for LLM answers:
//! generate a response, check it against a formal-reasoning guardrail,
//! and iteratively rewrite it from categorized validation findings until
//! it is valid, flagged as potentially unsafe, or the iteration budget is
//! exhausted.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Thread/iteration/finding models and the
//!   port traits for external collaborators
//! - **Application Layer** (`application`): the thread processing state
//!   machine
//! - **Service Layer** (`services`): thread storage, reply parsing,
//!   prompt construction, audit logging
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging
//!   setup, retry policy, guardrail wire-format decoding
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use veritor::application::process_thread;
//! use veritor::services::ThreadManager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = Arc::new(ThreadManager::new());
//!     let thread = manager.create_thread("question", "model-id", 5).await;
//!     process_thread(thread.thread_id, manager, llm, validator, audit).await;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{process_thread, resume_thread_with_answers, ProcessorError, ThreadProcessor};
pub use domain::models::{
    Config, Finding, FindingDetails, IterationData, IterationType, LlmDecision, LoggingConfig,
    QuestionAnswerExchange, RetryConfig, RewriteKind, Thread, ThreadStatus, TypedIteration,
    ValidationOutput, ValidationResult,
};
pub use domain::ports::{AuditSink, LlmClient, LlmError, ResponseValidator, ValidationError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::retry::RetryPolicy;
pub use services::{AuditLogService, PromptTemplates, ResponseParser, ThreadManager};
