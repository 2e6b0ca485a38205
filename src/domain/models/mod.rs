//! Domain models for the rewriting engine.

pub mod config;
pub mod finding;
pub mod thread;

pub use config::{Config, LoggingConfig, RetryConfig};
pub use finding::{
    Finding, FindingDetails, LogicStatement, LogicWarning, RuleRef, Scenario, TranslationOption,
    ValidationOutput, ValidationResult,
};
pub use thread::{
    IterationData, IterationType, LlmDecision, QuestionAnswerExchange, RewriteKind, Thread,
    ThreadStatus, TypedIteration,
};
