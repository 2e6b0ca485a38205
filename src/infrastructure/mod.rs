//! Infrastructure layer module
//!
//! Adapters and cross-cutting plumbing around the domain:
//! - Configuration loading (figment)
//! - Logging setup (tracing-subscriber)
//! - Retry policy for collaborator calls
//! - Guardrail wire-format decoding
//!
//! Concrete service clients implement the port traits defined in the
//! domain layer; the pieces here are what those adapters are built from.

pub mod config;
pub mod guardrail;
pub mod logging;
pub mod retry;

pub use config::{ConfigError, ConfigLoader};
pub use retry::{RetryClass, RetryPolicy};
