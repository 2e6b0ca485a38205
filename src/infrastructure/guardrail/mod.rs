//! Guardrail wire-format handling.

pub mod decoder;

pub use decoder::{decode_finding, decode_validation_response, DecodeError};
