//! Error types for id parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or deriving ids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The id string is empty.
    #[error("id cannot be empty")]
    Empty,

    /// A construct id segment is malformed.
    #[error("invalid construct id '{segment}': {reason}")]
    InvalidSegment {
        segment: String,
        reason: &'static str,
    },

    /// A logical id is malformed.
    #[error("invalid logical id '{value}': {reason}")]
    InvalidLogicalId { value: String, reason: &'static str },

    /// No components were left to derive a logical id from.
    #[error("cannot derive a logical id from an empty construct path")]
    EmptyPath,
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty | IdError::EmptyPath)
    }
}
