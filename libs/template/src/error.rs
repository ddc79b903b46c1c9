//! Error types for template assembly.

use k3scdk_id::LogicalId;
use thiserror::Error;

/// Errors that can occur when assembling or rendering a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Two resources share a logical id.
    #[error("duplicate logical id: {0}")]
    DuplicateLogicalId(LogicalId),

    /// A parameter was redefined with a different definition.
    #[error("conflicting definitions for parameter {0}")]
    ConflictingParameter(LogicalId),

    /// A resource references something the template does not declare.
    #[error("resource {from} references undeclared {to}")]
    DanglingReference { from: LogicalId, to: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TemplateError {
    fn from(err: serde_json::Error) -> Self {
        TemplateError::Serialization(err.to_string())
    }
}
