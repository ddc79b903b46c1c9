//! Error types for cluster compilation.

use k3scdk_id::{ConstructPath, IdError};
use k3scdk_networking::NetworkError;
use k3scdk_template::TemplateError;
use thiserror::Error;

use crate::network::NetworkRef;

/// Errors that can occur while compiling or committing a cluster.
///
/// Compilation is all-or-nothing: any error means no declarations were
/// produced or committed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The caller supplied an unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The network reference does not name a network known to the resolver.
    #[error("unresolved network reference: {0}")]
    UnresolvedNetworkReference(NetworkRef),

    /// Another construct was already declared at this path.
    #[error("construct id already in use: {0}")]
    DuplicateConstruct(ConstructPath),

    /// A construct id or path was malformed.
    #[error(transparent)]
    Id(#[from] IdError),

    /// The declarations could not be assembled into a template.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The network layout could not be planned.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ClusterError {
    /// Create an invalid configuration error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Returns true if the caller must change its input to succeed, as
    /// opposed to a conflict while assembling the template.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_)
                | Self::UnresolvedNetworkReference(_)
                | Self::DuplicateConstruct(_)
                | Self::Id(_)
                | Self::Network(_)
        )
    }
}
