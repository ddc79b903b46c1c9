//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use k3scdk_cluster::ClusterError;
use k3scdk_template::TemplateError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Cluster file not found: {}", .0.display())]
    ClusterFileNotFound(PathBuf),

    #[error("Invalid cluster file {}: {message}", path.display())]
    InvalidClusterFile { path: PathBuf, message: String },

    #[error("Cluster file {} declares no clusters", .0.display())]
    NoClusters(PathBuf),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

impl From<TemplateError> for CliError {
    fn from(err: TemplateError) -> Self {
        Self::Cluster(err.into())
    }
}

impl CliError {
    pub fn invalid_cluster_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidClusterFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let Some(cli_err) = err.downcast_ref::<CliError>() else {
        return;
    };

    let hint = match cli_err {
        CliError::ClusterFileNotFound(_) => {
            Some("Pass --config or set K3SCTL_CONFIG to point at a cluster file.")
        }
        CliError::NoClusters(_) => Some("Add at least one [[clusters]] entry."),
        CliError::Cluster(ClusterError::UnresolvedNetworkReference(_)) => {
            Some("Declare the network before the clusters that use it.")
        }
        CliError::Cluster(
            ClusterError::DuplicateConstruct(_)
            | ClusterError::Template(TemplateError::DuplicateLogicalId(_)),
        ) => {
            Some("Cluster and network ids must be unique within a stack.")
        }
        CliError::Cluster(e) if e.is_configuration_error() => {
            Some("Fix the setting named above and run `k3sctl validate` again.")
        }
        _ => None,
    };

    if let Some(hint) = hint {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}
