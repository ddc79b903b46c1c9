//! CLI commands.

mod synth;
mod validate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use k3scdk_cluster::Stack;

use crate::cluster_file::{ClusterFile, ClusterSummary};
use crate::error::CliError;
use crate::output::OutputFormat;

/// k3sctl - Synthesize k3s worker clusters into CloudFormation templates.
#[derive(Debug, Parser)]
#[command(name = "k3sctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json). Each command picks its own default.
    #[arg(long, global = true)]
    format: Option<String>,

    /// Cluster file to read.
    #[arg(long, global = true, env = "K3SCTL_CONFIG", default_value = "k3s.toml")]
    config: PathBuf,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, env = "K3SCTL_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print or write the synthesized template.
    Synth(synth::SynthCommand),

    /// Compile every cluster and report the template hash.
    Validate,

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn log_level(&self) -> String {
        self.log_level.clone()
    }

    /// Run the CLI command.
    pub fn run(self) -> Result<()> {
        let ctx = CommandContext {
            format: self.format.as_deref().map(OutputFormat::parse),
            config: self.config,
        };

        match self.command {
            Commands::Synth(cmd) => cmd.run(ctx),
            Commands::Validate => validate::run(ctx),
            Commands::Version => {
                println!("k3sctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    /// Explicit `--format`, if given.
    pub format: Option<OutputFormat>,
    pub config: PathBuf,
}

impl CommandContext {
    /// The requested format, or `default` when none was given.
    pub fn format_or(&self, default: OutputFormat) -> OutputFormat {
        self.format.unwrap_or(default)
    }

    /// Load the cluster file and build its stack.
    pub fn build_stack(&self) -> Result<(Stack, Vec<ClusterSummary>)> {
        let file = ClusterFile::load(&self.config)?;
        if file.clusters.is_empty() {
            return Err(CliError::NoClusters(self.config.clone()).into());
        }
        Ok(file.build().map_err(CliError::from)?)
    }
}
