//! Synth command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use k3scdk_template::Template;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

use super::CommandContext;

/// Print or write the synthesized template.
#[derive(Debug, Args)]
pub struct SynthCommand {
    /// Write the template to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Debug, Tabled)]
struct ResourceRow {
    #[tabled(rename = "LOGICAL ID")]
    logical_id: String,
    #[tabled(rename = "TYPE")]
    kind: String,
}

fn resource_rows(template: &Template) -> Vec<ResourceRow> {
    template
        .resources()
        .map(|r| ResourceRow {
            logical_id: r.logical_id().to_string(),
            kind: r.kind().to_string(),
        })
        .collect()
}

impl SynthCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        let (stack, _) = ctx.build_stack()?;
        let rendered = stack.synth().map_err(CliError::from)?;

        if let Some(path) = &self.out {
            let contents = serde_json::to_string_pretty(&rendered)?;
            std::fs::write(path, contents + "\n")
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
        }

        match ctx.format_or(OutputFormat::Json) {
            OutputFormat::Json if self.out.is_none() => print_json(&rendered)?,
            OutputFormat::Json => {}
            OutputFormat::Table => {
                print_table(&resource_rows(stack.template()));
                let hash = stack.hash().map_err(CliError::from)?;
                print_info(&format!("template_hash: {}", hash));
            }
        }

        if let Some(path) = &self.out {
            print_success(&format!(
                "Wrote {} resources to {}",
                stack.template().len(),
                path.display()
            ));
        }

        Ok(())
    }
}
