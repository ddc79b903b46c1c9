//! Validate command.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cluster_file::ClusterSummary;
use crate::error::CliError;
use crate::output::{print_info, print_json, print_success, print_table, OutputFormat};

use super::CommandContext;

#[derive(Debug, Serialize, Tabled)]
struct ClusterRow {
    #[tabled(rename = "CLUSTER")]
    id: String,
    #[tabled(rename = "WORKERS")]
    desired_count: u32,
    #[tabled(rename = "INSTANCE TYPE")]
    instance_type: String,
    #[tabled(rename = "ASG")]
    asg: String,
    #[tabled(rename = "LAUNCH CONFIG")]
    launch_config: String,
}

impl From<ClusterSummary> for ClusterRow {
    fn from(summary: ClusterSummary) -> Self {
        Self {
            id: summary.id,
            desired_count: summary.desired_count,
            instance_type: summary.instance_type,
            asg: summary.asg,
            launch_config: summary.launch_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    valid: bool,
    stack: String,
    resources: usize,
    template_hash: String,
    clusters: Vec<ClusterRow>,
}

fn report(ctx: &CommandContext) -> Result<ValidationReport> {
    let (stack, summaries) = ctx.build_stack()?;
    stack.template().validate().map_err(CliError::from)?;
    let hash = stack.hash().map_err(CliError::from)?;

    Ok(ValidationReport {
        valid: true,
        stack: stack.name().to_string(),
        resources: stack.template().len(),
        template_hash: hash.to_string(),
        clusters: summaries.into_iter().map(ClusterRow::from).collect(),
    })
}

pub fn run(ctx: CommandContext) -> Result<()> {
    let report = report(&ctx)?;

    match ctx.format_or(OutputFormat::Table) {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_success(&format!("Cluster file is valid: {}", ctx.config.display()));
            print_table(&report.clusters);
            print_info(&format!("template_hash: {}", report.template_hash));
        }
    }

    Ok(())
}
