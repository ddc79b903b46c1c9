//! Cluster file parsing.
//!
//! A cluster file declares one stack, an optional shared network, and the
//! clusters to place in it:
//!
//! ```toml
//! [stack]
//! name = "testing-stack"
//!
//! [network]
//! cidr = "10.0.0.0/16"
//! max_azs = 2
//!
//! [[clusters]]
//! id = "Cluster"
//! desired_count = 3
//! instance_type = "t3.medium"
//! ```
//!
//! Clusters in a file without a `[network]` section each get their own
//! default network at `<cluster id>/Vpc`.

use std::path::Path;

use anyhow::{Context, Result};
use k3scdk_cluster::{
    ClusterConfig, ClusterError, InstanceType, MachineImage, NetworkProps, NetworkRef, Stack,
    DEFAULT_DESIRED_COUNT, DEFAULT_NETWORK_ID,
};
use k3scdk_networking::{Ipv4Cidr, DEFAULT_MAX_AZS};
use serde::Deserialize;
use tracing::debug;

use crate::error::CliError;

/// Parsed cluster file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterFile {
    pub stack: StackSection,

    #[serde(default)]
    pub network: Option<NetworkSection>,

    #[serde(default)]
    pub clusters: Vec<ClusterSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackSection {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    /// Construct id of the shared network.
    #[serde(default = "default_network_id")]
    pub id: String,

    #[serde(default)]
    pub cidr: Option<Ipv4Cidr>,

    #[serde(default = "default_max_azs")]
    pub max_azs: u8,

    #[serde(default)]
    pub subnet_prefix_len: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSection {
    pub id: String,

    #[serde(default = "default_desired_count")]
    pub desired_count: u32,

    #[serde(default)]
    pub instance_type: InstanceType,

    #[serde(default)]
    pub machine_image: Option<MachineImage>,

    #[serde(default)]
    pub spot_price: Option<String>,

    #[serde(default)]
    pub key_name: Option<String>,

    /// Root volume size in GiB; the image default when absent.
    #[serde(default)]
    pub root_volume_size: Option<u32>,

    #[serde(default)]
    pub managed_policies: Vec<String>,
}

fn default_network_id() -> String {
    DEFAULT_NETWORK_ID.to_string()
}

fn default_max_azs() -> u8 {
    DEFAULT_MAX_AZS
}

fn default_desired_count() -> u32 {
    DEFAULT_DESIRED_COUNT
}

impl NetworkSection {
    fn props(&self) -> NetworkProps {
        let defaults = NetworkProps::default();
        NetworkProps {
            cidr: self.cidr.unwrap_or(defaults.cidr),
            max_azs: self.max_azs,
            subnet_prefix_len: self.subnet_prefix_len,
        }
    }
}

impl ClusterSection {
    fn config(&self, network: NetworkRef) -> ClusterConfig {
        let mut config = ClusterConfig::new(self.desired_count, self.instance_type.clone(), network);
        if let Some(image) = &self.machine_image {
            config = config.with_machine_image(image.clone());
        }
        if let Some(price) = &self.spot_price {
            config = config.with_spot_price(price.as_str());
        }
        if let Some(key_name) = &self.key_name {
            config = config.with_key_name(key_name.as_str());
        }
        if let Some(size) = self.root_volume_size {
            config = config.with_root_volume_size(size);
        }
        for policy in &self.managed_policies {
            config = config.with_managed_policy(policy.as_str());
        }
        config
    }
}

/// One compiled cluster, for reporting.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub id: String,
    pub asg: String,
    pub launch_config: String,
    pub desired_count: u32,
    pub instance_type: String,
}

impl ClusterFile {
    /// Parse a cluster file from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load and parse the cluster file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::ClusterFileNotFound(path.to_path_buf()).into());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cluster file {}", path.display()))?;

        Self::from_toml_str(&contents)
            .map_err(|e| anyhow::Error::new(CliError::invalid_cluster_file(path, e.message())))
    }

    /// Build the stack this file describes.
    pub fn build(&self) -> Result<(Stack, Vec<ClusterSummary>), ClusterError> {
        let mut stack = Stack::new(&self.stack.name)?;
        if let Some(description) = &self.stack.description {
            stack = stack.with_description(description.as_str());
        }
        let root = stack.scope();

        let shared = match &self.network {
            Some(network) => Some(stack.add_network(&root, &network.id, &network.props())?),
            None => None,
        };

        let mut summaries = Vec::with_capacity(self.clusters.len());
        for cluster in &self.clusters {
            let network = match &shared {
                Some(network) => network.clone(),
                None => stack.add_network(
                    &root.child(&cluster.id)?,
                    DEFAULT_NETWORK_ID,
                    &NetworkProps::default(),
                )?,
            };

            let compiled = stack.add_cluster(&root, &cluster.id, &cluster.config(network))?;
            debug!(cluster = %cluster.id, asg = %compiled.asg.logical_id(), "added cluster");

            summaries.push(ClusterSummary {
                id: cluster.id.clone(),
                asg: compiled.asg.logical_id().to_string(),
                launch_config: compiled.launch_config.logical_id().to_string(),
                desired_count: cluster.desired_count,
                instance_type: cluster.instance_type.to_string(),
            });
        }

        Ok((stack, summaries))
    }
}
