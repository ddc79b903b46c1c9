//! Cluster configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::network::NetworkRef;
use crate::ClusterError;

/// Number of worker nodes in a default cluster.
pub const DEFAULT_DESIRED_COUNT: u32 = 3;

/// Instance type of a default cluster.
pub const DEFAULT_INSTANCE_TYPE: &str = "t3.medium";

/// SSM parameter resolving to the latest Amazon Linux 2 image.
pub const DEFAULT_IMAGE_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2";

/// Largest root volume EBS accepts, in GiB.
pub const MAX_ROOT_VOLUME_GIB: u32 = 16_384;

/// EC2 instance type, e.g. `t3.medium`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType(String);

impl InstanceType {
    /// Parses `family.size`.
    pub fn parse(s: &str) -> Result<Self, ClusterError> {
        let Some((family, size)) = s.split_once('.') else {
            return Err(ClusterError::invalid(format!(
                "instance type '{s}' must look like 'family.size'"
            )));
        };

        let family_ok = !family.is_empty()
            && family
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        let size_ok = !size.is_empty() && size.chars().all(|c| c.is_ascii_alphanumeric());

        if !family_ok || !size_ok {
            return Err(ClusterError::invalid(format!(
                "instance type '{s}' must look like 'family.size'"
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InstanceType {
    fn default() -> Self {
        Self(DEFAULT_INSTANCE_TYPE.to_string())
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceType {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstanceType {
    type Error = ClusterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InstanceType> for String {
    fn from(value: InstanceType) -> Self {
        value.0
    }
}

/// Image the worker nodes boot from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MachineImage {
    /// Resolved at deploy time from an SSM parameter.
    Ssm { parameter: String },

    /// A fixed AMI id.
    Ami { id: String },
}

impl Default for MachineImage {
    fn default() -> Self {
        Self::Ssm {
            parameter: DEFAULT_IMAGE_PARAMETER.to_string(),
        }
    }
}

impl MachineImage {
    fn validate(&self) -> Result<(), ClusterError> {
        match self {
            Self::Ssm { parameter } if !parameter.starts_with('/') || parameter.len() < 2 => Err(
                ClusterError::invalid(format!("SSM parameter '{parameter}' must be an absolute path")),
            ),
            Self::Ami { id } if !id.starts_with("ami-") || id.len() <= "ami-".len() => Err(
                ClusterError::invalid(format!("AMI id '{id}' must start with 'ami-'")),
            ),
            _ => Ok(()),
        }
    }
}

/// Configuration of one fixed-size worker pool.
///
/// Immutable once built. The desired count is checked when the config is
/// compiled, not when it is built, so a zero count surfaces as a
/// compilation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    desired_count: u32,
    instance_type: InstanceType,
    network: NetworkRef,
    machine_image: MachineImage,
    spot_price: Option<String>,
    key_name: Option<String>,
    root_volume_size: Option<u32>,
    managed_policies: Vec<String>,
}

impl ClusterConfig {
    pub fn new(desired_count: u32, instance_type: InstanceType, network: NetworkRef) -> Self {
        Self {
            desired_count,
            instance_type,
            network,
            machine_image: MachineImage::default(),
            spot_price: None,
            key_name: None,
            root_volume_size: None,
            managed_policies: Vec::new(),
        }
    }

    /// Three `t3.medium` workers on `network`.
    pub fn default_for(network: NetworkRef) -> Self {
        Self::new(DEFAULT_DESIRED_COUNT, InstanceType::default(), network)
    }

    #[must_use]
    pub fn with_machine_image(mut self, machine_image: MachineImage) -> Self {
        self.machine_image = machine_image;
        self
    }

    /// Run workers as spot instances bidding at most `price` USD per hour.
    #[must_use]
    pub fn with_spot_price(mut self, price: impl Into<String>) -> Self {
        self.spot_price = Some(price.into());
        self
    }

    #[must_use]
    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = Some(key_name.into());
        self
    }

    /// Size the root volume of each worker, in GiB.
    #[must_use]
    pub fn with_root_volume_size(mut self, size_gib: u32) -> Self {
        self.root_volume_size = Some(size_gib);
        self
    }

    /// Attach an AWS managed policy (by name) to the worker role.
    #[must_use]
    pub fn with_managed_policy(mut self, policy: impl Into<String>) -> Self {
        let policy = policy.into();
        if !self.managed_policies.contains(&policy) {
            self.managed_policies.push(policy);
        }
        self
    }

    pub fn desired_count(&self) -> u32 {
        self.desired_count
    }

    pub fn instance_type(&self) -> &InstanceType {
        &self.instance_type
    }

    pub fn network(&self) -> &NetworkRef {
        &self.network
    }

    pub fn machine_image(&self) -> &MachineImage {
        &self.machine_image
    }

    pub fn spot_price(&self) -> Option<&str> {
        self.spot_price.as_deref()
    }

    pub fn key_name(&self) -> Option<&str> {
        self.key_name.as_deref()
    }

    pub fn root_volume_size(&self) -> Option<u32> {
        self.root_volume_size
    }

    pub fn managed_policies(&self) -> &[String] {
        &self.managed_policies
    }

    /// Checks everything that does not need the construct tree.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.desired_count == 0 {
            return Err(ClusterError::invalid(
                "desired_count must be a positive integer, got 0",
            ));
        }

        self.machine_image.validate()?;

        if let Some(price) = &self.spot_price {
            let valid = price
                .parse::<f64>()
                .is_ok_and(|p| p.is_finite() && p > 0.0);
            if !valid {
                return Err(ClusterError::invalid(format!(
                    "spot_price '{price}' must be a positive decimal"
                )));
            }
        }

        if let Some(key_name) = &self.key_name {
            if key_name.trim().is_empty() {
                return Err(ClusterError::invalid("key_name must not be blank"));
            }
        }

        if let Some(size) = self.root_volume_size {
            if !(1..=MAX_ROOT_VOLUME_GIB).contains(&size) {
                return Err(ClusterError::invalid(format!(
                    "root_volume_size must be between 1 and {MAX_ROOT_VOLUME_GIB} GiB, got {size}"
                )));
            }
        }

        if let Some(policy) = self
            .managed_policies
            .iter()
            .find(|p| p.is_empty() || p.chars().any(char::is_whitespace))
        {
            return Err(ClusterError::invalid(format!(
                "managed policy name '{policy}' is not valid"
            )));
        }

        Ok(())
    }
}
