//! Network construct and network references.
//!
//! A network is a VPC with one public subnet per availability zone, an
//! internet gateway, and a default route per subnet. Clusters never see
//! these declarations directly; they hold a [`NetworkRef`] and ask a
//! [`NetworkResolver`] for the logical ids they need.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use k3scdk_id::{ConstructPath, LogicalId};
use k3scdk_networking::{
    plan_subnets, validate_max_azs, validate_vpc_block, Ipv4Cidr, DEFAULT_MAX_AZS,
};
use k3scdk_template::{PropertyValue, ResourceDeclaration, ResourceKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ClusterError, Scope};

/// Opaque handle to a network construct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkRef(ConstructPath);

impl NetworkRef {
    /// Refers to the network construct at `path`.
    pub fn new(path: ConstructPath) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &ConstructPath {
        &self.0
    }
}

impl std::fmt::Display for NetworkRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The logical ids a cluster needs from its network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNetwork {
    pub vpc: LogicalId,
    pub subnets: Vec<LogicalId>,
}

/// Resolves network references into logical ids.
pub trait NetworkResolver {
    fn resolve_network(&self, network: &NetworkRef) -> Option<&ResolvedNetwork>;
}

impl NetworkResolver for BTreeMap<NetworkRef, ResolvedNetwork> {
    fn resolve_network(&self, network: &NetworkRef) -> Option<&ResolvedNetwork> {
        self.get(network)
    }
}

/// Network layout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProps {
    /// VPC address range.
    #[serde(default = "default_cidr")]
    pub cidr: Ipv4Cidr,

    /// Number of availability zones (one public subnet each).
    #[serde(default = "default_max_azs")]
    pub max_azs: u8,

    /// Subnet size; when absent subnets split the VPC range evenly.
    #[serde(default)]
    pub subnet_prefix_len: Option<u8>,
}

/// 10.0.0.0/16
fn default_cidr() -> Ipv4Cidr {
    Ipv4Cidr {
        address: Ipv4Addr::new(10, 0, 0, 0),
        prefix_len: 16,
    }
}

fn default_max_azs() -> u8 {
    DEFAULT_MAX_AZS
}

impl Default for NetworkProps {
    fn default() -> Self {
        Self {
            cidr: default_cidr(),
            max_azs: default_max_azs(),
            subnet_prefix_len: None,
        }
    }
}

impl NetworkProps {
    pub fn validate(&self) -> Result<(), ClusterError> {
        validate_max_azs(self.max_azs)?;
        validate_vpc_block(&self.cidr)?;
        Ok(())
    }
}

/// Output of compiling a network construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledNetwork {
    pub network: NetworkRef,
    pub resolved: ResolvedNetwork,
    pub resources: Vec<ResourceDeclaration>,
}

/// `[{"Key": "Name", "Value": <node path>}]`
pub(crate) fn name_tags(scope: &Scope) -> PropertyValue {
    PropertyValue::list([PropertyValue::map([
        ("Key", PropertyValue::string("Name")),
        ("Value", PropertyValue::string(scope.node_path())),
    ])])
}

/// Declares the network construct at `scope`.
pub fn compile_network(scope: &Scope, props: &NetworkProps) -> Result<CompiledNetwork, ClusterError> {
    props.validate()?;

    let subnet_ranges = plan_subnets(
        &props.cidr,
        usize::from(props.max_azs),
        props.subnet_prefix_len,
    )?;

    let vpc_scope = scope.child("Resource")?;
    let vpc_id = vpc_scope.logical_id()?;
    let igw_id = scope.child("IGW")?.logical_id()?;
    let attachment_id = scope.child("VPCGW")?.logical_id()?;

    let mut resources = vec![
        ResourceDeclaration::new(vpc_id.clone(), ResourceKind::Vpc)
            .with_property("CidrBlock", props.cidr.to_string())
            .with_property("EnableDnsHostnames", true)
            .with_property("EnableDnsSupport", true)
            .with_property("InstanceTenancy", "default")
            .with_property("Tags", name_tags(scope)),
        ResourceDeclaration::new(igw_id.clone(), ResourceKind::InternetGateway)
            .with_property("Tags", name_tags(scope)),
        ResourceDeclaration::new(attachment_id.clone(), ResourceKind::VpcGatewayAttachment)
            .with_property("VpcId", PropertyValue::resource_ref(&vpc_id))
            .with_property("InternetGatewayId", PropertyValue::resource_ref(&igw_id)),
    ];

    let mut subnets = Vec::with_capacity(subnet_ranges.len());
    for (index, range) in subnet_ranges.iter().enumerate() {
        let subnet_scope = scope.child(&format!("PublicSubnet{}", index + 1))?;
        let subnet_id = subnet_scope.child("Subnet")?.logical_id()?;
        let table_id = subnet_scope.child("RouteTable")?.logical_id()?;
        let association_id = subnet_scope.child("RouteTableAssociation")?.logical_id()?;
        let route_id = subnet_scope.child("DefaultRoute")?.logical_id()?;

        // `index` is bounded by max_azs.
        let zone = PropertyValue::availability_zone(index as u32);

        resources.push(
            ResourceDeclaration::new(subnet_id.clone(), ResourceKind::Subnet)
                .with_property("VpcId", PropertyValue::resource_ref(&vpc_id))
                .with_property("CidrBlock", range.to_string())
                .with_property("AvailabilityZone", zone)
                .with_property("MapPublicIpOnLaunch", true)
                .with_property("Tags", name_tags(&subnet_scope)),
        );
        resources.push(
            ResourceDeclaration::new(table_id.clone(), ResourceKind::RouteTable)
                .with_property("VpcId", PropertyValue::resource_ref(&vpc_id))
                .with_property("Tags", name_tags(&subnet_scope)),
        );
        resources.push(
            ResourceDeclaration::new(association_id, ResourceKind::SubnetRouteTableAssociation)
                .with_property("RouteTableId", PropertyValue::resource_ref(&table_id))
                .with_property("SubnetId", PropertyValue::resource_ref(&subnet_id)),
        );
        resources.push(
            ResourceDeclaration::new(route_id, ResourceKind::Route)
                .with_property("RouteTableId", PropertyValue::resource_ref(&table_id))
                .with_property("DestinationCidrBlock", "0.0.0.0/0")
                .with_property("GatewayId", PropertyValue::resource_ref(&igw_id))
                .with_dependency(&attachment_id),
        );

        subnets.push(subnet_id);
    }

    debug!(
        network = %scope.path(),
        cidr = %props.cidr,
        subnets = subnets.len(),
        "compiled network"
    );

    Ok(CompiledNetwork {
        network: NetworkRef::new(scope.path().clone()),
        resolved: ResolvedNetwork {
            vpc: vpc_id,
            subnets,
        },
        resources,
    })
}
