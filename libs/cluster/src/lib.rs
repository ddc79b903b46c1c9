//! # k3scdk-cluster
//!
//! Compiles k3s cluster topologies into infrastructure resource
//! declarations.
//!
//! A cluster is a fixed-size pool of worker nodes: given a node count, an
//! instance type, and a network, [`compile`] produces a launch
//! configuration, an auto scaling group whose minimum and maximum size both
//! equal the node count, and the security group and IAM role the nodes run
//! with.
//!
//! ## Example
//!
//! ```
//! use k3scdk_cluster::Stack;
//!
//! let mut stack = Stack::new("testing-stack")?;
//! let cluster = stack.add_default_cluster("Cluster")?;
//!
//! assert_eq!(cluster.asg.property("MinSize").and_then(|v| v.as_str()), Some("3"));
//! let template = stack.synth()?;
//! assert!(template["Resources"].is_object());
//! # Ok::<(), k3scdk_cluster::ClusterError>(())
//! ```

mod compiler;
mod config;
mod error;
mod network;
mod scope;
mod stack;

pub use compiler::{compile, CompiledCluster, SSM_IMAGE_PARAMETER_TYPE, WORKER_POOL_ID};
pub use config::{
    ClusterConfig, InstanceType, MachineImage, DEFAULT_DESIRED_COUNT, DEFAULT_IMAGE_PARAMETER,
    DEFAULT_INSTANCE_TYPE, MAX_ROOT_VOLUME_GIB,
};
pub use error::ClusterError;
pub use network::{
    compile_network, CompiledNetwork, NetworkProps, NetworkRef, NetworkResolver, ResolvedNetwork,
};
pub use scope::Scope;
pub use stack::{Stack, DEFAULT_NETWORK_ID};
