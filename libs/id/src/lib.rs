//! # k3scdk-id
//!
//! Construct ids, construct paths, and logical id generation.
//!
//! ## Design Principles
//!
//! - Construct ids are user-controlled labels, one per tree node
//! - Logical ids are derived, never chosen: the same path always yields the
//!   same logical id
//! - All names have a canonical string representation with strict parsing
//!
//! ## Logical Id Format
//!
//! A construct at `Cluster/WorkerAsg/LaunchConfig` becomes
//! `ClusterWorkerAsgLaunchConfig` followed by eight upper-case hex characters
//! taken from a digest of the full path, e.g.
//! `ClusterWorkerAsgLaunchConfig3F0C19A2`. The suffix is opaque; callers
//! must compare logical ids, never parse them.

mod error;
mod logical;
mod macros;
mod types;

pub use error::IdError;
pub use logical::{HASH_LEN, HIDDEN_FROM_HUMAN_ID, HIDDEN_ID};
pub use types::*;
