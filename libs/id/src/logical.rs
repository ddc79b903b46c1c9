//! Logical id derivation.
//!
//! Logical ids must be stable across synthesis runs and unique within a
//! template. Top-level constructs keep their id verbatim; everything deeper
//! gets a readable prefix built from the path plus a short digest of the
//! full path.

use sha2::{Digest, Sha256};

use crate::types::{LogicalId, MAX_LOGICAL_ID_LEN, PATH_SEPARATOR};
use crate::IdError;

/// Components with this id are dropped entirely.
pub const HIDDEN_ID: &str = "Default";

/// Components with this id are kept in the digest but not in the readable part.
pub const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

/// Length of the digest suffix.
pub const HASH_LEN: usize = 8;

const MAX_HUMAN_LEN: usize = MAX_LOGICAL_ID_LEN - HASH_LEN - 7;

pub(crate) fn make_logical_id(components: &[&str]) -> Result<LogicalId, IdError> {
    let components: Vec<&str> = components
        .iter()
        .copied()
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    if components.is_empty() {
        return Err(IdError::EmptyPath);
    }

    if let [single] = components.as_slice() {
        let candidate = remove_non_alphanumeric(single);
        if !candidate.is_empty() && candidate.len() <= MAX_LOGICAL_ID_LEN {
            return Ok(LogicalId::from_validated(candidate));
        }
    }

    let hash = path_hash(&components);
    let mut human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect();
    human.truncate(MAX_HUMAN_LEN);

    Ok(LogicalId::from_validated(human + &hash))
}

/// Upper-case hex prefix of the SHA-256 digest of the joined path.
fn path_hash(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join(PATH_SEPARATOR).as_bytes());
    hex::encode_upper(&digest[..HASH_LEN / 2])
}

/// Drops a component when the previously kept one already ends with it, so
/// `Bucket/Bucket` or `MyBucket/Bucket` read once.
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&str> = Vec::with_capacity(components.len());
    for &component in components {
        match kept.last() {
            Some(last) if last.ends_with(component) => {}
            _ => kept.push(component),
        }
    }
    kept
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(components: &[&str]) -> String {
        make_logical_id(components).unwrap().to_string()
    }

    #[test]
    fn test_top_level_kept_verbatim() {
        assert_eq!(id(&["Cluster"]), "Cluster");
        assert_eq!(id(&["my-cluster"]), "mycluster");
    }

    #[test]
    fn test_nested_gets_hash_suffix() {
        let lc = id(&["Cluster", "WorkerAsg", "LaunchConfig"]);
        assert!(lc.starts_with("ClusterWorkerAsgLaunchConfig"));
        assert_eq!(lc.len(), "ClusterWorkerAsgLaunchConfig".len() + HASH_LEN);
        let suffix = &lc[lc.len() - HASH_LEN..];
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_resource_hidden_from_human_part_only() {
        let with = id(&["Cluster", "Vpc", "Resource"]);
        let without = id(&["Cluster", "Vpc"]);
        assert!(with.starts_with("ClusterVpc"));
        assert_eq!(with.len(), without.len());
        assert_ne!(with, without);
    }

    #[test]
    fn test_default_dropped() {
        assert_eq!(id(&["Cluster", "Default"]), "Cluster");
        assert_eq!(
            id(&["Cluster", "Default", "Asg"]),
            id(&["Cluster", "Asg"])
        );
        assert_eq!(make_logical_id(&["Default"]), Err(IdError::EmptyPath));
        assert_eq!(make_logical_id(&[]), Err(IdError::EmptyPath));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let lid = id(&["Cluster", "WorkerAsg", "Asg"]);
        assert!(lid.starts_with("ClusterWorkerAsg"));
        assert!(!lid.starts_with("ClusterWorkerAsgAsg"));
    }

    #[test]
    fn test_distinct_paths_distinct_ids() {
        assert_ne!(id(&["A", "BC"]), id(&["AB", "C"]));
    }

    #[test]
    fn test_long_human_part_truncated() {
        let long = "X".repeat(300);
        let lid = id(&["Cluster", &long]);
        assert_eq!(lid.len(), MAX_HUMAN_LEN + HASH_LEN);
    }

    proptest! {
        #[test]
        fn prop_logical_ids_are_valid(components in prop::collection::vec("[A-Za-z0-9 _-]{1,40}", 1..6)) {
            let refs: Vec<&str> = components.iter().map(String::as_str).collect();
            if let Ok(lid) = make_logical_id(&refs) {
                prop_assert!(LogicalId::parse(lid.as_str()).is_ok());
            }
        }

        #[test]
        fn prop_logical_ids_are_deterministic(components in prop::collection::vec("[A-Za-z0-9]{1,20}", 1..6)) {
            let refs: Vec<&str> = components.iter().map(String::as_str).collect();
            prop_assert_eq!(make_logical_id(&refs), make_logical_id(&refs));
        }
    }
}
