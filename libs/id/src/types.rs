//! Construct ids, construct paths, and logical ids.
//!
//! A construct id names one node in the construct tree. A construct path is
//! the ordered list of ids from the stack root down to a node. Logical ids
//! are the template-level names derived from construct paths.

use crate::define_name;
use crate::IdError;

/// Maximum length of a logical id.
pub const MAX_LOGICAL_ID_LEN: usize = 255;

/// Separator used when rendering construct paths.
pub const PATH_SEPARATOR: &str = "/";

fn validate_segment(s: &str) -> Result<(), IdError> {
    if s.contains(PATH_SEPARATOR) {
        return Err(IdError::InvalidSegment {
            segment: s.to_string(),
            reason: "must not contain '/'",
        });
    }
    if s.chars().any(char::is_control) {
        return Err(IdError::InvalidSegment {
            segment: s.to_string(),
            reason: "must not contain control characters",
        });
    }
    if s.trim() != s {
        return Err(IdError::InvalidSegment {
            segment: s.to_string(),
            reason: "must not start or end with whitespace",
        });
    }
    Ok(())
}

fn validate_logical_id(s: &str) -> Result<(), IdError> {
    if s.len() > MAX_LOGICAL_ID_LEN {
        return Err(IdError::InvalidLogicalId {
            value: s.to_string(),
            reason: "longer than 255 characters",
        });
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(IdError::InvalidLogicalId {
            value: s.to_string(),
            reason: "must be ASCII alphanumeric",
        });
    }
    Ok(())
}

define_name!(ConstructId, validate_segment);
define_name!(LogicalId, validate_logical_id);

impl LogicalId {
    /// Derives the logical id for a construct path.
    pub fn from_path(path: &ConstructPath) -> Result<Self, IdError> {
        let components: Vec<&str> = path.segments().iter().map(ConstructId::as_str).collect();
        crate::logical::make_logical_id(&components)
    }

    /// Derives a logical id from raw components (used for ids that do not
    /// correspond to a construct, such as template parameters).
    pub fn from_components(components: &[&str]) -> Result<Self, IdError> {
        crate::logical::make_logical_id(components)
    }

    pub(crate) fn from_validated(s: String) -> Self {
        Self(s)
    }
}

/// Path of a construct below the stack root.
///
/// The root path has no segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstructPath(Vec<ConstructId>);

impl ConstructPath {
    /// The stack root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path with `id` appended.
    #[must_use]
    pub fn child(&self, id: &ConstructId) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.clone());
        Self(segments)
    }

    /// Parses `id` and returns a new path with it appended.
    pub fn join(&self, id: &str) -> Result<Self, IdError> {
        Ok(self.child(&ConstructId::parse(id)?))
    }

    /// Parses a `/`-separated path. The empty string is the root.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        s.split(PATH_SEPARATOR)
            .map(ConstructId::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Returns the path segments from the root down.
    pub fn segments(&self) -> &[ConstructId] {
        &self.0
    }

    /// Returns the last segment, if any.
    pub fn leaf(&self) -> Option<&ConstructId> {
        self.0.last()
    }

    /// Returns true for the stack root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Derives this path's logical id.
    pub fn logical_id(&self) -> Result<LogicalId, IdError> {
        LogicalId::from_path(self)
    }
}

impl std::fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(PATH_SEPARATOR)?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}

impl serde::Serialize for ConstructPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ConstructPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_id_rejects_separator() {
        let result: Result<ConstructId, _> = "Worker/Asg".parse();
        assert!(matches!(
            result.unwrap_err(),
            IdError::InvalidSegment { .. }
        ));
    }

    #[test]
    fn test_construct_id_empty() {
        let result: Result<ConstructId, _> = "".parse();
        assert!(matches!(result.unwrap_err(), IdError::Empty));
    }

    #[test]
    fn test_construct_id_rejects_padding() {
        assert!(ConstructId::parse(" Cluster").is_err());
        assert!(ConstructId::parse("Cluster\n").is_err());
        assert!(ConstructId::parse("My Cluster").is_ok());
    }

    #[test]
    fn test_logical_id_validation() {
        assert!(LogicalId::parse("ClusterWorkerAsgASG0A1B2C3D").is_ok());
        assert!(LogicalId::parse("Cluster-Asg").is_err());
        assert!(LogicalId::parse(&"A".repeat(256)).is_err());
    }

    #[test]
    fn test_path_display_and_parse() {
        let path = ConstructPath::root()
            .join("Cluster")
            .unwrap()
            .join("WorkerAsg")
            .unwrap();
        assert_eq!(path.to_string(), "Cluster/WorkerAsg");
        assert_eq!(ConstructPath::parse("Cluster/WorkerAsg").unwrap(), path);
        assert_eq!(path.leaf().unwrap().as_str(), "WorkerAsg");
        assert!(ConstructPath::parse("").unwrap().is_root());
        assert!(ConstructPath::parse("Cluster//Asg").is_err());
    }

    #[test]
    fn test_path_json_roundtrip() {
        let path = ConstructPath::parse("Cluster/Vpc/PublicSubnet1").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"Cluster/Vpc/PublicSubnet1\"");
        let parsed: ConstructPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn test_logical_id_deserialize_validates() {
        let result: Result<LogicalId, _> = serde_json::from_str("\"not valid!\"");
        assert!(result.is_err());
    }
}
