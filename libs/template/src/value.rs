//! Property values.
//!
//! Values render to CloudFormation JSON. References are structural: a
//! `Ref` names a logical id and is resolved when the template is deployed,
//! never by string concatenation here.

use std::collections::BTreeMap;

use k3scdk_id::LogicalId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Pseudo parameters available in every template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PseudoParameter {
    Partition,
    Region,
    StackName,
    AccountId,
}

impl PseudoParameter {
    /// Returns the template name of the pseudo parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Partition => "AWS::Partition",
            Self::Region => "AWS::Region",
            Self::StackName => "AWS::StackName",
            Self::AccountId => "AWS::AccountId",
        }
    }
}

/// The target of a `Ref`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefTarget {
    /// Another resource in the same template.
    Resource(LogicalId),

    /// A template parameter.
    Parameter(LogicalId),

    /// A pseudo parameter.
    Pseudo(PseudoParameter),
}

impl RefTarget {
    /// Returns the name rendered inside `{"Ref": ...}`.
    pub fn name(&self) -> &str {
        match self {
            Self::Resource(id) | Self::Parameter(id) => id.as_str(),
            Self::Pseudo(p) => p.name(),
        }
    }
}

impl std::fmt::Display for RefTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resource(id) => write!(f, "resource {}", id),
            Self::Parameter(id) => write!(f, "parameter {}", id),
            Self::Pseudo(p) => f.write_str(p.name()),
        }
    }
}

/// A resource property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    String(String),
    Number(i64),
    Bool(bool),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Ref(RefTarget),
    GetAtt {
        target: LogicalId,
        attribute: String,
    },
    Join {
        delimiter: String,
        parts: Vec<PropertyValue>,
    },
    Select {
        index: u32,
        list: Box<PropertyValue>,
    },
    /// Availability zones of the deployment region.
    GetAzs,
}

impl PropertyValue {
    /// A plain string.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// A count, in the string encoding templates use for sizes.
    pub fn count(value: u32) -> Self {
        Self::String(value.to_string())
    }

    /// `Ref` to another resource.
    pub fn resource_ref(target: &LogicalId) -> Self {
        Self::Ref(RefTarget::Resource(target.clone()))
    }

    /// `Ref` to a template parameter.
    pub fn parameter_ref(target: &LogicalId) -> Self {
        Self::Ref(RefTarget::Parameter(target.clone()))
    }

    /// `Ref` to a pseudo parameter.
    pub fn pseudo(parameter: PseudoParameter) -> Self {
        Self::Ref(RefTarget::Pseudo(parameter))
    }

    /// `Fn::GetAtt` on another resource.
    pub fn get_att(target: &LogicalId, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            target: target.clone(),
            attribute: attribute.into(),
        }
    }

    /// `Fn::Join` over `parts`.
    pub fn join(delimiter: impl Into<String>, parts: Vec<PropertyValue>) -> Self {
        Self::Join {
            delimiter: delimiter.into(),
            parts,
        }
    }

    /// `Fn::Select` of the `index`-th availability zone.
    pub fn availability_zone(index: u32) -> Self {
        Self::Select {
            index,
            list: Box::new(Self::GetAzs),
        }
    }

    /// A list of values.
    pub fn list(items: impl IntoIterator<Item = PropertyValue>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// A map of values.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, PropertyValue)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the referenced resource if this value is a resource `Ref`.
    pub fn as_resource_ref(&self) -> Option<&LogicalId> {
        match self {
            Self::Ref(RefTarget::Resource(id)) => Some(id),
            _ => None,
        }
    }

    /// Returns the string if this value is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Collects every reference this value makes, depth first.
    pub fn collect_references(&self, out: &mut Vec<RefTarget>) {
        match self {
            Self::String(_) | Self::Number(_) | Self::Bool(_) | Self::GetAzs => {}
            Self::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.collect_references(out)),
            Self::Ref(target) => out.push(target.clone()),
            Self::GetAtt { target, .. } => out.push(RefTarget::Resource(target.clone())),
            Self::Join { parts, .. } => parts.iter().for_each(|v| v.collect_references(out)),
            Self::Select { list, .. } => list.collect_references(out),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

fn intrinsic<S, V>(serializer: S, name: &str, value: &V) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(name, value)?;
    map.end()
}

impl Serialize for PropertyValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_i64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::List(items) => items.serialize(serializer),
            Self::Map(entries) => entries.serialize(serializer),
            Self::Ref(target) => intrinsic(serializer, "Ref", target.name()),
            Self::GetAtt { target, attribute } => intrinsic(
                serializer,
                "Fn::GetAtt",
                &(target.as_str(), attribute.as_str()),
            ),
            Self::Join { delimiter, parts } => {
                intrinsic(serializer, "Fn::Join", &(delimiter.as_str(), parts))
            }
            Self::Select { index, list } => {
                intrinsic(serializer, "Fn::Select", &(index, list.as_ref()))
            }
            Self::GetAzs => intrinsic(serializer, "Fn::GetAZs", ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lid(s: &str) -> LogicalId {
        LogicalId::parse(s).unwrap()
    }

    #[test]
    fn test_count_is_string_encoded() {
        let value = serde_json::to_value(PropertyValue::count(3)).unwrap();
        assert_eq!(value, json!("3"));
    }

    #[test]
    fn test_intrinsics_render() {
        let target = lid("ClusterWorkerAsgLaunchConfig12AB34CD");
        assert_eq!(
            serde_json::to_value(PropertyValue::resource_ref(&target)).unwrap(),
            json!({ "Ref": "ClusterWorkerAsgLaunchConfig12AB34CD" })
        );
        assert_eq!(
            serde_json::to_value(PropertyValue::get_att(&target, "GroupId")).unwrap(),
            json!({ "Fn::GetAtt": ["ClusterWorkerAsgLaunchConfig12AB34CD", "GroupId"] })
        );
        assert_eq!(
            serde_json::to_value(PropertyValue::availability_zone(1)).unwrap(),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
        assert_eq!(
            serde_json::to_value(PropertyValue::join(
                "",
                vec![
                    "arn:".into(),
                    PropertyValue::pseudo(PseudoParameter::Partition)
                ]
            ))
            .unwrap(),
            json!({ "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }]] })
        );
    }

    #[test]
    fn test_collect_references_walks_nested_values() {
        let a = lid("A");
        let b = lid("B");
        let value = PropertyValue::list([
            PropertyValue::resource_ref(&a),
            PropertyValue::map([("Inner", PropertyValue::get_att(&b, "Arn"))]),
            PropertyValue::join("", vec![PropertyValue::pseudo(PseudoParameter::Region)]),
        ]);

        let mut refs = Vec::new();
        value.collect_references(&mut refs);
        assert_eq!(
            refs,
            vec![
                RefTarget::Resource(a),
                RefTarget::Resource(b),
                RefTarget::Pseudo(PseudoParameter::Region),
            ]
        );
    }
}
