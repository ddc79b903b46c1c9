//! Template assembly, validation, and rendering.

use std::collections::{BTreeMap, BTreeSet};

use k3scdk_id::LogicalId;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::resource::{ResourceDeclaration, ResourceKind, TemplateParameter};
use crate::value::RefTarget;
use crate::TemplateError;

/// Template format version emitted in every rendered template.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A set of resource declarations and the parameters they use.
///
/// Resources and parameters are keyed by logical id, so rendering order is
/// stable regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    description: Option<String>,
    parameters: BTreeMap<LogicalId, TemplateParameter>,
    resources: BTreeMap<LogicalId, ResourceDeclaration>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a resource. Logical ids must be unique.
    pub fn insert_resource(&mut self, resource: ResourceDeclaration) -> Result<(), TemplateError> {
        if self.resources.contains_key(resource.logical_id()) {
            return Err(TemplateError::DuplicateLogicalId(
                resource.logical_id().clone(),
            ));
        }
        self.resources
            .insert(resource.logical_id().clone(), resource);
        Ok(())
    }

    /// Adds a parameter. Re-adding an identical definition is a no-op.
    pub fn insert_parameter(&mut self, parameter: TemplateParameter) -> Result<(), TemplateError> {
        match self.parameters.get(parameter.logical_id()) {
            Some(existing) if *existing == parameter => Ok(()),
            Some(_) => Err(TemplateError::ConflictingParameter(
                parameter.logical_id().clone(),
            )),
            None => {
                self.parameters
                    .insert(parameter.logical_id().clone(), parameter);
                Ok(())
            }
        }
    }

    /// Adds a batch of parameters and resources, or nothing at all.
    pub fn insert_all(
        &mut self,
        parameters: Vec<TemplateParameter>,
        resources: Vec<ResourceDeclaration>,
    ) -> Result<(), TemplateError> {
        let mut staged = BTreeMap::new();
        for parameter in &parameters {
            let existing = self
                .parameters
                .get(parameter.logical_id())
                .or_else(|| staged.get(parameter.logical_id()).copied());
            if existing.is_some_and(|e| e != parameter) {
                return Err(TemplateError::ConflictingParameter(
                    parameter.logical_id().clone(),
                ));
            }
            staged.insert(parameter.logical_id(), parameter);
        }

        let mut seen = BTreeSet::new();
        for resource in &resources {
            let id = resource.logical_id();
            if self.resources.contains_key(id) || !seen.insert(id) {
                return Err(TemplateError::DuplicateLogicalId(id.clone()));
            }
        }

        for parameter in parameters {
            self.insert_parameter(parameter)?;
        }
        for resource in resources {
            self.insert_resource(resource)?;
        }
        Ok(())
    }

    pub fn resource(&self, logical_id: &LogicalId) -> Option<&ResourceDeclaration> {
        self.resources.get(logical_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDeclaration> {
        self.resources.values()
    }

    pub fn resources_of_kind(
        &self,
        kind: ResourceKind,
    ) -> impl Iterator<Item = &ResourceDeclaration> {
        self.resources.values().filter(move |r| r.kind() == kind)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &TemplateParameter> {
        self.parameters.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Checks that every reference points at a declared resource or
    /// parameter.
    pub fn validate(&self) -> Result<(), TemplateError> {
        for resource in self.resources.values() {
            for target in resource.references() {
                let resolved = match &target {
                    RefTarget::Resource(id) => self.resources.contains_key(id),
                    RefTarget::Parameter(id) => self.parameters.contains_key(id),
                    RefTarget::Pseudo(_) => true,
                };
                if !resolved {
                    return Err(TemplateError::DanglingReference {
                        from: resource.logical_id().clone(),
                        to: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Renders the template as JSON after validating it.
    pub fn to_json(&self) -> Result<serde_json::Value, TemplateError> {
        self.validate()?;

        let mut out = serde_json::Map::new();
        out.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = &self.description {
            out.insert("Description".to_string(), json!(description));
        }
        if !self.parameters.is_empty() {
            out.insert(
                "Parameters".to_string(),
                serde_json::to_value(&self.parameters)?,
            );
        }
        out.insert(
            "Resources".to_string(),
            serde_json::to_value(&self.resources)?,
        );
        Ok(serde_json::Value::Object(out))
    }

    /// Content hash of the rendered template.
    pub fn hash(&self) -> Result<TemplateHash, TemplateError> {
        Ok(TemplateHash::from_json(&self.to_json()?))
    }
}

/// A content hash for deterministic template comparison.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateHash(String);

impl TemplateHash {
    /// Compute a hash from canonical JSON.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let canonical = canonical_json(json);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let result = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(&result[..16])))
    }

    /// Get the hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produce canonical JSON (sorted keys, no extra whitespace).
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let inner: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}:{}", serde_json::Value::from(k.as_str()), canonical_json(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        serde_json::Value::Array(arr) => {
            let inner: Vec<String> = arr.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}
