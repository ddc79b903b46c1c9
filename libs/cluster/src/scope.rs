//! Explicit parent context for constructs.

use k3scdk_id::{ConstructPath, LogicalId};

use crate::ClusterError;

/// Where in the construct tree a construct is being defined.
///
/// Scopes are passed explicitly to every compile step; nothing registers
/// itself in shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    stack_name: String,
    path: ConstructPath,
}

impl Scope {
    /// The root scope of a stack.
    pub fn root(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            path: ConstructPath::root(),
        }
    }

    /// A child scope named `id`.
    pub fn child(&self, id: &str) -> Result<Self, ClusterError> {
        Ok(Self {
            stack_name: self.stack_name.clone(),
            path: self.path.join(id)?,
        })
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// Full node path including the stack name, e.g.
    /// `testing-stack/Cluster/WorkerAsg`. Used for descriptions and tags.
    pub fn node_path(&self) -> String {
        if self.path.is_root() {
            self.stack_name.clone()
        } else {
            format!("{}/{}", self.stack_name, self.path)
        }
    }

    /// Logical id of the construct at this scope.
    pub fn logical_id(&self) -> Result<LogicalId, ClusterError> {
        Ok(self.path.logical_id()?)
    }
}
