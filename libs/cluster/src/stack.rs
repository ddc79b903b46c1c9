//! Stack: the unit of synthesis.
//!
//! A stack owns the template being assembled and the registry of networks
//! declared in it. Constructs are added through explicit calls that compile
//! first and commit second, so a failed call leaves the stack untouched.

use std::collections::{BTreeMap, BTreeSet};

use k3scdk_id::ConstructPath;
use k3scdk_template::{Template, TemplateHash};
use tracing::info;

use crate::compiler::{compile, CompiledCluster};
use crate::config::ClusterConfig;
use crate::network::{compile_network, NetworkProps, NetworkRef, NetworkResolver, ResolvedNetwork};
use crate::{ClusterError, Scope};

/// Construct id of the network a default cluster creates for itself.
pub const DEFAULT_NETWORK_ID: &str = "Vpc";

/// A stack of constructs that synthesizes into one template.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    template: Template,
    networks: BTreeMap<NetworkRef, ResolvedNetwork>,
    constructs: BTreeSet<ConstructPath>,
}

impl Stack {
    /// Creates an empty stack. Names are ASCII alphanumerics and `-`.
    pub fn new(name: &str) -> Result<Self, ClusterError> {
        let valid = !name.is_empty()
            && name.len() <= 128
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && name.starts_with(|c: char| c.is_ascii_alphabetic());
        if !valid {
            return Err(ClusterError::invalid(format!(
                "stack name '{name}' must start with a letter and contain only letters, digits, and '-'"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            template: Template::new(),
            networks: BTreeMap::new(),
            constructs: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.template = self.template.with_description(description);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root scope for constructs in this stack.
    pub fn scope(&self) -> Scope {
        Scope::root(&self.name)
    }

    /// Declares a network at `scope/id`.
    pub fn add_network(
        &mut self,
        scope: &Scope,
        id: &str,
        props: &NetworkProps,
    ) -> Result<NetworkRef, ClusterError> {
        let network_scope = self.claim(self.check_scope(scope)?.child(id)?)?;
        let compiled = compile_network(&network_scope, props)?;
        self.template.insert_all(Vec::new(), compiled.resources)?;
        self.constructs.insert(network_scope.path().clone());
        self.networks
            .insert(compiled.network.clone(), compiled.resolved);
        Ok(compiled.network)
    }

    /// Declares a cluster at `scope/id` on a network already in this stack.
    pub fn add_cluster(
        &mut self,
        scope: &Scope,
        id: &str,
        config: &ClusterConfig,
    ) -> Result<CompiledCluster, ClusterError> {
        let cluster_scope = self.claim(self.check_scope(scope)?.child(id)?)?;
        let compiled = compile(&cluster_scope, config, &*self)?;
        let (parameters, resources) = compiled.clone().into_parts();
        self.template.insert_all(parameters, resources)?;
        self.constructs.insert(cluster_scope.path().clone());
        Ok(compiled)
    }

    /// Declares a default cluster at `id` together with its own network at
    /// `id/Vpc`: three `t3.medium` workers over two public subnets.
    pub fn add_default_cluster(&mut self, id: &str) -> Result<CompiledCluster, ClusterError> {
        let cluster_scope = self.claim(self.scope().child(id)?)?;
        let network_scope = self.claim(cluster_scope.child(DEFAULT_NETWORK_ID)?)?;
        let network = compile_network(&network_scope, &NetworkProps::default())?;

        let resolver = BTreeMap::from([(network.network.clone(), network.resolved.clone())]);
        let config = ClusterConfig::default_for(network.network.clone());
        let cluster = compile(&cluster_scope, &config, &resolver)?;

        let (parameters, mut resources) = cluster.clone().into_parts();
        resources.extend(network.resources);
        self.template.insert_all(parameters, resources)?;
        self.constructs.insert(cluster_scope.path().clone());
        self.constructs.insert(network_scope.path().clone());
        self.networks.insert(network.network, network.resolved);
        Ok(cluster)
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Networks declared so far.
    pub fn networks(&self) -> impl Iterator<Item = &NetworkRef> {
        self.networks.keys()
    }

    /// Renders the stack's template.
    pub fn synth(&self) -> Result<serde_json::Value, ClusterError> {
        let rendered = self.template.to_json()?;
        info!(
            stack = %self.name,
            resources = self.template.len(),
            "synthesized stack"
        );
        Ok(rendered)
    }

    /// Content hash of the rendered template.
    pub fn hash(&self) -> Result<TemplateHash, ClusterError> {
        Ok(self.template.hash()?)
    }

    /// Returns `scope` if no construct has been declared at its path yet.
    fn claim(&self, scope: Scope) -> Result<Scope, ClusterError> {
        if self.constructs.contains(scope.path()) {
            return Err(ClusterError::DuplicateConstruct(scope.path().clone()));
        }
        Ok(scope)
    }

    fn check_scope<'a>(&self, scope: &'a Scope) -> Result<&'a Scope, ClusterError> {
        if scope.stack_name() != self.name {
            return Err(ClusterError::invalid(format!(
                "scope {} belongs to stack '{}', not '{}'",
                scope.node_path(),
                scope.stack_name(),
                self.name
            )));
        }
        Ok(scope)
    }
}

impl NetworkResolver for Stack {
    fn resolve_network(&self, network: &NetworkRef) -> Option<&ResolvedNetwork> {
        self.networks.get(network)
    }
}
