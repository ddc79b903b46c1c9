//! Resource declarations and template parameters.

use std::collections::BTreeMap;

use k3scdk_id::LogicalId;
use serde::{Serialize, Serializer};

use crate::value::{PropertyValue, RefTarget};

/// Ordered property mapping of a declaration.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Kinds of resources the compiler can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    LaunchConfiguration,
    AutoScalingGroup,
    Vpc,
    Subnet,
    InternetGateway,
    VpcGatewayAttachment,
    RouteTable,
    Route,
    SubnetRouteTableAssociation,
    SecurityGroup,
    IamRole,
    InstanceProfile,
}

impl ResourceKind {
    /// Returns the template type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LaunchConfiguration => "AWS::AutoScaling::LaunchConfiguration",
            Self::AutoScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::Route => "AWS::EC2::Route",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::IamRole => "AWS::IAM::Role",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

impl Serialize for ResourceKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.type_name())
    }
}

/// A single resource in a template.
///
/// Built once with the `with_*` methods and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDeclaration {
    #[serde(skip)]
    logical_id: LogicalId,

    #[serde(rename = "Type")]
    kind: ResourceKind,

    #[serde(rename = "Properties", skip_serializing_if = "BTreeMap::is_empty")]
    properties: Properties,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<LogicalId>,
}

impl ResourceDeclaration {
    pub fn new(logical_id: LogicalId, kind: ResourceKind) -> Self {
        Self {
            logical_id,
            kind,
            properties: Properties::new(),
            depends_on: Vec::new(),
        }
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets a property when `value` is present.
    #[must_use]
    pub fn with_optional_property(
        self,
        name: impl Into<String>,
        value: Option<impl Into<PropertyValue>>,
    ) -> Self {
        match value {
            Some(value) => self.with_property(name, value),
            None => self,
        }
    }

    /// Adds an explicit ordering dependency.
    #[must_use]
    pub fn with_dependency(mut self, target: &LogicalId) -> Self {
        if !self.depends_on.contains(target) {
            self.depends_on.push(target.clone());
        }
        self
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn depends_on(&self) -> &[LogicalId] {
        &self.depends_on
    }

    /// Every reference made by this declaration, including `DependsOn`.
    pub fn references(&self) -> Vec<RefTarget> {
        let mut out = Vec::new();
        for value in self.properties.values() {
            value.collect_references(&mut out);
        }
        out.extend(self.depends_on.iter().cloned().map(RefTarget::Resource));
        out
    }
}

/// A template parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParameter {
    #[serde(skip)]
    logical_id: LogicalId,

    #[serde(rename = "Type")]
    parameter_type: String,

    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    default: Option<String>,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl TemplateParameter {
    pub fn new(logical_id: LogicalId, parameter_type: impl Into<String>) -> Self {
        Self {
            logical_id,
            parameter_type: parameter_type.into(),
            default: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn parameter_type(&self) -> &str {
        &self.parameter_type
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declaration_renders_type_and_properties() {
        let lc = LogicalId::parse("LaunchConfig").unwrap();
        let decl = ResourceDeclaration::new(LogicalId::parse("Asg").unwrap(), ResourceKind::AutoScalingGroup)
            .with_property("MinSize", PropertyValue::count(2))
            .with_property("LaunchConfigurationName", PropertyValue::resource_ref(&lc))
            .with_optional_property("DesiredCapacity", None::<PropertyValue>);

        assert_eq!(
            serde_json::to_value(&decl).unwrap(),
            json!({
                "Type": "AWS::AutoScaling::AutoScalingGroup",
                "Properties": {
                    "MinSize": "2",
                    "LaunchConfigurationName": { "Ref": "LaunchConfig" }
                }
            })
        );
    }

    #[test]
    fn test_dependencies_are_deduplicated_and_referenced() {
        let role = LogicalId::parse("Role").unwrap();
        let decl = ResourceDeclaration::new(LogicalId::parse("Lc").unwrap(), ResourceKind::LaunchConfiguration)
            .with_dependency(&role)
            .with_dependency(&role);

        assert_eq!(decl.depends_on(), &[role.clone()]);
        assert_eq!(decl.references(), vec![RefTarget::Resource(role)]);
        assert_eq!(
            serde_json::to_value(&decl).unwrap(),
            json!({ "Type": "AWS::AutoScaling::LaunchConfiguration", "DependsOn": ["Role"] })
        );
    }

    #[test]
    fn test_parameter_renders() {
        let param = TemplateParameter::new(LogicalId::parse("ImageId").unwrap(), "String")
            .with_default("ami-123");
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({ "Type": "String", "Default": "ami-123" })
        );
    }
}
