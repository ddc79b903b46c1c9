//! Cluster compiler.
//!
//! Turns a [`ClusterConfig`] into the declarations of a fixed-size worker
//! pool. Everything lives under `<scope>/WorkerAsg`:
//!
//! | Path                               | Kind                 |
//! |------------------------------------|----------------------|
//! | `InstanceSecurityGroup/Resource`   | security group       |
//! | `InstanceRole/Resource`            | IAM role             |
//! | `InstanceProfile`                  | instance profile     |
//! | `LaunchConfig`                     | launch configuration |
//! | `ASG`                              | auto scaling group   |
//!
//! # Invariants
//!
//! - `MinSize == MaxSize == desired_count`, string encoded
//! - `LaunchConfigurationName` is a `Ref` to the launch configuration built
//!   in the same pass
//! - Compilation reads only its arguments; the same input always yields the
//!   same declarations

use k3scdk_id::LogicalId;
use k3scdk_template::{
    PropertyValue, PseudoParameter, ResourceDeclaration, ResourceKind, TemplateParameter,
};
use tracing::debug;

use crate::config::{ClusterConfig, MachineImage};
use crate::network::{name_tags, NetworkResolver};
use crate::{ClusterError, Scope};

/// Construct id of the worker pool below a cluster.
pub const WORKER_POOL_ID: &str = "WorkerAsg";

/// Root device of the default worker image.
const ROOT_DEVICE_NAME: &str = "/dev/xvda";

/// Template type of SSM-resolved image parameters.
pub const SSM_IMAGE_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>";

/// Output of compiling one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCluster {
    pub launch_config: ResourceDeclaration,
    pub asg: ResourceDeclaration,
    pub security_group: ResourceDeclaration,
    pub role: ResourceDeclaration,
    pub instance_profile: ResourceDeclaration,
    pub parameters: Vec<TemplateParameter>,
}

impl CompiledCluster {
    /// Splits into template parameters and resource declarations.
    pub fn into_parts(self) -> (Vec<TemplateParameter>, Vec<ResourceDeclaration>) {
        (
            self.parameters,
            vec![
                self.security_group,
                self.role,
                self.instance_profile,
                self.launch_config,
                self.asg,
            ],
        )
    }
}

/// Compiles the cluster defined at `scope`.
///
/// Fails with [`ClusterError::InvalidConfiguration`] for a bad config and
/// [`ClusterError::UnresolvedNetworkReference`] when `resolver` does not
/// know the configured network.
pub fn compile(
    scope: &Scope,
    config: &ClusterConfig,
    resolver: &impl NetworkResolver,
) -> Result<CompiledCluster, ClusterError> {
    config.validate()?;

    let network = resolver
        .resolve_network(config.network())
        .ok_or_else(|| ClusterError::UnresolvedNetworkReference(config.network().clone()))?;
    if network.subnets.is_empty() {
        return Err(ClusterError::invalid(format!(
            "network {} has no subnets to place workers in",
            config.network()
        )));
    }

    let pool = scope.child(WORKER_POOL_ID)?;

    let sg_scope = pool.child("InstanceSecurityGroup")?;
    let security_group = ResourceDeclaration::new(
        sg_scope.child("Resource")?.logical_id()?,
        ResourceKind::SecurityGroup,
    )
    .with_property("GroupDescription", sg_scope.node_path())
    .with_property(
        "SecurityGroupEgress",
        PropertyValue::list([PropertyValue::map([
            ("CidrIp", PropertyValue::string("0.0.0.0/0")),
            (
                "Description",
                PropertyValue::string("Allow all outbound traffic by default"),
            ),
            ("IpProtocol", PropertyValue::string("-1")),
        ])]),
    )
    .with_property("Tags", name_tags(&pool))
    .with_property("VpcId", PropertyValue::resource_ref(&network.vpc));

    let role = ResourceDeclaration::new(
        pool.child("InstanceRole")?.child("Resource")?.logical_id()?,
        ResourceKind::IamRole,
    )
    .with_property("AssumeRolePolicyDocument", assume_role_policy("ec2.amazonaws.com"))
    .with_optional_property(
        "ManagedPolicyArns",
        (!config.managed_policies().is_empty()).then(|| {
            PropertyValue::list(config.managed_policies().iter().map(|p| managed_policy_arn(p)))
        }),
    )
    .with_property("Tags", name_tags(&pool));

    let instance_profile = ResourceDeclaration::new(
        pool.child("InstanceProfile")?.logical_id()?,
        ResourceKind::InstanceProfile,
    )
    .with_property(
        "Roles",
        PropertyValue::list([PropertyValue::resource_ref(role.logical_id())]),
    );

    let (image_id, parameters) = resolve_image(config.machine_image())?;

    let launch_config = ResourceDeclaration::new(
        pool.child("LaunchConfig")?.logical_id()?,
        ResourceKind::LaunchConfiguration,
    )
    .with_property("ImageId", image_id)
    .with_property("InstanceType", config.instance_type().as_str())
    .with_property(
        "IamInstanceProfile",
        PropertyValue::resource_ref(instance_profile.logical_id()),
    )
    .with_property(
        "SecurityGroups",
        PropertyValue::list([PropertyValue::get_att(
            security_group.logical_id(),
            "GroupId",
        )]),
    )
    .with_optional_property("SpotPrice", config.spot_price())
    .with_optional_property("KeyName", config.key_name())
    .with_optional_property(
        "BlockDeviceMappings",
        config.root_volume_size().map(root_volume),
    )
    .with_dependency(role.logical_id());

    let asg = ResourceDeclaration::new(
        pool.child("ASG")?.logical_id()?,
        ResourceKind::AutoScalingGroup,
    )
    .with_property("MinSize", PropertyValue::count(config.desired_count()))
    .with_property("MaxSize", PropertyValue::count(config.desired_count()))
    .with_property(
        "LaunchConfigurationName",
        PropertyValue::resource_ref(launch_config.logical_id()),
    )
    .with_property(
        "VPCZoneIdentifier",
        PropertyValue::list(network.subnets.iter().map(PropertyValue::resource_ref)),
    )
    .with_property(
        "Tags",
        PropertyValue::list([PropertyValue::map([
            ("Key", PropertyValue::string("Name")),
            ("PropagateAtLaunch", PropertyValue::Bool(true)),
            ("Value", PropertyValue::string(pool.node_path())),
        ])]),
    );

    debug!(
        cluster = %scope.path(),
        desired_count = config.desired_count(),
        instance_type = %config.instance_type(),
        network = %config.network(),
        asg = %asg.logical_id(),
        "compiled cluster"
    );

    Ok(CompiledCluster {
        launch_config,
        asg,
        security_group,
        role,
        instance_profile,
        parameters,
    })
}

/// Root EBS volume of `size_gib` GiB on the Amazon Linux root device.
fn root_volume(size_gib: u32) -> PropertyValue {
    PropertyValue::list([PropertyValue::map([
        ("DeviceName", PropertyValue::string(ROOT_DEVICE_NAME)),
        (
            "Ebs",
            PropertyValue::map([
                ("VolumeSize", PropertyValue::from(i64::from(size_gib))),
                ("VolumeType", PropertyValue::string("gp3")),
            ]),
        ),
    ])])
}

fn assume_role_policy(service: &str) -> PropertyValue {
    PropertyValue::map([
        (
            "Statement",
            PropertyValue::list([PropertyValue::map([
                ("Action", PropertyValue::string("sts:AssumeRole")),
                ("Effect", PropertyValue::string("Allow")),
                (
                    "Principal",
                    PropertyValue::map([("Service", PropertyValue::string(service))]),
                ),
            ])]),
        ),
        ("Version", PropertyValue::string("2012-10-17")),
    ])
}

/// `arn:<partition>:iam::aws:policy/<name>`
fn managed_policy_arn(name: &str) -> PropertyValue {
    PropertyValue::join(
        "",
        vec![
            PropertyValue::string("arn:"),
            PropertyValue::pseudo(PseudoParameter::Partition),
            PropertyValue::string(format!(":iam::aws:policy/{name}")),
        ],
    )
}

fn resolve_image(
    image: &MachineImage,
) -> Result<(PropertyValue, Vec<TemplateParameter>), ClusterError> {
    match image {
        MachineImage::Ami { id } => Ok((PropertyValue::string(id.as_str()), Vec::new())),
        MachineImage::Ssm { parameter } => {
            let logical_id =
                LogicalId::from_components(&["SsmParameterValue", parameter.as_str(), "Parameter"])?;
            let template_parameter = TemplateParameter::new(logical_id, SSM_IMAGE_PARAMETER_TYPE)
                .with_default(parameter.as_str())
                .with_description("Image the worker nodes boot from");
            Ok((
                PropertyValue::parameter_ref(template_parameter.logical_id()),
                vec![template_parameter],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::InstanceType;
    use crate::network::{NetworkRef, ResolvedNetwork};
    use k3scdk_id::ConstructPath;
    use k3scdk_template::{RefTarget, Template};
    use rstest::rstest;

    fn lid(s: &str) -> LogicalId {
        LogicalId::parse(s).unwrap()
    }

    fn network_ref() -> NetworkRef {
        NetworkRef::new(ConstructPath::parse("Vpc").unwrap())
    }

    fn resolver() -> BTreeMap<NetworkRef, ResolvedNetwork> {
        BTreeMap::from([(
            network_ref(),
            ResolvedNetwork {
                vpc: lid("Vpc8378EB38"),
                subnets: vec![lid("VpcPublicSubnet1SubnetA"), lid("VpcPublicSubnet2SubnetB")],
            },
        )])
    }

    fn cluster_scope() -> Scope {
        Scope::root("testing-stack").child("Cluster").unwrap()
    }

    fn compile_default() -> CompiledCluster {
        compile(
            &cluster_scope(),
            &ClusterConfig::default_for(network_ref()),
            &resolver(),
        )
        .unwrap()
    }

    #[test]
    fn test_asg_is_fixed_size() {
        let compiled = compile_default();
        assert_eq!(compiled.asg.kind(), ResourceKind::AutoScalingGroup);
        assert_eq!(
            compiled.asg.property("MinSize"),
            Some(&PropertyValue::string("3"))
        );
        assert_eq!(
            compiled.asg.property("MaxSize"),
            Some(&PropertyValue::string("3"))
        );
        assert!(compiled.asg.property("DesiredCapacity").is_none());
    }

    #[test]
    fn test_asg_references_paired_launch_config() {
        let compiled = compile_default();
        assert_eq!(compiled.launch_config.kind(), ResourceKind::LaunchConfiguration);
        assert_eq!(
            compiled
                .asg
                .property("LaunchConfigurationName")
                .and_then(PropertyValue::as_resource_ref),
            Some(compiled.launch_config.logical_id())
        );
        assert!(compiled
            .launch_config
            .logical_id()
            .as_str()
            .starts_with("ClusterWorkerAsgLaunchConfig"));
    }

    #[test]
    fn test_asg_spans_all_subnets() {
        let compiled = compile_default();
        let expected = PropertyValue::list([
            PropertyValue::resource_ref(&lid("VpcPublicSubnet1SubnetA")),
            PropertyValue::resource_ref(&lid("VpcPublicSubnet2SubnetB")),
        ]);
        assert_eq!(compiled.asg.property("VPCZoneIdentifier"), Some(&expected));
    }

    #[test]
    fn test_launch_config_wiring() {
        let compiled = compile_default();
        let lc = &compiled.launch_config;

        assert_eq!(
            lc.property("InstanceType"),
            Some(&PropertyValue::string("t3.medium"))
        );
        assert_eq!(
            lc.property("IamInstanceProfile")
                .and_then(PropertyValue::as_resource_ref),
            Some(compiled.instance_profile.logical_id())
        );
        assert_eq!(lc.depends_on(), &[compiled.role.logical_id().clone()]);
        assert!(lc.property("SpotPrice").is_none());
        assert!(lc.property("KeyName").is_none());

        let param = &compiled.parameters[0];
        assert_eq!(
            lc.property("ImageId"),
            Some(&PropertyValue::Ref(RefTarget::Parameter(
                param.logical_id().clone()
            )))
        );
        assert_eq!(param.parameter_type(), SSM_IMAGE_PARAMETER_TYPE);
        assert_eq!(
            param.default_value(),
            Some(crate::config::DEFAULT_IMAGE_PARAMETER)
        );
    }

    #[test]
    fn test_optional_launch_settings() {
        let config = ClusterConfig::default_for(network_ref())
            .with_spot_price("0.0416")
            .with_key_name("ops")
            .with_machine_image(MachineImage::Ami {
                id: "ami-0abc".into(),
            })
            .with_managed_policy("AmazonSSMManagedInstanceCore");
        let compiled = compile(&cluster_scope(), &config, &resolver()).unwrap();

        let lc = &compiled.launch_config;
        assert_eq!(lc.property("SpotPrice"), Some(&PropertyValue::string("0.0416")));
        assert_eq!(lc.property("KeyName"), Some(&PropertyValue::string("ops")));
        assert_eq!(lc.property("ImageId"), Some(&PropertyValue::string("ami-0abc")));
        assert!(compiled.parameters.is_empty());

        let arns = compiled.role.property("ManagedPolicyArns").unwrap();
        let mut refs = Vec::new();
        arns.collect_references(&mut refs);
        assert_eq!(refs, vec![RefTarget::Pseudo(PseudoParameter::Partition)]);
    }

    #[test]
    fn test_declarations_form_closed_template_with_network() {
        let compiled = compile_default();
        let mut template = Template::new();
        for (id, kind) in [
            ("Vpc8378EB38", ResourceKind::Vpc),
            ("VpcPublicSubnet1SubnetA", ResourceKind::Subnet),
            ("VpcPublicSubnet2SubnetB", ResourceKind::Subnet),
        ] {
            template
                .insert_resource(ResourceDeclaration::new(lid(id), kind))
                .unwrap();
        }
        let (parameters, resources) = compiled.into_parts();
        template.insert_all(parameters, resources).unwrap();
        assert!(template.validate().is_ok());
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(250)]
    fn test_min_equals_max(#[case] count: u32) {
        let config = ClusterConfig::new(count, InstanceType::default(), network_ref());
        let compiled = compile(&cluster_scope(), &config, &resolver()).unwrap();
        let expected = PropertyValue::string(count.to_string());
        assert_eq!(compiled.asg.property("MinSize"), Some(&expected));
        assert_eq!(compiled.asg.property("MaxSize"), Some(&expected));
    }

    #[test]
    fn test_zero_count_fails() {
        let config = ClusterConfig::new(0, InstanceType::default(), network_ref());
        assert!(matches!(
            compile(&cluster_scope(), &config, &resolver()),
            Err(ClusterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_network_fails() {
        let missing = NetworkRef::new(ConstructPath::parse("Elsewhere").unwrap());
        let config = ClusterConfig::default_for(missing.clone());
        assert_eq!(
            compile(&cluster_scope(), &config, &resolver()),
            Err(ClusterError::UnresolvedNetworkReference(missing))
        );
    }

    #[test]
    fn test_network_without_subnets_fails() {
        let resolver = BTreeMap::from([(
            network_ref(),
            ResolvedNetwork {
                vpc: lid("Vpc"),
                subnets: vec![],
            },
        )]);
        let config = ClusterConfig::default_for(network_ref());
        assert!(matches!(
            compile(&cluster_scope(), &config, &resolver),
            Err(ClusterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_declarations_have_distinct_ids() {
        let (_, resources) = compile_default().into_parts();
        let ids: std::collections::BTreeSet<_> =
            resources.iter().map(|d| d.logical_id().clone()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_root_volume_size_is_numeric() {
        let config = ClusterConfig::default_for(network_ref()).with_root_volume_size(50);
        let compiled = compile(&cluster_scope(), &config, &resolver()).unwrap();

        let mappings = compiled.launch_config.property("BlockDeviceMappings").unwrap();
        assert_eq!(
            serde_json::to_value(mappings).unwrap(),
            serde_json::json!([{
                "DeviceName": "/dev/xvda",
                "Ebs": { "VolumeSize": 50, "VolumeType": "gp3" }
            }])
        );
        assert!(compile_default()
            .launch_config
            .property("BlockDeviceMappings")
            .is_none());
    }

    #[test]
    fn test_compile_is_deterministic() {
        assert_eq!(compile_default(), compile_default());
    }
}
