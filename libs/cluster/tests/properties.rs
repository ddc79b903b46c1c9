//! Properties that must hold for every valid cluster configuration.

use std::collections::BTreeMap;

use k3scdk_cluster::{
    compile, ClusterConfig, InstanceType, NetworkRef, ResolvedNetwork, Scope,
};
use k3scdk_id::{ConstructPath, LogicalId};
use k3scdk_template::{PropertyValue, Template};
use proptest::prelude::*;

fn network_ref() -> NetworkRef {
    NetworkRef::new(ConstructPath::parse("Vpc").unwrap())
}

fn resolver(subnets: usize) -> BTreeMap<NetworkRef, ResolvedNetwork> {
    BTreeMap::from([(
        network_ref(),
        ResolvedNetwork {
            vpc: LogicalId::parse("VpcResource").unwrap(),
            subnets: (1..=subnets)
                .map(|i| LogicalId::parse(&format!("VpcSubnet{i}")).unwrap())
                .collect(),
        },
    )])
}

fn instance_type() -> impl Strategy<Value = InstanceType> {
    prop::sample::select(vec!["t3.medium", "t3.large", "m5.xlarge", "c6g.2xlarge"])
        .prop_map(|s| InstanceType::parse(s).unwrap())
}

proptest! {
    #[test]
    fn prop_min_and_max_equal_desired_count(
        count in 1u32..=10_000,
        instance_type in instance_type(),
        cluster_id in "[A-Z][A-Za-z0-9]{0,12}",
    ) {
        let scope = Scope::root("prop-stack").child(&cluster_id).unwrap();
        let config = ClusterConfig::new(count, instance_type, network_ref());
        let compiled = compile(&scope, &config, &resolver(2)).unwrap();

        let expected = PropertyValue::string(count.to_string());
        prop_assert_eq!(compiled.asg.property("MinSize"), Some(&expected));
        prop_assert_eq!(compiled.asg.property("MaxSize"), Some(&expected));
    }

    #[test]
    fn prop_asg_references_its_own_launch_config(
        count in 1u32..=100,
        subnets in 1usize..=6,
        cluster_id in "[A-Z][A-Za-z0-9]{0,12}",
    ) {
        let scope = Scope::root("prop-stack").child(&cluster_id).unwrap();
        let config = ClusterConfig::new(count, InstanceType::default(), network_ref());
        let compiled = compile(&scope, &config, &resolver(subnets)).unwrap();

        let target = compiled
            .asg
            .property("LaunchConfigurationName")
            .and_then(PropertyValue::as_resource_ref);
        prop_assert_eq!(target, Some(compiled.launch_config.logical_id()));
    }

    #[test]
    fn prop_compile_is_idempotent(count in 1u32..=100, subnets in 1usize..=6) {
        let scope = Scope::root("prop-stack").child("Cluster").unwrap();
        let config = ClusterConfig::new(count, InstanceType::default(), network_ref());
        let first = compile(&scope, &config, &resolver(subnets)).unwrap();
        let second = compile(&scope, &config, &resolver(subnets)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_declarations_only_reference_known_ids(count in 1u32..=100, subnets in 1usize..=6) {
        let scope = Scope::root("prop-stack").child("Cluster").unwrap();
        let config = ClusterConfig::new(count, InstanceType::default(), network_ref());
        let compiled = compile(&scope, &config, &resolver(subnets)).unwrap();

        let network = resolver(subnets).remove(&network_ref()).unwrap();
        let mut template = Template::new();
        for id in std::iter::once(network.vpc).chain(network.subnets) {
            template
                .insert_resource(k3scdk_template::ResourceDeclaration::new(
                    id,
                    k3scdk_template::ResourceKind::Subnet,
                ))
                .unwrap();
        }
        let (parameters, resources) = compiled.into_parts();
        template.insert_all(parameters, resources).unwrap();
        prop_assert!(template.validate().is_ok());
    }
}
