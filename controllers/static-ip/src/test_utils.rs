//! Test utilities for unit testing the reconciler
//!
//! Helpers for building Machines, devices, pools, and addresses used by
//! the allocation-pass tests.

use crds::*;
use ipam::util::CLUSTER_NAME_KEY;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

/// Label set selecting pools of a cluster.
pub fn cluster_selector(cluster: &str) -> BTreeMap<String, String> {
    [(CLUSTER_NAME_KEY.to_string(), cluster.to_string())]
        .into_iter()
        .collect()
}

/// An IPPool labeled for `cluster`, /24 with gateway, DNS, and search domain.
pub fn test_pool(name: &str, cluster: &str) -> IPPool {
    IPPool {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: Some(cluster_selector(cluster)),
            ..Default::default()
        },
        spec: IPPoolSpec {
            prefix: 24,
            gateway: Some("10.0.0.1".to_string()),
            dns_servers: vec!["8.8.8.8".to_string()],
            search_domains: vec!["example.com".to_string()],
        },
    }
}

/// A Static-mode device with no address yet.
pub fn static_device(network_name: &str) -> NetworkDevice {
    NetworkDevice {
        network_name: network_name.to_string(),
        allocation: AllocationMode::Static,
        ..Default::default()
    }
}

/// A DHCP-mode device.
pub fn dhcp_device(network_name: &str) -> NetworkDevice {
    NetworkDevice {
        network_name: network_name.to_string(),
        allocation: AllocationMode::Dhcp,
        ..Default::default()
    }
}

/// A Static-mode device that already carries an address.
pub fn addressed_device(network_name: &str, cidr: &str) -> NetworkDevice {
    NetworkDevice {
        network_name: network_name.to_string(),
        allocation: AllocationMode::Static,
        ip_addrs: vec![cidr.to_string()],
        ..Default::default()
    }
}

/// A fulfilled IPAddress for `claim_name`.
pub fn test_address(claim_name: &str, address: &str, prefix: i32, gateway: &str) -> IPAddress {
    IPAddress {
        metadata: ObjectMeta {
            name: Some(format!("{claim_name}-address")),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: IPAddressSpec {
            address: address.to_string(),
            prefix,
            gateway: Some(gateway.to_string()),
            claim: ObjectReference::new(claim_name),
            pool: ObjectReference::new("pool-a"),
        },
    }
}

/// A ControlPlane naming its machine template.
pub fn test_control_plane(name: &str, template_name: &str) -> ControlPlane {
    ControlPlane {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: ControlPlaneSpec {
            infrastructure_template: ObjectReference::new(template_name),
        },
    }
}

/// A MachineTemplate carrying pool selector labels.
pub fn test_template(name: &str, labels: &[(&str, &str)]) -> MachineTemplate {
    MachineTemplate {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        spec: MachineTemplateSpec {
            template: MachineTemplateResource::default(),
        },
    }
}

/// Owner reference of the object requesting allocation.
pub fn test_owner(name: &str) -> OwnerReference {
    OwnerReference {
        api_version: "infra.staticip.dev/v1alpha1".to_string(),
        kind: "Machine".to_string(),
        name: name.to_string(),
        uid: "00000000-0000-0000-0000-000000000000".to_string(),
        ..Default::default()
    }
}
