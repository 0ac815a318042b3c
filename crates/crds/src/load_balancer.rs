//! LoadBalancer CRD
//!
//! A provisioned load-balancer virtual machine. Shares the
//! `NetworkDevice` model with `Machine`; pool selection uses the
//! LoadBalancer's own labels only (no template merge).

use crate::network::NetworkSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of a provisioned load balancer.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infra.staticip.dev",
    version = "v1alpha1",
    kind = "LoadBalancer",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    /// Virtual machine configuration carrying the network devices
    #[serde(default)]
    pub virtual_machine_configuration: VirtualMachineConfiguration,
}

/// Virtual machine configuration of a load balancer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineConfiguration {
    /// Desired network configuration
    #[serde(default)]
    pub network: NetworkSpec,
}
