//! Machine CRD
//!
//! A provisioned virtual machine with a desired network configuration.
//! The machine's labels select the `IPPool` its static devices draw
//! from; the owning cluster is carried in the standard
//! `cluster.x-k8s.io/cluster-name` label, and control-plane members
//! additionally carry `cluster.x-k8s.io/control-plane`.

use crate::network::NetworkSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of a provisioned machine.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infra.staticip.dev",
    version = "v1alpha1",
    kind = "Machine",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Desired network configuration
    #[serde(default)]
    pub network: NetworkSpec,
}
