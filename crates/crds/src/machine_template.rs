//! MachineTemplate CRD
//!
//! Template control-plane machines are stamped from. Pool selector
//! labels for control-plane machines live on the template's metadata,
//! so the controller merges them into the machine's own labels before
//! resolving a pool.

use crate::network::NetworkSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of a machine template.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infra.staticip.dev",
    version = "v1alpha1",
    kind = "MachineTemplate",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MachineTemplateSpec {
    /// Machine spec stamped onto machines created from this template
    #[serde(default)]
    pub template: MachineTemplateResource,
}

/// The templated machine content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineTemplateResource {
    /// Desired network configuration
    #[serde(default)]
    pub network: NetworkSpec,
}
