//! ControlPlane CRD
//!
//! The control-plane object of a cluster. Its only role here is to name
//! the `MachineTemplate` control-plane machines are stamped from; the
//! controller finds it via the cluster-name label and requires exactly
//! one match.

use crate::references::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of a cluster control plane.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "infra.staticip.dev",
    version = "v1alpha1",
    kind = "ControlPlane",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneSpec {
    /// Template the control-plane machines are created from
    pub infrastructure_template: ObjectReference,
}
