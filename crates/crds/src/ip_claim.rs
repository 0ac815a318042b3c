//! IPClaim CRD
//!
//! A request for one address out of a specific pool. Claim names are
//! derived deterministically from `(object name, device index)`, so a
//! re-run of reconciliation re-targets the same claim instead of
//! creating a duplicate. Claims are fulfilled asynchronously by the
//! external allocator, which records the resulting `IPAddress` in the
//! claim status.

use crate::references::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of an address claim.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ipam.staticip.dev",
    version = "v1alpha1",
    kind = "IPClaim",
    namespaced,
    status = "IPClaimStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct IPClaimSpec {
    /// Pool the address should be drawn from
    pub pool: ObjectReference,
}

/// Status of an address claim, written by the external allocator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IPClaimStatus {
    /// Reference to the fulfilled `IPAddress`; unset while the claim is pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<ObjectReference>,

    /// Allocation failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
