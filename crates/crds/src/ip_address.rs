//! IPAddress CRD
//!
//! The fulfilled result of an `IPClaim`. Immutable once produced by the
//! external allocator; the static IP controllers only read it.

use crate::references::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of an allocated address.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ipam.staticip.dev",
    version = "v1alpha1",
    kind = "IPAddress",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct IPAddressSpec {
    /// The allocated address, without prefix length
    pub address: String,

    /// Prefix length of the address
    pub prefix: i32,

    /// Gateway for this address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// Claim this address fulfills
    pub claim: ObjectReference,

    /// Pool the address was drawn from
    pub pool: ObjectReference,
}
