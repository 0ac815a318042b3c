//! IPPool CRD
//!
//! A pool of allocatable addresses plus the network metadata shared by
//! every address drawn from it. Pools are owned by the external IPAM
//! allocator; the static IP controllers only read them. Selector
//! matching is done against the pool's metadata labels.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec of an address pool.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ipam.staticip.dev",
    version = "v1alpha1",
    kind = "IPPool",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolSpec {
    /// Prefix length applied to addresses allocated from this pool
    pub prefix: i32,

    /// Default gateway for addresses from this pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// DNS nameservers copied to devices using this pool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,

    /// DNS search domains copied to devices using this pool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_domains: Vec<String>,
}
