//! Allocation provider abstraction
//!
//! Exactly one provider type is wired into a deployment. The registry
//! maps the configured provider type to a constructor; an unknown type
//! is a handled "unsupported" outcome for callers, never a crash.

use crate::error::IpamError;
use async_trait::async_trait;
use crds::{IPAddress, IPClaim, IPPool};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Client;
use std::collections::BTreeMap;

/// Address allocation backend.
#[async_trait]
pub trait IpamProvider: Send + Sync {
    /// Find a pool whose labels cover `selector` and whose cluster-name
    /// label matches `cluster_name`.
    ///
    /// `None` is the normal "no pool ready yet" state, not an error.
    async fn get_available_pool(
        &self,
        selector: &BTreeMap<String, String>,
        cluster_name: &str,
    ) -> Result<Option<IPPool>, IpamError>;

    /// Look up the address a claim resolved to.
    ///
    /// `None` covers both "claim does not exist" and "claim exists but
    /// is not fulfilled yet"; callers treat them identically.
    async fn get_ip(
        &self,
        claim_name: &str,
        pool: &IPPool,
    ) -> Result<Option<IPAddress>, IpamError>;

    /// File a claim for one address out of `pool`, owned by `owner`.
    ///
    /// Creating a claim that already exists is a no-op returning the
    /// existing claim; its parameters are never overwritten.
    async fn allocate_ip(
        &self,
        claim_name: &str,
        pool: &IPPool,
        owner: &OwnerReference,
    ) -> Result<IPClaim, IpamError>;
}

/// Constructor for a provider bound to the cluster API and one namespace.
pub type ProviderFactory = fn(Client, &str) -> Box<dyn IpamProvider>;

/// Look up the constructor for a provider type.
///
/// Unknown types return `None`; callers log and defer reconciliation,
/// leaving every device untouched.
pub fn provider_factory(provider_type: &str) -> Option<ProviderFactory> {
    match provider_type {
        crate::metal3io::PROVIDER_TYPE => Some(crate::metal3io::Metal3Provider::factory),
        _ => None,
    }
}
