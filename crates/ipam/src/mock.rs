//! Mock IPAM provider for unit testing
//!
//! Stores pools, claims, and fulfilled addresses in memory. Tests
//! pre-load pools with `add_pool`, then call `fulfill` to attach an
//! address to a claim the way the external allocator would, driving the
//! claim-pending to address-ready transition.

use crate::error::IpamError;
use crate::metal3io::select_pool;
use crate::provider::IpamProvider;
use async_trait::async_trait;
use crds::{IPAddress, IPClaim, IPClaimSpec, IPPool, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory allocation provider for tests.
#[derive(Debug, Default)]
pub struct MockIpamProvider {
    pools: Mutex<Vec<IPPool>>,
    claims: Mutex<BTreeMap<String, IPClaim>>,
    // fulfilled addresses, keyed by claim name
    addresses: Mutex<BTreeMap<String, IPAddress>>,
}

impl MockIpamProvider {
    /// Create an empty mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pool available for selection.
    pub fn add_pool(&self, pool: IPPool) {
        self.pools.lock().unwrap().push(pool);
    }

    /// Fulfill a claim with an address, as the external allocator would.
    pub fn fulfill(&self, claim_name: &str, address: IPAddress) {
        self.addresses
            .lock()
            .unwrap()
            .insert(claim_name.to_string(), address);
    }

    /// Number of claims filed so far.
    pub fn claim_count(&self) -> usize {
        self.claims.lock().unwrap().len()
    }

    /// The claim filed under `claim_name`, if any.
    pub fn claim(&self, claim_name: &str) -> Option<IPClaim> {
        self.claims.lock().unwrap().get(claim_name).cloned()
    }
}

#[async_trait]
impl IpamProvider for MockIpamProvider {
    async fn get_available_pool(
        &self,
        selector: &BTreeMap<String, String>,
        cluster_name: &str,
    ) -> Result<Option<IPPool>, IpamError> {
        let pools = self.pools.lock().unwrap().clone();
        Ok(select_pool(pools, selector, cluster_name))
    }

    async fn get_ip(
        &self,
        claim_name: &str,
        _pool: &IPPool,
    ) -> Result<Option<IPAddress>, IpamError> {
        Ok(self.addresses.lock().unwrap().get(claim_name).cloned())
    }

    async fn allocate_ip(
        &self,
        claim_name: &str,
        pool: &IPPool,
        owner: &OwnerReference,
    ) -> Result<IPClaim, IpamError> {
        let mut claims = self.claims.lock().unwrap();
        if let Some(existing) = claims.get(claim_name) {
            return Ok(existing.clone());
        }
        let claim = IPClaim {
            metadata: ObjectMeta {
                name: Some(claim_name.to_string()),
                owner_references: Some(vec![owner.clone()]),
                ..Default::default()
            },
            spec: IPClaimSpec {
                pool: ObjectReference::new(pool.metadata.name.clone().unwrap_or_default()),
            },
            status: None,
        };
        claims.insert(claim_name.to_string(), claim.clone());
        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::CLUSTER_NAME_KEY;
    use crds::IPPoolSpec;

    fn test_pool() -> IPPool {
        IPPool {
            metadata: ObjectMeta {
                name: Some("pool-a".to_string()),
                labels: Some(
                    [(CLUSTER_NAME_KEY.to_string(), "cluster-a".to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            spec: IPPoolSpec {
                prefix: 24,
                gateway: Some("10.0.0.1".to_string()),
                dns_servers: vec![],
                search_domains: vec![],
            },
        }
    }

    #[tokio::test]
    async fn allocate_is_idempotent() {
        let provider = MockIpamProvider::new();
        let pool = test_pool();
        let owner = OwnerReference {
            name: "machine-a".to_string(),
            ..Default::default()
        };

        provider.allocate_ip("machine-a-dev-0", &pool, &owner).await.unwrap();
        provider.allocate_ip("machine-a-dev-0", &pool, &owner).await.unwrap();

        assert_eq!(provider.claim_count(), 1);
        let claim = provider.claim("machine-a-dev-0").unwrap();
        assert_eq!(claim.spec.pool.name, "pool-a");
    }

    #[tokio::test]
    async fn get_ip_is_none_until_fulfilled() {
        let provider = MockIpamProvider::new();
        let pool = test_pool();
        let owner = OwnerReference::default();

        provider.allocate_ip("machine-a-dev-0", &pool, &owner).await.unwrap();
        assert!(provider.get_ip("machine-a-dev-0", &pool).await.unwrap().is_none());

        provider.fulfill(
            "machine-a-dev-0",
            IPAddress {
                metadata: Default::default(),
                spec: crds::IPAddressSpec {
                    address: "10.0.0.5".to_string(),
                    prefix: 24,
                    gateway: Some("10.0.0.1".to_string()),
                    claim: ObjectReference::new("machine-a-dev-0"),
                    pool: ObjectReference::new("pool-a"),
                },
            },
        );
        let address = provider.get_ip("machine-a-dev-0", &pool).await.unwrap();
        assert_eq!(address.map(|a| a.spec.address), Some("10.0.0.5".to_string()));
    }
}
