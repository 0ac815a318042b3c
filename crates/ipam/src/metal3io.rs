//! metal3io IPAM provider
//!
//! Backs the provider abstraction with metal3-style `IPPool`/`IPClaim`/
//! `IPAddress` resources served by the cluster API. Pools and addresses
//! are owned by the external allocator and only read here; claims are
//! created with idempotent-create semantics and fulfilled asynchronously.

use crate::error::IpamError;
use crate::provider::IpamProvider;
use crate::util::CLUSTER_NAME_KEY;
use async_trait::async_trait;
use crds::{IPAddress, IPClaim, IPClaimSpec, IPPool, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Client;
use kube::api::{Api, ListParams, PostParams};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Registry key of this provider.
pub const PROVIDER_TYPE: &str = "metal3io";

/// IPAM provider over metal3-style pool/claim/address resources.
pub struct Metal3Provider {
    pool_api: Api<IPPool>,
    claim_api: Api<IPClaim>,
    address_api: Api<IPAddress>,
    namespace: String,
}

impl std::fmt::Debug for Metal3Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metal3Provider")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl Metal3Provider {
    /// Create a provider bound to one namespace.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pool_api: Api::namespaced(client.clone(), namespace),
            claim_api: Api::namespaced(client.clone(), namespace),
            address_api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }

    /// Registry constructor.
    pub fn factory(client: Client, namespace: &str) -> Box<dyn IpamProvider> {
        Box::new(Self::new(client, namespace))
    }
}

#[async_trait]
impl IpamProvider for Metal3Provider {
    async fn get_available_pool(
        &self,
        selector: &BTreeMap<String, String>,
        cluster_name: &str,
    ) -> Result<Option<IPPool>, IpamError> {
        let pools = self.pool_api.list(&ListParams::default()).await?;
        Ok(select_pool(pools.items, selector, cluster_name))
    }

    async fn get_ip(
        &self,
        claim_name: &str,
        _pool: &IPPool,
    ) -> Result<Option<IPAddress>, IpamError> {
        let Some(claim) = self.claim_api.get_opt(claim_name).await? else {
            return Ok(None);
        };
        let Some(address_ref) = claim.status.as_ref().and_then(|s| s.address.as_ref()) else {
            debug!("IPClaim {} exists but is not fulfilled yet", claim_name);
            return Ok(None);
        };
        let address = self.address_api.get(&address_ref.name).await?;
        Ok(Some(address))
    }

    async fn allocate_ip(
        &self,
        claim_name: &str,
        pool: &IPPool,
        owner: &OwnerReference,
    ) -> Result<IPClaim, IpamError> {
        let pool_name = pool.metadata.name.clone().unwrap_or_default();
        let claim = IPClaim {
            metadata: ObjectMeta {
                name: Some(claim_name.to_string()),
                namespace: Some(self.namespace.clone()),
                owner_references: Some(vec![owner.clone()]),
                ..Default::default()
            },
            spec: IPClaimSpec {
                pool: ObjectReference::new(pool_name),
            },
            status: None,
        };

        match self.claim_api.create(&PostParams::default(), &claim).await {
            Ok(created) => {
                info!("created IPClaim {} in {}", claim_name, self.namespace);
                Ok(created)
            }
            // An earlier pass already filed this claim; keep its parameters.
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!("IPClaim {} already exists", claim_name);
                let existing = self.claim_api.get(claim_name).await?;
                Ok(existing)
            }
            Err(e) => Err(IpamError::Kube(e)),
        }
    }
}

/// Pick the pool serving a selector.
///
/// A pool matches when its labels are a superset of the selector and
/// its cluster-name label names the requesting object's cluster. Ties
/// break lexicographically by pool name so repeated passes always pick
/// the same pool.
pub fn select_pool(
    pools: Vec<IPPool>,
    selector: &BTreeMap<String, String>,
    cluster_name: &str,
) -> Option<IPPool> {
    let mut matching: Vec<IPPool> = pools
        .into_iter()
        .filter(|pool| pool_matches(pool, selector, cluster_name))
        .collect();
    matching.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    matching.into_iter().next()
}

fn pool_matches(pool: &IPPool, selector: &BTreeMap<String, String>, cluster_name: &str) -> bool {
    let Some(labels) = pool.metadata.labels.as_ref() else {
        return false;
    };
    if labels.get(CLUSTER_NAME_KEY).map(String::as_str) != Some(cluster_name) {
        return false;
    }
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::IPPoolSpec;

    fn pool(name: &str, labels: &[(&str, &str)]) -> IPPool {
        IPPool {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
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

    fn selector(labels: &[(&str, &str)]) -> BTreeMap<String, String> {
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_pools_means_not_ready() {
        assert!(select_pool(vec![], &selector(&[]), "cluster-a").is_none());
    }

    #[test]
    fn pool_labels_must_cover_selector() {
        let pools = vec![pool(
            "pool-a",
            &[(CLUSTER_NAME_KEY, "cluster-a"), ("tier", "worker")],
        )];
        let found = select_pool(pools.clone(), &selector(&[("tier", "worker")]), "cluster-a");
        assert_eq!(found.and_then(|p| p.metadata.name), Some("pool-a".to_string()));

        // selector key the pool does not carry
        assert!(select_pool(pools, &selector(&[("tier", "control-plane")]), "cluster-a").is_none());
    }

    #[test]
    fn cluster_label_must_match() {
        let pools = vec![pool("pool-a", &[(CLUSTER_NAME_KEY, "cluster-a")])];
        assert!(select_pool(pools.clone(), &selector(&[]), "cluster-b").is_none());
        assert!(select_pool(pools, &selector(&[]), "cluster-a").is_some());
    }

    #[test]
    fn unlabeled_pool_never_matches() {
        let unlabeled = IPPool {
            metadata: ObjectMeta {
                name: Some("pool-a".to_string()),
                ..Default::default()
            },
            spec: IPPoolSpec {
                prefix: 24,
                gateway: None,
                dns_servers: vec![],
                search_domains: vec![],
            },
        };
        assert!(select_pool(vec![unlabeled], &selector(&[]), "cluster-a").is_none());
    }

    #[test]
    fn tie_break_is_lexicographic_by_name() {
        let labels = [(CLUSTER_NAME_KEY, "cluster-a")];
        let pools = vec![pool("pool-b", &labels), pool("pool-a", &labels)];
        let found = select_pool(pools, &selector(&[]), "cluster-a");
        assert_eq!(found.and_then(|p| p.metadata.name), Some("pool-a".to_string()));
    }
}
