//! Reconciliation of static IP addresses for Machine and LoadBalancer
//! resources.
//!
//! One pass walks the object's network devices in order, claims an
//! address for every `Static` device that has none, and commits all
//! device changes together in a single patch conditioned on the
//! snapshot the pass started from. Not-ready outcomes (no matching
//! pool, claim not fulfilled yet, unsupported provider type) end the
//! pass cleanly before any write, so repeated invocations either fully
//! commit or change nothing.

use crate::error::ControllerError;
use crds::{ControlPlane, LoadBalancer, Machine, MachineTemplate, NetworkDevice};
use ipam::provider_factory;
use ipam::util::{self, CLUSTER_NAME_KEY, CONTROL_PLANE_LABEL};
use ipam::IpamProvider;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// API version written into claim owner references.
const API_VERSION: &str = "infra.staticip.dev/v1alpha1";

/// Delay before re-checking a claim the allocator has not fulfilled yet.
const ADDRESS_WAIT_REQUEUE: Duration = Duration::from_secs(30);

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Suggested delay before reconciling the same object again.
    /// A hint to the dispatcher, not a guarantee.
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Nothing left to do for now.
    pub fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    /// Ask to be re-invoked after `delay`.
    pub fn requeue_after(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }
}

/// What a pass decided for an object's device list.
#[derive(Debug)]
pub(crate) enum DevicePlan {
    /// No device needed work; nothing to patch
    Unchanged,
    /// Full replacement device list to commit in one patch
    Updated(Vec<NetworkDevice>),
    /// No matching pool yet; end the pass without a patch
    WaitForPool,
    /// Claim filed, address not fulfilled yet; end the pass without a patch
    WaitForAddress,
}

/// Reconciles static IP allocation for provisioning objects.
pub struct Reconciler {
    client: Client,
    namespace: String,
    ipam_provider_type: String,
    machine_api: Api<Machine>,
    machine_template_api: Api<MachineTemplate>,
    control_plane_api: Api<ControlPlane>,
    load_balancer_api: Api<LoadBalancer>,
}

impl Reconciler {
    /// Creates a new reconciler bound to one namespace.
    pub fn new(client: Client, namespace: &str, ipam_provider_type: String) -> Self {
        Self {
            machine_api: Api::namespaced(client.clone(), namespace),
            machine_template_api: Api::namespaced(client.clone(), namespace),
            control_plane_api: Api::namespaced(client.clone(), namespace),
            load_balancer_api: Api::namespaced(client.clone(), namespace),
            client,
            namespace: namespace.to_string(),
            ipam_provider_type,
        }
    }

    /// Reconciles the static IP addresses of a Machine.
    pub async fn reconcile_machine(
        &self,
        machine: &Machine,
    ) -> Result<ReconcileResult, ControllerError> {
        let name = machine
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("Machine missing name".to_string()))?;
        info!("reconcile IP addresses for Machine {}", name);

        let devices = &machine.spec.network.devices;
        if devices.is_empty() {
            info!("no network device found for Machine {}", name);
            return Ok(ReconcileResult::done());
        }
        if util::is_allocation_dhcp(devices) {
            info!("Machine {} has allocation type DHCP", name);
            return Ok(ReconcileResult::done());
        }

        let Some(cluster_name) = machine.labels().get(CLUSTER_NAME_KEY).cloned() else {
            info!("Machine {} is missing the cluster label", name);
            return Ok(ReconcileResult::done());
        };

        let Some(factory) = provider_factory(&self.ipam_provider_type) else {
            info!("ipam type {} not supported", self.ipam_provider_type);
            return Ok(ReconcileResult::done());
        };
        let provider = factory(self.client.clone(), &self.namespace);

        let selector = self.machine_selector_labels(machine, &cluster_name).await?;
        let owner = util::owner_reference(API_VERSION, "Machine", &machine.metadata);

        let plan = allocate_devices(
            provider.as_ref(),
            name,
            devices,
            &selector,
            &cluster_name,
            &owner,
        )
        .await?;

        match plan {
            DevicePlan::Unchanged => Ok(ReconcileResult::done()),
            DevicePlan::WaitForPool => {
                // pool watch events drive the next attempt
                info!("waiting for IPPool to be available for Machine {}", name);
                Ok(ReconcileResult::done())
            }
            DevicePlan::WaitForAddress => {
                info!("waiting for IP address to be available for Machine {}", name);
                Ok(ReconcileResult::requeue_after(ADDRESS_WAIT_REQUEUE))
            }
            DevicePlan::Updated(updated) => {
                let patch = conditional_patch(
                    &machine.metadata.resource_version,
                    serde_json::json!({"spec": {"network": {"devices": updated}}}),
                );
                self.machine_api
                    .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                info!("successfully reconciled IP addresses for Machine {}", name);
                Ok(ReconcileResult::done())
            }
        }
    }

    /// Reconciles the static IP addresses of a LoadBalancer.
    pub async fn reconcile_load_balancer(
        &self,
        lb: &LoadBalancer,
    ) -> Result<ReconcileResult, ControllerError> {
        let name = lb.metadata.name.as_deref().ok_or_else(|| {
            ControllerError::InvalidConfig("LoadBalancer missing name".to_string())
        })?;
        info!("reconcile IP addresses for LoadBalancer {}", name);

        let devices = &lb.spec.virtual_machine_configuration.network.devices;
        if devices.is_empty() {
            info!("no network device found for LoadBalancer {}", name);
            return Ok(ReconcileResult::done());
        }
        if util::is_allocation_dhcp(devices) {
            info!("LoadBalancer {} has allocation type DHCP", name);
            return Ok(ReconcileResult::done());
        }

        let Some(cluster_name) = lb.labels().get(CLUSTER_NAME_KEY).cloned() else {
            info!("LoadBalancer {} is missing the cluster label", name);
            return Ok(ReconcileResult::done());
        };

        let Some(factory) = provider_factory(&self.ipam_provider_type) else {
            info!("ipam type {} not supported", self.ipam_provider_type);
            return Ok(ReconcileResult::done());
        };
        let provider = factory(self.client.clone(), &self.namespace);

        // load balancers select pools with their own labels only
        let selector = lb.labels().clone();
        let owner = util::owner_reference(API_VERSION, "LoadBalancer", &lb.metadata);

        let plan = allocate_devices(
            provider.as_ref(),
            name,
            devices,
            &selector,
            &cluster_name,
            &owner,
        )
        .await?;

        match plan {
            DevicePlan::Unchanged => Ok(ReconcileResult::done()),
            DevicePlan::WaitForPool => {
                info!("waiting for IPPool to be available for LoadBalancer {}", name);
                Ok(ReconcileResult::done())
            }
            DevicePlan::WaitForAddress => {
                info!(
                    "waiting for IP address to be available for LoadBalancer {}",
                    name
                );
                Ok(ReconcileResult::requeue_after(ADDRESS_WAIT_REQUEUE))
            }
            DevicePlan::Updated(updated) => {
                let patch = conditional_patch(
                    &lb.metadata.resource_version,
                    serde_json::json!({
                        "spec": {"virtualMachineConfiguration": {"network": {"devices": updated}}}
                    }),
                );
                self.load_balancer_api
                    .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                info!(
                    "successfully reconciled IP addresses for LoadBalancer {}",
                    name
                );
                Ok(ReconcileResult::done())
            }
        }
    }

    /// Pool selector labels for a machine.
    ///
    /// Control-plane machines inherit the labels of their template: the
    /// unique ControlPlane for the cluster names the MachineTemplate,
    /// and the template's labels are merged over the machine's own.
    /// Zero or multiple ControlPlane candidates is a configuration
    /// error, never a silent pick.
    async fn machine_selector_labels(
        &self,
        machine: &Machine,
        cluster_name: &str,
    ) -> Result<BTreeMap<String, String>, ControllerError> {
        let mut labels = machine.labels().clone();
        if !labels.contains_key(CONTROL_PLANE_LABEL) {
            return Ok(labels);
        }

        let lp = ListParams::default().labels(&format!("{CLUSTER_NAME_KEY}={cluster_name}"));
        let control_planes = self.control_plane_api.list(&lp).await?;
        let control_plane = control_plane_for_cluster(&control_planes.items, cluster_name)?;

        let template_name = &control_plane.spec.infrastructure_template.name;
        let template = self.machine_template_api.get(template_name).await?;
        Ok(merge_template_labels(&labels, &template))
    }
}

/// Pick the unique ControlPlane of a cluster among the listed candidates.
///
/// Zero or multiple candidates is a configuration error, never a
/// silent pick.
pub(crate) fn control_plane_for_cluster<'a>(
    candidates: &'a [ControlPlane],
    cluster_name: &str,
) -> Result<&'a ControlPlane, ControllerError> {
    match candidates {
        [cp] => Ok(cp),
        [] => Err(ControllerError::TemplateResolution(format!(
            "no ControlPlane found for cluster {cluster_name}"
        ))),
        _ => Err(ControllerError::TemplateResolution(format!(
            "multiple ControlPlanes found for cluster {cluster_name}"
        ))),
    }
}

/// Merge a template's labels over an object's own.
///
/// The template wins on key collisions.
pub(crate) fn merge_template_labels(
    labels: &BTreeMap<String, String>,
    template: &MachineTemplate,
) -> BTreeMap<String, String> {
    let mut merged = labels.clone();
    merged.extend(template.labels().clone());
    merged
}

/// One allocation pass over an object's devices, in declared order.
///
/// All-or-nothing: the first not-ready device aborts the pass, and
/// devices already processed are discarded rather than committed.
pub(crate) async fn allocate_devices(
    provider: &dyn IpamProvider,
    object_name: &str,
    devices: &[NetworkDevice],
    selector: &BTreeMap<String, String>,
    cluster_name: &str,
    owner: &OwnerReference,
) -> Result<DevicePlan, ControllerError> {
    let mut updated = Vec::with_capacity(devices.len());
    let mut changed = false;

    for (index, device) in devices.iter().enumerate() {
        if !util::needs_allocation(device) {
            updated.push(device.clone());
            continue;
        }

        let Some(pool) = provider.get_available_pool(selector, cluster_name).await? else {
            return Ok(DevicePlan::WaitForPool);
        };

        let claim_name = util::claim_name(object_name, index);
        match provider.get_ip(&claim_name, &pool).await? {
            None => {
                provider.allocate_ip(&claim_name, &pool, owner).await?;
                return Ok(DevicePlan::WaitForAddress);
            }
            Some(address) => {
                util::validate_address(&address)?;
                info!(
                    "assigning IP address {} to {} device {}",
                    address.spec.address, object_name, index
                );
                updated.push(util::apply_address(device, &address, &pool));
                changed = true;
            }
        }
    }

    if changed {
        Ok(DevicePlan::Updated(updated))
    } else {
        Ok(DevicePlan::Unchanged)
    }
}

/// Merge patch conditioned on the snapshot's resource version, so a
/// concurrent writer causes a Conflict instead of a silent overwrite.
fn conditional_patch(
    resource_version: &Option<String>,
    mut body: serde_json::Value,
) -> serde_json::Value {
    if let Some(rv) = resource_version {
        body["metadata"] = serde_json::json!({"resourceVersion": rv});
    }
    body
}
