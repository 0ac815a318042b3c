//! Kubernetes resource watchers.
//!
//! Machines and LoadBalancers are reconciled on their own change
//! events. IPPool and IPAddress events re-reconcile every object in the
//! namespace: that is how a pass that ended in "waiting for pool" or
//! "waiting for address" gets re-driven without spin-waiting. Requeue
//! hints from the reconciler are honored with a background sleep task,
//! at most one per object at a time.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{IPAddress, IPPool, LoadBalancer, Machine};
use futures::TryStreamExt;
use kube::Api;
use kube::api::ListParams;
use kube_runtime::watcher;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tracks which objects already have a requeue poller running.
///
/// Every watch event for an object stuck waiting would otherwise spawn
/// its own poller; the tracker admits one per object and the rest are
/// dropped, since the running poller already covers them.
#[derive(Debug, Default)]
pub struct RequeueTracker {
    in_flight: Mutex<HashSet<String>>,
}

impl RequeueTracker {
    /// Claim the poller slot for `key`. False means one is already running.
    fn begin(&self, key: &str) -> bool {
        self.lock().insert(key.to_string())
    }

    /// Release the slot once the poller exits.
    fn finish(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Watches Kubernetes resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    machine_api: Api<Machine>,
    load_balancer_api: Api<LoadBalancer>,
    ip_pool_api: Api<IPPool>,
    ip_address_api: Api<IPAddress>,
    requeues: Arc<RequeueTracker>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        machine_api: Api<Machine>,
        load_balancer_api: Api<LoadBalancer>,
        ip_pool_api: Api<IPPool>,
        ip_address_api: Api<IPAddress>,
        requeues: Arc<RequeueTracker>,
    ) -> Self {
        Self {
            reconciler,
            machine_api,
            load_balancer_api,
            ip_pool_api,
            ip_address_api,
            requeues,
        }
    }

    /// Starts watching Machine resources.
    pub async fn watch_machines(&self) -> Result<(), ControllerError> {
        info!("Starting Machine watcher");

        let mut stream = Box::pin(watcher(self.machine_api.clone(), watcher::Config::default()));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(machine) => {
                    let name = machine.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("Machine applied: {}", name);
                    self.reconcile_machine_logged(&machine).await;
                }
                watcher::Event::InitApply(machine) => {
                    let name = machine.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("Machine init apply: {}", name);
                    self.reconcile_machine_logged(&machine).await;
                }
                watcher::Event::Delete(machine) => {
                    let name = machine.metadata.name.as_deref().unwrap_or("<unknown>");
                    // claims are garbage-collected through their owner references
                    info!("Machine deleted: {}", name);
                }
                watcher::Event::Init => {
                    info!("Machine watcher initialized");
                }
                watcher::Event::InitDone => {
                    info!("Machine watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Starts watching LoadBalancer resources.
    pub async fn watch_load_balancers(&self) -> Result<(), ControllerError> {
        info!("Starting LoadBalancer watcher");

        let mut stream = Box::pin(watcher(
            self.load_balancer_api.clone(),
            watcher::Config::default(),
        ));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(lb) => {
                    let name = lb.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("LoadBalancer applied: {}", name);
                    self.reconcile_load_balancer_logged(&lb).await;
                }
                watcher::Event::InitApply(lb) => {
                    let name = lb.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("LoadBalancer init apply: {}", name);
                    self.reconcile_load_balancer_logged(&lb).await;
                }
                watcher::Event::Delete(lb) => {
                    let name = lb.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("LoadBalancer deleted: {}", name);
                }
                watcher::Event::Init => {
                    info!("LoadBalancer watcher initialized");
                }
                watcher::Event::InitDone => {
                    info!("LoadBalancer watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Starts watching IPPool resources.
    ///
    /// A pool appearing or changing may unblock objects that ended
    /// their last pass waiting for one.
    pub async fn watch_pools(&self) -> Result<(), ControllerError> {
        info!("Starting IPPool watcher");

        let mut stream = Box::pin(watcher(self.ip_pool_api.clone(), watcher::Config::default()));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(pool) => {
                    let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("IPPool applied: {}", name);
                    self.reconcile_all().await;
                }
                watcher::Event::Delete(pool) => {
                    let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("IPPool deleted: {}", name);
                }
                watcher::Event::InitApply(pool) => {
                    let name = pool.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("IPPool init apply: {}", name);
                }
                watcher::Event::Init => {
                    debug!("IPPool watcher initialized");
                }
                watcher::Event::InitDone => {
                    debug!("IPPool watcher initialization complete");
                    // one sweep over the initial pool inventory
                    self.reconcile_all().await;
                }
            }
        }

        Ok(())
    }

    /// Starts watching IPAddress resources.
    ///
    /// A fulfilled address unblocks the object whose claim produced it.
    pub async fn watch_addresses(&self) -> Result<(), ControllerError> {
        info!("Starting IPAddress watcher");

        let mut stream = Box::pin(watcher(
            self.ip_address_api.clone(),
            watcher::Config::default(),
        ));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?
        {
            match event {
                watcher::Event::Apply(address) => {
                    let name = address.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("IPAddress applied: {}", name);
                    self.reconcile_all().await;
                }
                watcher::Event::Delete(address) => {
                    let name = address.metadata.name.as_deref().unwrap_or("<unknown>");
                    info!("IPAddress deleted: {}", name);
                }
                watcher::Event::InitApply(address) => {
                    let name = address.metadata.name.as_deref().unwrap_or("<unknown>");
                    debug!("IPAddress init apply: {}", name);
                }
                watcher::Event::Init => {
                    debug!("IPAddress watcher initialized");
                }
                watcher::Event::InitDone => {
                    debug!("IPAddress watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Reconciles every Machine and LoadBalancer in the namespace.
    async fn reconcile_all(&self) {
        match self.machine_api.list(&ListParams::default()).await {
            Ok(machines) => {
                for machine in machines {
                    self.reconcile_machine_logged(&machine).await;
                }
            }
            Err(e) => warn!("Failed to list Machines: {}", e),
        }

        match self.load_balancer_api.list(&ListParams::default()).await {
            Ok(lbs) => {
                for lb in lbs {
                    self.reconcile_load_balancer_logged(&lb).await;
                }
            }
            Err(e) => warn!("Failed to list LoadBalancers: {}", e),
        }
    }

    async fn reconcile_machine_logged(&self, machine: &Machine) {
        let name = machine.metadata.name.as_deref().unwrap_or("<unknown>");
        match self.reconciler.reconcile_machine(machine).await {
            Ok(result) => {
                if let Some(delay) = result.requeue_after {
                    schedule_machine_requeue(
                        self.reconciler.clone(),
                        self.machine_api.clone(),
                        self.requeues.clone(),
                        name.to_string(),
                        delay,
                    );
                }
            }
            Err(e) => error!("Failed to reconcile Machine {}: {}", name, e),
        }
    }

    async fn reconcile_load_balancer_logged(&self, lb: &LoadBalancer) {
        let name = lb.metadata.name.as_deref().unwrap_or("<unknown>");
        match self.reconciler.reconcile_load_balancer(lb).await {
            Ok(result) => {
                if let Some(delay) = result.requeue_after {
                    schedule_load_balancer_requeue(
                        self.reconciler.clone(),
                        self.load_balancer_api.clone(),
                        self.requeues.clone(),
                        name.to_string(),
                        delay,
                    );
                }
            }
            Err(e) => error!("Failed to reconcile LoadBalancer {}: {}", name, e),
        }
    }
}

/// Honors a requeue hint for a Machine: sleep, re-fetch, reconcile
/// again, and keep going while hints keep coming. A Machine with a
/// poller already running gets no second one.
fn schedule_machine_requeue(
    reconciler: Arc<Reconciler>,
    api: Api<Machine>,
    requeues: Arc<RequeueTracker>,
    name: String,
    delay: Duration,
) {
    let key = format!("machine/{name}");
    if !requeues.begin(&key) {
        debug!("requeue already scheduled for Machine {}", name);
        return;
    }
    tokio::spawn(async move {
        let mut delay = delay;
        loop {
            tokio::time::sleep(delay).await;
            let machine = match api.get_opt(&name).await {
                Ok(Some(machine)) => machine,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to re-fetch Machine {} for requeue: {}", name, e);
                    break;
                }
            };
            match reconciler.reconcile_machine(&machine).await {
                Ok(result) => match result.requeue_after {
                    Some(next) => delay = next,
                    None => break,
                },
                Err(e) => {
                    error!("Failed to reconcile Machine {}: {}", name, e);
                    break;
                }
            }
        }
        requeues.finish(&key);
    });
}

/// Honors a requeue hint for a LoadBalancer, one poller per object.
fn schedule_load_balancer_requeue(
    reconciler: Arc<Reconciler>,
    api: Api<LoadBalancer>,
    requeues: Arc<RequeueTracker>,
    name: String,
    delay: Duration,
) {
    let key = format!("loadbalancer/{name}");
    if !requeues.begin(&key) {
        debug!("requeue already scheduled for LoadBalancer {}", name);
        return;
    }
    tokio::spawn(async move {
        let mut delay = delay;
        loop {
            tokio::time::sleep(delay).await;
            let lb = match api.get_opt(&name).await {
                Ok(Some(lb)) => lb,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to re-fetch LoadBalancer {} for requeue: {}", name, e);
                    break;
                }
            };
            match reconciler.reconcile_load_balancer(&lb).await {
                Ok(result) => match result.requeue_after {
                    Some(next) => delay = next,
                    None => break,
                },
                Err(e) => {
                    error!("Failed to reconcile LoadBalancer {}: {}", name, e);
                    break;
                }
            }
        }
        requeues.finish(&key);
    });
}

#[cfg(test)]
mod tests {
    use super::RequeueTracker;

    #[test]
    fn tracker_admits_one_poller_per_key() {
        let tracker = RequeueTracker::default();
        assert!(tracker.begin("machine/machine-a"));
        // a second event for the same object is covered by the first poller
        assert!(!tracker.begin("machine/machine-a"));
        // kinds are namespaced separately
        assert!(tracker.begin("loadbalancer/machine-a"));

        tracker.finish("machine/machine-a");
        assert!(tracker.begin("machine/machine-a"));
    }
}
