//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the
//! reconciler to the resource watchers and runs them to completion.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{RequeueTracker, Watcher};
use crds::{IPAddress, IPPool, LoadBalancer, Machine};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for static IP allocation.
pub struct Controller {
    machine_watcher: JoinHandle<Result<(), ControllerError>>,
    load_balancer_watcher: JoinHandle<Result<(), ControllerError>>,
    ip_pool_watcher: JoinHandle<Result<(), ControllerError>>,
    ip_address_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        namespace: Option<String>,
        ipam_provider: String,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Static IP Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        // Create API clients
        let ns = namespace.as_deref().unwrap_or("default");
        let machine_api: Api<Machine> = Api::namespaced(kube_client.clone(), ns);
        let load_balancer_api: Api<LoadBalancer> = Api::namespaced(kube_client.clone(), ns);
        let ip_pool_api: Api<IPPool> = Api::namespaced(kube_client.clone(), ns);
        let ip_address_api: Api<IPAddress> = Api::namespaced(kube_client.clone(), ns);

        // Create reconciler - use Arc to share it across watchers
        let reconciler = Arc::new(Reconciler::new(kube_client, ns, ipam_provider));

        // One tracker across all watchers, so requeue pollers dedupe globally
        let requeues = Arc::new(RequeueTracker::default());

        let new_watcher = || {
            Watcher::new(
                reconciler.clone(),
                machine_api.clone(),
                load_balancer_api.clone(),
                ip_pool_api.clone(),
                ip_address_api.clone(),
                requeues.clone(),
            )
        };

        let machine_watcher_instance = new_watcher();
        let load_balancer_watcher_instance = new_watcher();
        let ip_pool_watcher_instance = new_watcher();
        let ip_address_watcher_instance = new_watcher();

        // Start watchers in background tasks
        let machine_watcher =
            tokio::spawn(async move { machine_watcher_instance.watch_machines().await });
        let load_balancer_watcher = tokio::spawn(async move {
            load_balancer_watcher_instance.watch_load_balancers().await
        });
        let ip_pool_watcher =
            tokio::spawn(async move { ip_pool_watcher_instance.watch_pools().await });
        let ip_address_watcher =
            tokio::spawn(async move { ip_address_watcher_instance.watch_addresses().await });

        Ok(Self {
            machine_watcher,
            load_balancer_watcher,
            ip_pool_watcher,
            ip_address_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Static IP Controller running");

        // Wait for any watcher to exit (they should run forever)
        tokio::select! {
            result = &mut self.machine_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Machine watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Machine watcher error: {}", e)))?;
            }
            result = &mut self.load_balancer_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("LoadBalancer watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("LoadBalancer watcher error: {}", e)))?;
            }
            result = &mut self.ip_pool_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("IPPool watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("IPPool watcher error: {}", e)))?;
            }
            result = &mut self.ip_address_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("IPAddress watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("IPAddress watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}
