//! Static IP Controller
//!
//! Replaces DHCP-based addressing for provisioned virtual machines with
//! static addresses drawn from externally managed IP pools.
//!
//! This controller reconciles `Machine` and `LoadBalancer` resources:
//! every `Static`-mode network device without an address gets one
//! claimed from a matching `IPPool` and, once the claim is fulfilled,
//! written back to the device in a single atomic patch.

mod controller;
mod error;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::error::ControllerError;
use controller::Controller;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Static IP Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok();
    let ipam_provider = env::var("IPAM_PROVIDER").unwrap_or_else(|_| "metal3io".to_string());

    info!("Configuration:");
    info!("  IPAM provider: {}", ipam_provider);
    info!("  Namespace: {}", namespace.as_deref().unwrap_or("default"));

    // Initialize and run controller
    let controller = Controller::new(namespace, ipam_provider).await?;
    controller.run().await?;

    Ok(())
}
