//! Pure allocation helpers
//!
//! Device classification, deterministic claim naming, address
//! validation, and the device rewrite applied once an address is
//! fulfilled. No side effects anywhere in this module.

use crate::error::IpamError;
use crds::{AllocationMode, IPAddress, IPPool, NetworkDevice};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::net::IpAddr;

/// Label carrying the owning cluster's name.
pub const CLUSTER_NAME_KEY: &str = "cluster.x-k8s.io/cluster-name";

/// Label marking control-plane machines.
pub const CONTROL_PLANE_LABEL: &str = "cluster.x-k8s.io/control-plane";

/// Whether a device needs an address allocated.
///
/// DHCP devices and devices that already carry one or more addresses
/// are never touched.
pub fn needs_allocation(device: &NetworkDevice) -> bool {
    device.allocation == AllocationMode::Static && device.ip_addrs.is_empty()
}

/// Whether every device of an object is in DHCP mode.
pub fn is_allocation_dhcp(devices: &[NetworkDevice]) -> bool {
    devices.iter().all(|d| d.allocation == AllocationMode::Dhcp)
}

/// Deterministic claim name for one device of an object.
///
/// A re-run of reconciliation re-derives the same name, so the claim is
/// created at most once per `(object, device)` pair.
pub fn claim_name(object_name: &str, device_index: usize) -> String {
    format!("{object_name}-dev-{device_index}")
}

/// Validate a fulfilled address before applying it to a device.
///
/// Applying a malformed address to a live device is unsafe, so failures
/// here are errors for the whole pass, not skips.
pub fn validate_address(address: &IPAddress) -> Result<(), IpamError> {
    let spec = &address.spec;
    if spec.address.is_empty() {
        return Err(IpamError::InvalidAddress("address is empty".to_string()));
    }
    let parsed: IpAddr = spec
        .address
        .parse()
        .map_err(|_| IpamError::InvalidAddress(format!("cannot parse address {}", spec.address)))?;
    let max_prefix = match parsed {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    if spec.prefix < 0 || spec.prefix > max_prefix {
        return Err(IpamError::InvalidAddress(format!(
            "prefix length {} out of range for {}",
            spec.prefix, spec.address
        )));
    }
    Ok(())
}

/// Rewrite a device from a validated address/pool pair.
///
/// The address list becomes a single CIDR entry, gateway4 comes from
/// the address, nameservers and search domains from the pool. gateway6
/// is left unset: IPv6 dual-stack allocation is out of scope. The
/// allocation mode and every other field carry through unchanged.
pub fn apply_address(device: &NetworkDevice, address: &IPAddress, pool: &IPPool) -> NetworkDevice {
    let mut updated = device.clone();
    updated.ip_addrs = vec![format!("{}/{}", address.spec.address, address.spec.prefix)];
    updated.gateway4 = address.spec.gateway.clone();
    updated.nameservers = pool.spec.dns_servers.clone();
    updated.search_domains = pool.spec.search_domains.clone();
    updated
}

/// Owner reference for claims filed on behalf of a provisioning object.
pub fn owner_reference(api_version: &str, kind: &str, meta: &ObjectMeta) -> OwnerReference {
    OwnerReference {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        name: meta.name.clone().unwrap_or_default(),
        uid: meta.uid.clone().unwrap_or_default(),
        ..Default::default()
    }
}
