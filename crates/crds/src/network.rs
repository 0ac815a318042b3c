//! Network configuration types
//!
//! Shared by the `Machine` and `LoadBalancer` specs. A `NetworkDevice`
//! describes one virtual NIC; devices in `Static` mode with no address
//! yet are the ones the controller allocates for.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired network configuration of a provisioned virtual machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Network interface descriptors, processed in declaration order
    #[serde(default)]
    pub devices: Vec<NetworkDevice>,
}

/// One virtual network interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDevice {
    /// Name of the virtual network the device attaches to
    pub network_name: String,

    /// Address allocation mode
    #[serde(default)]
    pub allocation: AllocationMode,

    /// Assigned addresses in CIDR notation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addrs: Vec<String>,

    /// IPv4 gateway (required when DHCP4 is disabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway4: Option<String>,

    /// IPv6 gateway (required when DHCP6 is disabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway6: Option<String>,

    /// DNS nameservers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,

    /// DNS search domains
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_domains: Vec<String>,
}

/// How a device gets its address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum AllocationMode {
    /// Addresses come from DHCP; the device is never modified
    #[default]
    #[serde(rename = "DHCP")]
    Dhcp,

    /// One address is allocated from a matching `IPPool`
    Static,
}
