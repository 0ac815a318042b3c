//! Static IP Controller CRD Definitions
//!
//! Kubernetes Custom Resource Definitions shared by the static IP
//! controllers: the provisioning-side resources (`Machine`,
//! `MachineTemplate`, `ControlPlane`, `LoadBalancer`) and the
//! allocation-side IPAM resources (`IPPool`, `IPClaim`, `IPAddress`).

pub mod control_plane;
pub mod ip_address;
pub mod ip_claim;
pub mod ip_pool;
pub mod load_balancer;
pub mod machine;
pub mod machine_template;
pub mod network;
pub mod references;

pub use control_plane::*;
pub use ip_address::*;
pub use ip_claim::*;
pub use ip_pool::*;
pub use load_balancer::*;
pub use machine::*;
pub use machine_template::*;
pub use network::*;
pub use references::*;
