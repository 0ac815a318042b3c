//! IPAM error types.

use thiserror::Error;

/// Errors from the IPAM provider layer.
#[derive(Debug, Error)]
pub enum IpamError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A fulfilled address failed structural validation
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),
}
