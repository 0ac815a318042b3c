//! Controller-specific error types.

use ipam::IpamError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Static IP Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// IPAM provider error
    #[error("IPAM error: {0}")]
    Ipam(#[from] IpamError),

    /// Control-plane template lookup found zero or multiple candidates
    #[error("template resolution failed: {0}")]
    TemplateResolution(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
