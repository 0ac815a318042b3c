//! Object references between CRDs
//!
//! Minimal name/namespace references, in the style of Kubernetes
//! `LocalObjectReference`. Cross-group references (IPAM resources
//! pointing at provisioning resources and vice versa) all use this type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to another object by name, optionally in another namespace.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Name of the referenced object
    pub name: String,

    /// Namespace of the referenced object (defaults to the referrer's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Create a same-namespace reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}
