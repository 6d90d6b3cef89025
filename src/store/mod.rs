//! # Resource Store
//!
//! Boundary between the reconciler and wherever `CustomSecret` objects and
//! their generated Secrets live.
//!
//! - `cluster`: the Kubernetes API server
//! - `memory`: in-process store used by tests

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::controller::generator::SecretMaterial;
use crate::crd::{CustomSecret, CustomSecretStatus};

pub mod cluster;
pub mod memory;

pub use self::cluster::KubeStore;
pub use self::memory::MemoryStore;

/// Identity of a `CustomSecret` (namespace + name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId {
    pub namespace: String,
    pub name: String,
}

impl RequestId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Name of the Secret generated for this request
    #[must_use]
    pub fn secret_name(&self) -> String {
        secret_name_for(&self.name)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Deterministic Secret name for a `CustomSecret` called `request_name`
#[must_use]
pub fn secret_name_for(request_name: &str) -> String {
    format!("{request_name}-secret")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("secret '{0}' already exists")]
    AlreadyExists(String),
    #[error("status update for '{0}' lost a race with a concurrent modification")]
    Conflict(RequestId),
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Operations the reconciler needs from the backing store
///
/// Every method is a potential suspension point. Implementations must not
/// retry on their own, errors go straight back to the reconciler.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a request, `None` if it no longer exists
    async fn get_request(&self, id: &RequestId) -> Result<Option<CustomSecret>, StoreError>;

    /// Whether the Secret `name` exists next to `owner`
    async fn container_exists(&self, owner: &CustomSecret, name: &str) -> Result<bool, StoreError>;

    /// Create the Secret `name` next to `owner`
    ///
    /// Fails with [`StoreError::AlreadyExists`] if a Secret of that name exists.
    async fn create_container(
        &self,
        owner: &CustomSecret,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), StoreError>;

    /// Create the Secret `name` or replace the data of an existing one
    async fn replace_container(
        &self,
        owner: &CustomSecret,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), StoreError>;

    /// Write `status` onto `request`
    ///
    /// Fails with [`StoreError::Conflict`] if the stored object changed since
    /// `request` was read.
    async fn update_status(
        &self,
        request: &CustomSecret,
        status: &CustomSecretStatus,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_name_is_request_name_with_suffix() {
        assert_eq!(secret_name_for("foo"), "foo-secret");
        assert_eq!(RequestId::new("default", "alice").secret_name(), "alice-secret");
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId::new("team-a", "db").to_string(), "team-a/db");
    }
}
