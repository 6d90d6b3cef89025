//! # In-Memory Store
//!
//! `ResourceStore` kept entirely in process memory.
//!
//! Mirrors the API server semantics the reconciler depends on:
//! - every write to a request bumps its `resourceVersion`
//! - status writes carrying a stale `resourceVersion` fail with a conflict
//! - creating an existing Secret fails with `AlreadyExists`
//!
//! This is ephemeral - data does not persist across restarts.
//! Thread-safe using Arc<RwLock> for concurrent access.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{RequestId, ResourceStore, StoreError};
use crate::controller::generator::SecretMaterial;
use crate::crd::{CustomSecret, CustomSecretStatus};

#[derive(Debug, Default)]
struct State {
    requests: HashMap<RequestId, CustomSecret>,
    /// Secrets keyed by (namespace, secret name)
    containers: HashMap<RequestId, SecretMaterial>,
    next_resource_version: u64,
    /// Requests whose next status write is rejected as a conflict
    injected_conflicts: HashSet<RequestId>,
    writes: usize,
}

impl State {
    fn bump_resource_version(&mut self) -> String {
        self.next_resource_version += 1;
        self.next_resource_version.to_string()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

fn id_of(resource: &CustomSecret) -> RequestId {
    RequestId::new(
        resource.metadata.namespace.clone().unwrap_or_else(|| "default".to_string()),
        resource.metadata.name.clone().unwrap_or_default(),
    )
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a request, assigning it a fresh resourceVersion
    pub async fn put_request(&self, mut request: CustomSecret) -> RequestId {
        let id = id_of(&request);
        let mut state = self.state.write().await;
        request.metadata.resource_version = Some(state.bump_resource_version());
        state.requests.insert(id.clone(), request);
        id
    }

    pub async fn remove_request(&self, id: &RequestId) -> Option<CustomSecret> {
        self.state.write().await.requests.remove(id)
    }

    pub async fn request(&self, id: &RequestId) -> Option<CustomSecret> {
        self.state.read().await.requests.get(id).cloned()
    }

    pub async fn container(&self, namespace: &str, name: &str) -> Option<SecretMaterial> {
        self.state
            .read()
            .await
            .containers
            .get(&RequestId::new(namespace, name))
            .cloned()
    }

    pub async fn remove_container(&self, namespace: &str, name: &str) -> Option<SecretMaterial> {
        self.state
            .write()
            .await
            .containers
            .remove(&RequestId::new(namespace, name))
    }

    pub async fn container_count(&self) -> usize {
        self.state.read().await.containers.len()
    }

    /// Number of successful mutating calls (secret writes and status writes)
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// Make the next status write for `id` fail as if another writer got there first
    pub async fn inject_status_conflict(&self, id: &RequestId) {
        self.state.write().await.injected_conflicts.insert(id.clone());
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_request(&self, id: &RequestId) -> Result<Option<CustomSecret>, StoreError> {
        Ok(self.request(id).await)
    }

    async fn container_exists(&self, owner: &CustomSecret, name: &str) -> Result<bool, StoreError> {
        let key = RequestId::new(id_of(owner).namespace, name);
        Ok(self.state.read().await.containers.contains_key(&key))
    }

    async fn create_container(
        &self,
        owner: &CustomSecret,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), StoreError> {
        let key = RequestId::new(id_of(owner).namespace, name);
        let mut state = self.state.write().await;
        if state.containers.contains_key(&key) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        state.containers.insert(key, material.clone());
        state.writes += 1;
        Ok(())
    }

    async fn replace_container(
        &self,
        owner: &CustomSecret,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), StoreError> {
        let key = RequestId::new(id_of(owner).namespace, name);
        let mut state = self.state.write().await;
        state.containers.insert(key, material.clone());
        state.writes += 1;
        Ok(())
    }

    async fn update_status(
        &self,
        request: &CustomSecret,
        status: &CustomSecretStatus,
    ) -> Result<(), StoreError> {
        let id = id_of(request);
        let mut state = self.state.write().await;

        if state.injected_conflicts.remove(&id) {
            return Err(StoreError::Conflict(id));
        }

        let stored_version = state
            .requests
            .get(&id)
            .and_then(|stored| stored.metadata.resource_version.clone());
        match stored_version {
            None => return Err(StoreError::Conflict(id)),
            Some(version) if Some(&version) != request.metadata.resource_version.as_ref() => {
                return Err(StoreError::Conflict(id));
            }
            Some(_) => {}
        }

        let resource_version = state.bump_resource_version();
        if let Some(stored) = state.requests.get_mut(&id) {
            stored.status = Some(status.clone());
            stored.metadata.resource_version = Some(resource_version);
        }
        state.writes += 1;
        Ok(())
    }
}
