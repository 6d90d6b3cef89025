//! # Kubernetes Store
//!
//! `ResourceStore` backed by the Kubernetes API server.
//!
//! Generated Secrets carry a controller owner reference to their
//! `CustomSecret`, so deleting the request lets the cluster garbage collector
//! remove the material. The reconciler itself never deletes anything.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::Zeroize;

use super::{RequestId, ResourceStore, StoreError};
use crate::constants::{FIELD_MANAGER, LABEL_MANAGED_BY, LABEL_MANAGED_BY_VALUE};
use crate::controller::generator::SecretMaterial;
use crate::crd::{CustomSecret, CustomSecretStatus};

const SECRET_TYPE_OPAQUE: &str = "Opaque";

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn requests(&self, namespace: &str) -> Api<CustomSecret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Build the Secret object holding `material` for `owner`
#[must_use]
pub fn build_secret(owner: &CustomSecret, name: &str, material: &SecretMaterial) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: owner.namespace(),
            labels: Some(BTreeMap::from([(
                LABEL_MANAGED_BY.to_string(),
                LABEL_MANAGED_BY_VALUE.to_string(),
            )])),
            owner_references: owner.controller_owner_ref(&()).map(|owner_ref| vec![owner_ref]),
            ..ObjectMeta::default()
        },
        data: Some(material.to_secret_data()),
        type_: Some(SECRET_TYPE_OPAQUE.to_string()),
        ..Secret::default()
    }
}

/// Zero the `data` buffers of a Secret carrying generated material
///
/// Called on the request body and on the object the API server echoes back,
/// once the write has completed.
pub fn scrub_secret(secret: &mut Secret) {
    if let Some(data) = secret.data.as_mut() {
        for value in data.values_mut() {
            value.0.zeroize();
        }
    }
}

fn is_status_code(error: &kube::Error, code: u16) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == code)
}

fn namespace_of(resource: &CustomSecret) -> String {
    resource.namespace().unwrap_or_else(|| "default".to_string())
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_request(&self, id: &RequestId) -> Result<Option<CustomSecret>, StoreError> {
        Ok(self.requests(&id.namespace).get_opt(&id.name).await?)
    }

    async fn container_exists(&self, owner: &CustomSecret, name: &str) -> Result<bool, StoreError> {
        let metadata = self
            .secrets(&namespace_of(owner))
            .get_metadata_opt(name)
            .await?;
        Ok(metadata.is_some())
    }

    async fn create_container(
        &self,
        owner: &CustomSecret,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), StoreError> {
        let mut secret = build_secret(owner, name, material);
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        };

        let result = self.secrets(&namespace_of(owner)).create(&params, &secret).await;
        scrub_secret(&mut secret);
        match result {
            Ok(mut created) => {
                scrub_secret(&mut created);
                Ok(())
            }
            Err(e) if is_status_code(&e, 409) => Err(StoreError::AlreadyExists(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_container(
        &self,
        owner: &CustomSecret,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), StoreError> {
        let mut secret = build_secret(owner, name, material);
        let params = PatchParams::apply(FIELD_MANAGER).force();

        let result = self
            .secrets(&namespace_of(owner))
            .patch(name, &params, &Patch::Apply(&secret))
            .await;
        scrub_secret(&mut secret);
        let mut applied = result?;
        scrub_secret(&mut applied);
        debug!(secret.name = name, "Applied secret");
        Ok(())
    }

    async fn update_status(
        &self,
        request: &CustomSecret,
        status: &CustomSecretStatus,
    ) -> Result<(), StoreError> {
        let name = request.name_any();
        let namespace = namespace_of(request);

        // Carrying the resourceVersion we read turns the merge patch into an
        // optimistic-concurrency write: the API server answers 409 if it moved
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": request.resource_version(),
            },
            "status": status,
        });

        match self
            .requests(&namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_status_code(&e, 409) => {
                Err(StoreError::Conflict(RequestId::new(namespace, name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
