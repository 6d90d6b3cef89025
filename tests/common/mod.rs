//! Common test utilities for reconciler integration tests
//!
//! Builds `CustomSecret` objects and wires a reconciler to an in-memory store.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use secret_generator_controller::controller::reconciler::{Reconciler, WriteMode};
use secret_generator_controller::crd::{CustomSecret, CustomSecretSpec};
use secret_generator_controller::store::MemoryStore;

pub const NAMESPACE: &str = "default";

/// Builder for `CustomSecret` test fixtures
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    name: String,
    spec: CustomSecretSpec,
    generation: Option<i64>,
}

impl RequestBuilder {
    pub fn new(name: &str, secret_type: &str) -> Self {
        Self {
            name: name.to_string(),
            spec: CustomSecretSpec {
                secret_type: secret_type.to_string(),
                username: None,
                password_length: None,
                rotation_period: None,
            },
            generation: None,
        }
    }

    pub fn basic_auth(name: &str, password_length: i64) -> Self {
        Self::new(name, "basic-auth").password_length(password_length)
    }

    pub fn jwt(name: &str) -> Self {
        Self::new(name, "jwt")
    }

    pub fn username(mut self, username: &str) -> Self {
        self.spec.username = Some(username.to_string());
        self
    }

    pub fn password_length(mut self, length: i64) -> Self {
        self.spec.password_length = Some(length);
        self
    }

    pub fn rotation_period(mut self, period: &str) -> Self {
        self.spec.rotation_period = Some(period.to_string());
        self
    }

    pub fn generation(mut self, generation: i64) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn build(self) -> CustomSecret {
        let mut request = CustomSecret::new(&self.name, self.spec);
        request.metadata.namespace = Some(NAMESPACE.to_string());
        request.metadata.generation = self.generation;
        request
    }
}

/// Store plus a reconciler sharing it
pub fn setup(write_mode: WriteMode) -> (MemoryStore, Reconciler<MemoryStore>) {
    let store = MemoryStore::new();
    let reconciler = Reconciler::new(store.clone(), write_mode);
    (store, reconciler)
}
