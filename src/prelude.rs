//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use secret_generator_controller::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Reconciler types
pub use crate::controller::reconciler::{
    ReconcileOutcome, Reconciler, ReconcilerError, WriteMode,
};

// Credential generation
pub use crate::controller::generator::{generate, GeneratorError, SecretMaterial};

// Resource stores
pub use crate::store::{KubeStore, MemoryStore, RequestId, ResourceStore, StoreError};

pub use crate::config::ControllerConfig;
