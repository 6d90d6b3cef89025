//! # Custom Resource Definitions
//!
//! CRD types for the Secret Generator Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `CustomSecret` specification (desired state)
//! - `status.rs` - Status written back by the reconciler (observed state)

mod spec;
mod status;

pub use spec::{CustomSecret, CustomSecretSpec, SecretKind};
pub use status::CustomSecretStatus;
