//! Secret Generator Controller Library
//!
//! Generates credentials declared by `CustomSecret` resources, writes them to
//! Kubernetes Secrets and rotates them on a schedule.
//!
//! ## Quick Start
//!
//! ```rust
//! use secret_generator_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod store;
