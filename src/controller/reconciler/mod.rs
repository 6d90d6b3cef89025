//! # Reconciler
//!
//! Turns a `CustomSecret` into a generated Kubernetes Secret and keeps it
//! rotated.
//!
//! - `duration`: Go-style duration strings used by `rotationPeriod`
//! - `reconcile`: the reconciliation pass
//! - `status`: status construction
//! - `trigger`: whether a watch event warrants a pass
//! - `types`: outcomes, errors and write modes

pub mod duration;
pub mod reconcile;
pub mod status;
pub mod trigger;
pub mod types;

pub use reconcile::Reconciler;
pub use trigger::{Decision, Trigger};
pub use types::{ReconcileOutcome, ReconcilerError, WriteMode};
