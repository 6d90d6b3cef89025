//! # Controller
//!
//! Core controller modules for the secret generator.
//!
//! - `backoff`: Fibonacci backoff for failed reconciliations
//! - `generator`: credential generation per secret type
//! - `reconciler`: reconciliation of `CustomSecret` resources
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod generator;
pub mod reconciler;
pub mod server;
