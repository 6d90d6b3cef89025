//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Name the controller reports itself as (events, logs)
pub const CONTROLLER_NAME: &str = "secret-generator-controller";

/// Field manager used for every write to the API server
pub const FIELD_MANAGER: &str = "secret-generator-controller";

/// Label marking Secrets created by this controller
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

pub const LABEL_MANAGED_BY_VALUE: &str = "secret-generator-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default first requeue interval after a failed reconciliation (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default cap for the requeue interval after repeated failures (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_MAX_SECS: u64 = 600;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default number of reconciliations allowed to run at once
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;
