//! # Runtime
//!
//! Everything between process start and the reconciler:
//!
//! - `initialization`: rustls, logging, metrics, HTTP server and client setup
//! - `watch_loop`: the kube-runtime `Controller` driving reconciliations
//! - `error_policy`: retry scheduling for failed reconciliations

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use kube_runtime::events::Recorder;
use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::store::KubeStore;

pub use error_policy::RetryPolicy;
pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;

/// Shared state handed to every reconciliation
pub struct ControllerContext {
    pub reconciler: Reconciler<KubeStore>,
    pub recorder: Recorder,
    pub retry: RetryPolicy,
    pub config: ControllerConfig,
    /// Cancelled on shutdown, aborts in-flight store calls
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("write_mode", &self.reconciler.write_mode())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
