//! # Watch Loop
//!
//! Runs the kube-runtime `Controller` over `CustomSecret` resources.
//!
//! Generated Secrets are watched as owned objects, so deleting one by hand
//! triggers a reconciliation of its owner. Events caused by the controller's
//! own writes are filtered out by `Reconciler::reconcile_when_due`. The
//! controller restarts if its stream ends and exits on SIGTERM/SIGINT.

use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error_policy::{handle_reconciliation_error, publish_failure_event, request_id};
use super::ControllerContext;
use crate::constants::{LABEL_MANAGED_BY, LABEL_MANAGED_BY_VALUE};
use crate::controller::reconciler::ReconcilerError;
use crate::controller::server::ServerState;
use crate::crd::CustomSecret;
use crate::store::RequestId;

/// Run the controller until shutdown is requested
///
/// # Errors
///
/// Currently never fails; the signature leaves room for fatal watch errors.
pub async fn run_watch_loop(
    requests: Api<CustomSecret>,
    secrets: Api<Secret>,
    ctx: Arc<ControllerContext>,
    server_state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let shutdown = ctx.shutdown.clone();
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        shutdown.cancel();
    });

    let owned_secrets = watcher::Config::default()
        .labels(&format!("{LABEL_MANAGED_BY}={LABEL_MANAGED_BY_VALUE}"));
    let controller_config =
        controller::Config::default().concurrency(ctx.config.max_concurrent_reconciliations);

    server_state.set_ready(true);
    loop {
        if ctx.shutdown.is_cancelled() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        info!(
            write_mode = %ctx.reconciler.write_mode(),
            concurrency = ctx.config.max_concurrent_reconciliations,
            "Starting controller watch loop..."
        );
        Controller::new(requests.clone(), watcher::Config::default().any_semantic())
            .owns(secrets.clone(), owned_secrets.clone())
            .with_config(controller_config.clone())
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, Arc::clone(&ctx))
            .for_each(|result| {
                let ctx = Arc::clone(&ctx);
                async move {
                    match result {
                        Ok((object, action)) => {
                            debug!(resource = %object, action = ?action, "watch.event.reconciled");
                        }
                        Err(e) => log_controller_error(&ctx, &e),
                    }
                }
            })
            .await;

        // The controller stops on the same signal that cancels the token, so
        // the token may trip a moment after the stream ends
        let delay = ctx.config.watch_restart_delay_after_end_duration();
        tokio::select! {
            () = ctx.shutdown.cancelled() => {
                info!("Shutdown requested, exiting watch loop");
                break;
            }
            () = tokio::time::sleep(delay) => {
                warn!(
                    "Controller watch stream ended, restarted after {} seconds",
                    delay.as_secs()
                );
            }
        }
    }

    server_state.set_ready(false);
    info!("Controller stopped gracefully");
    Ok(())
}

/// `reconcile` callback for the kube-runtime controller
async fn reconcile(
    obj: Arc<CustomSecret>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcilerError> {
    let id = request_id(&obj);
    match ctx.reconciler.reconcile_when_due(&id, &ctx.shutdown).await {
        Ok(outcome) => Ok(ctx.retry.on_outcome(&id, outcome)),
        Err(e) => {
            publish_failure_event(&ctx, &obj, &e).await;
            Err(e)
        }
    }
}

fn log_controller_error(
    ctx: &ControllerContext,
    error: &controller::Error<ReconcilerError, watcher::Error>,
) {
    match error {
        // Already logged and scheduled by the error policy
        controller::Error::ReconcilerFailed(e, object) => {
            debug!(resource = %object, reason = e.reason(), "watch.event.reconciliation_failed");
        }
        // Deleted; its backoff entry would otherwise never be removed
        controller::Error::ObjectNotFound(object) => {
            debug!(resource = %object, "Object no longer in cache, skipping");
            ctx.retry.forget(&RequestId::new(
                object.namespace.clone().unwrap_or_else(|| "default".to_string()),
                object.name.clone(),
            ));
        }
        controller::Error::QueueError(e) => {
            warn!(error = %e, "watch.error.stream");
        }
        other => {
            error!("Controller stream error: {}", other);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
