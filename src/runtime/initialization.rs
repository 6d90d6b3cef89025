//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};
use kube_runtime::events::{Recorder, Reporter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{ControllerContext, RetryPolicy};
use crate::config::ControllerConfig;
use crate::constants::CONTROLLER_NAME;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, wait_for_server, ServerState};
use crate::crd::CustomSecret;
use crate::observability;
use crate::store::KubeStore;

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    /// API for `CustomSecret` resources, namespaced or cluster-wide
    pub requests: Api<CustomSecret>,
    /// API for the generated Secrets, same scope as `requests`
    pub secrets: Api<Secret>,
    pub context: Arc<ControllerContext>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// # Errors
///
/// Fails if logging or metrics cannot be set up, the HTTP server does not
/// come up in time, or no Kubernetes client configuration is available.
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything touches TLS
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    let config = ControllerConfig::from_env();
    observability::logging::init_tracing(&config.log_level, &config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    info!("Starting Secret Generator Controller v{}", env!("CARGO_PKG_VERSION"));
    info!(
        write_mode = %config.write_mode,
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        "Loaded configuration"
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    if !wait_for_server(
        &server_state,
        config.server_startup_timeout(),
        config.server_poll_interval(),
    )
    .await
    {
        anyhow::bail!(
            "HTTP server did not start within {}s",
            config.server_startup_timeout_secs
        );
    }

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let (requests, secrets): (Api<CustomSecret>, Api<Secret>) = match &config.watch_namespace {
        Some(namespace) => (
            Api::namespaced(client.clone(), namespace),
            Api::namespaced(client.clone(), namespace),
        ),
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    let reporter = Reporter {
        controller: CONTROLLER_NAME.to_string(),
        instance: std::env::var("POD_NAME").ok(),
    };
    let context = Arc::new(ControllerContext {
        reconciler: Reconciler::new(KubeStore::new(client.clone()), config.write_mode),
        recorder: Recorder::new(client.clone(), reporter),
        retry: RetryPolicy::new(
            config.reconciliation_error_requeue_duration(),
            config.reconciliation_error_requeue_max_duration(),
        ),
        config,
        shutdown: CancellationToken::new(),
    });

    info!("Controller initialized, starting watch loop...");
    Ok(InitializationResult {
        client,
        requests,
        secrets,
        context,
        server_state,
    })
}
