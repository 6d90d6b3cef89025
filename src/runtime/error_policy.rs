//! # Error Policy
//!
//! Decides when a failed reconciliation runs again. The reconciler never
//! retries on its own; this is the only place retries are scheduled.
//!
//! - errors that only an edit of the `CustomSecret` can fix wait for that edit
//! - cancellation (shutdown) schedules nothing
//! - everything else is retried with a per-resource Fibonacci backoff

use k8s_openapi::api::core::v1::ObjectReference;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::events::{Event, EventType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

use super::ControllerContext;
use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::{ReconcileOutcome, ReconcilerError};
use crate::crd::CustomSecret;
use crate::observability;
use crate::store::RequestId;

/// Per-resource retry bookkeeping
#[derive(Debug)]
pub struct RetryPolicy {
    min: Duration,
    max: Duration,
    states: Mutex<HashMap<RequestId, BackoffState>>,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Action to take after `error` failed the reconciliation of `id`
    pub fn on_error(&self, id: &RequestId, error: &ReconcilerError) -> Action {
        if matches!(error, ReconcilerError::Cancelled(_)) {
            return Action::await_change();
        }
        if error.requires_spec_change() {
            info!(
                resource = %id,
                reason = error.reason(),
                "Not retrying until the CustomSecret changes"
            );
            return Action::await_change();
        }

        let (delay, error_count) = match self.states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(id.clone())
                    .or_insert_with(|| BackoffState::new(self.min, self.max));
                (state.record_error(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                (self.min, 0)
            }
        };

        info!(
            resource = %id,
            error_count,
            "Retrying in {}s (trigger source: error-backoff)",
            delay.as_secs()
        );
        observability::metrics::increment_requeues_total("error-backoff");
        Action::requeue(delay)
    }

    /// Forget the failure history of `id` after a successful reconciliation
    pub fn on_success(&self, id: &RequestId) {
        self.forget(id);
    }

    /// Action to take after a successful reconciliation of `id`
    pub fn on_outcome(&self, id: &RequestId, outcome: ReconcileOutcome) -> Action {
        self.on_success(id);
        outcome.into_action()
    }

    /// Drop all state kept for `id`, e.g. once the resource has been deleted
    pub fn forget(&self, id: &RequestId) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(id);
        }
    }

    /// Number of resources with recorded failures
    pub fn tracked(&self) -> usize {
        self.states.lock().map_or(0, |states| states.len())
    }

    /// Consecutive failures recorded for `id`
    pub fn error_count(&self, id: &RequestId) -> u32 {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(id).map(|state| state.error_count))
            .unwrap_or(0)
    }
}

/// Identity of a watched `CustomSecret`
pub fn request_id(obj: &CustomSecret) -> RequestId {
    RequestId::new(
        obj.namespace().unwrap_or_else(|| "default".to_string()),
        obj.name_any(),
    )
}

/// `error_policy` callback for the kube-runtime controller
pub fn handle_reconciliation_error(
    obj: Arc<CustomSecret>,
    error: &ReconcilerError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let id = request_id(&obj);
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = id.name.as_str(),
        resource.namespace = id.namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    if !matches!(error, ReconcilerError::Cancelled(_)) {
        error!("Reconciliation error for {}: {}", id, error);
    }
    ctx.retry.on_error(&id, error)
}

/// Event reason shown by `kubectl describe`
#[must_use]
pub fn event_reason(error: &ReconcilerError) -> &'static str {
    match error {
        ReconcilerError::UnsupportedKind(_) => "UnsupportedSecretType",
        ReconcilerError::InvalidPasswordLength(_) => "InvalidPasswordLength",
        ReconcilerError::Generation(_) => "GenerationFailed",
        ReconcilerError::AlreadyExists(_) => "SecretAlreadyExists",
        ReconcilerError::Conflict(_) => "StatusConflict",
        ReconcilerError::InvalidDuration { .. } => "InvalidRotationPeriod",
        ReconcilerError::Cancelled(_) => "Cancelled",
        ReconcilerError::Store(_) => "StoreError",
    }
}

/// Publish a Warning event on `obj` describing `error`
///
/// Event delivery is best effort, failures are only logged.
pub async fn publish_failure_event(
    ctx: &ControllerContext,
    obj: &CustomSecret,
    error: &ReconcilerError,
) {
    if matches!(error, ReconcilerError::Cancelled(_)) {
        return;
    }
    let reference: ObjectReference = obj.object_ref(&());
    let event = Event {
        type_: EventType::Warning,
        reason: event_reason(error).to_string(),
        note: Some(error.to_string()),
        action: "Reconcile".to_string(),
        secondary: None,
    };
    if let Err(e) = ctx.recorder.publish(&event, &reference).await {
        warn!(
            resource.name = obj.name_any().as_str(),
            "Failed to publish event: {}", e
        );
    }
}
