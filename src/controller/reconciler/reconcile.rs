//! # Reconciliation Logic
//!
//! One pass over a `CustomSecret`:
//!
//! 1. Fetch the request (gone means nothing to do)
//! 2. Generate secret material for its `secretType`
//! 3. Write the Secret `<name>-secret`
//! 4. Record `lastUpdated`, `secretName` and `observedGeneration` in the status
//! 5. Schedule the next rotation from `rotationPeriod`
//!
//! [`Reconciler::reconcile`] always runs the pass. The watch loop goes through
//! [`Reconciler::reconcile_when_due`], which first checks the trigger so that
//! events caused by the pass itself do not start another one.
//!
//! Each store call is raced against the cancellation token so shutdown never
//! waits on a slow API server. A cancelled pass may still have written the
//! Secret; the next pass rewrites it.

use chrono::Utc;
use std::future::Future;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::duration::{parse_go_duration, DurationError};
use super::status::build_status;
use super::trigger::{decide, Decision};
use super::types::{ReconcileOutcome, ReconcilerError, WriteMode};
use crate::controller::generator::generate;
use crate::crd::CustomSecret;
use crate::observability::metrics;
use crate::store::{RequestId, ResourceStore, StoreError};

/// Drives reconciliation passes against a [`ResourceStore`]
#[derive(Debug, Clone)]
pub struct Reconciler<S> {
    store: S,
    write_mode: WriteMode,
}

impl<S: ResourceStore> Reconciler<S> {
    pub fn new(store: S, write_mode: WriteMode) -> Self {
        Self { store, write_mode }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Reconcile the request identified by `id`
    ///
    /// # Errors
    ///
    /// Returns the first failure of the pass. Nothing is retried here, retry
    /// policy belongs to the caller.
    pub async fn reconcile(
        &self,
        id: &RequestId,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        self.measured(id, async {
            let Some(request) = self.fetch(id, cancel).await? else {
                return Ok(ReconcileOutcome::Done);
            };
            self.run_pass(id, &request, cancel).await
        })
        .await
    }

    /// Reconcile `id` only if something warrants a pass
    ///
    /// Skipped events return the outcome that keeps any pending rotation
    /// scheduled.
    ///
    /// # Errors
    ///
    /// Same as [`Reconciler::reconcile`]; checking the Secret can also fail
    /// with a store error.
    pub async fn reconcile_when_due(
        &self,
        id: &RequestId,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        self.measured(id, async {
            let Some(request) = self.fetch(id, cancel).await? else {
                return Ok(ReconcileOutcome::Done);
            };
            let secret_present = guarded(
                cancel,
                id,
                self.store.container_exists(&request, &id.secret_name()),
            )
            .await?;

            match decide(&request, secret_present, Utc::now()) {
                Decision::Skip(outcome) => {
                    debug!(outcome = ?outcome, "Nothing changed since the last pass, skipping");
                    Ok(outcome)
                }
                Decision::Run(trigger) => {
                    info!(trigger = %trigger, "Reconciliation triggered");
                    self.run_pass(id, &request, cancel).await
                }
            }
        })
        .await
    }

    async fn measured<F>(&self, id: &RequestId, pass: F) -> Result<ReconcileOutcome, ReconcilerError>
    where
        F: Future<Output = Result<ReconcileOutcome, ReconcilerError>>,
    {
        let start = Instant::now();
        metrics::increment_reconciliations();

        let span = info_span!(
            "controller.reconcile",
            resource.namespace = %id.namespace,
            resource.name = %id.name,
            write_mode = %self.write_mode,
        );
        let result = pass.instrument(span).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::increment_reconciliation_errors(e.reason());
        }
        result
    }

    async fn fetch(
        &self,
        id: &RequestId,
        cancel: &CancellationToken,
    ) -> Result<Option<CustomSecret>, ReconcilerError> {
        let request = guarded(cancel, id, self.store.get_request(id)).await?;
        if request.is_none() {
            debug!("CustomSecret no longer exists, nothing to reconcile");
        }
        Ok(request)
    }

    async fn run_pass(
        &self,
        id: &RequestId,
        request: &CustomSecret,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let spec = &request.spec;

        let material = generate(
            &spec.secret_type,
            spec.username.as_deref(),
            spec.password_length,
        )
        .inspect_err(|e| warn!(secret_type = %spec.secret_type, "Cannot generate secret: {e}"))?;

        let secret_name = id.secret_name();
        match self.write_mode {
            WriteMode::CreateOnly => {
                guarded(
                    cancel,
                    id,
                    self.store.create_container(request, &secret_name, &material),
                )
                .await?;
            }
            WriteMode::Upsert => {
                guarded(
                    cancel,
                    id,
                    self.store.replace_container(request, &secret_name, &material),
                )
                .await?;
            }
        }
        metrics::increment_secrets_generated(&spec.secret_type);
        info!(secret = %secret_name, secret_type = %spec.secret_type, "Wrote generated secret");

        let status = build_status(
            request.status.as_ref(),
            &secret_name,
            request.metadata.generation,
            Utc::now(),
        );
        guarded(cancel, id, self.store.update_status(request, &status)).await?;
        debug!(last_updated = %status.last_updated, "Updated status");

        let Some(period) = spec.rotation_period() else {
            return Ok(ReconcileOutcome::Done);
        };
        let every = match parse_go_duration(period) {
            Ok(every) => every,
            Err(DurationError::Negative(_)) => {
                debug!(rotation_period = %period, "rotationPeriod is negative, not scheduling a rotation");
                return Ok(ReconcileOutcome::Done);
            }
            Err(source) => {
                return Err(ReconcilerError::InvalidDuration {
                    value: period.to_string(),
                    source,
                });
            }
        };
        if every.is_zero() {
            debug!("rotationPeriod is zero, not scheduling a rotation");
            return Ok(ReconcileOutcome::Done);
        }

        metrics::increment_requeues_total("rotation");
        info!(rotation_period = %period, "Next rotation scheduled");
        Ok(ReconcileOutcome::RequeueAfter(every))
    }
}

/// Run a store call unless `cancel` fires first
async fn guarded<T, F>(
    cancel: &CancellationToken,
    id: &RequestId,
    operation: F,
) -> Result<T, ReconcilerError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    if cancel.is_cancelled() {
        return Err(ReconcilerError::Cancelled(id.clone()));
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ReconcilerError::Cancelled(id.clone())),
        result = operation => result.map_err(ReconcilerError::from),
    }
}
