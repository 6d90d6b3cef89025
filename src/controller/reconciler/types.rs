//! # Types
//!
//! Core types for the reconciler.

use kube_runtime::controller::Action;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use super::duration::DurationError;
use crate::controller::generator::GeneratorError;
use crate::store::{RequestId, StoreError};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("unsupported secret type '{0}' (expected 'basic-auth' or 'jwt')")]
    UnsupportedKind(String),
    #[error("passwordLength must not be negative, got {0}")]
    InvalidPasswordLength(i64),
    #[error("failed to generate secret material: {0}")]
    Generation(#[source] GeneratorError),
    #[error("secret '{0}' already exists")]
    AlreadyExists(String),
    #[error("status update for '{0}' conflicted with a concurrent modification")]
    Conflict(RequestId),
    #[error("invalid rotationPeriod '{value}': {source}")]
    InvalidDuration {
        value: String,
        #[source]
        source: DurationError,
    },
    #[error("reconciliation of '{0}' was cancelled")]
    Cancelled(RequestId),
    #[error("resource store error: {0}")]
    Store(#[source] StoreError),
}

impl From<GeneratorError> for ReconcilerError {
    fn from(error: GeneratorError) -> Self {
        match error {
            GeneratorError::UnsupportedKind(kind) => ReconcilerError::UnsupportedKind(kind),
            GeneratorError::InvalidPasswordLength(length) => {
                ReconcilerError::InvalidPasswordLength(length)
            }
            other @ GeneratorError::Entropy(_) => ReconcilerError::Generation(other),
        }
    }
}

impl From<StoreError> for ReconcilerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AlreadyExists(name) => ReconcilerError::AlreadyExists(name),
            StoreError::Conflict(id) => ReconcilerError::Conflict(id),
            other => ReconcilerError::Store(other),
        }
    }
}

impl ReconcilerError {
    /// Short machine-readable reason, used for metrics labels and event reasons
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::UnsupportedKind(_) => "unsupported-kind",
            ReconcilerError::InvalidPasswordLength(_) => "invalid-password-length",
            ReconcilerError::Generation(_) => "generation-failed",
            ReconcilerError::AlreadyExists(_) => "already-exists",
            ReconcilerError::Conflict(_) => "conflict",
            ReconcilerError::InvalidDuration { .. } => "invalid-duration",
            ReconcilerError::Cancelled(_) => "cancelled",
            ReconcilerError::Store(_) => "store-error",
        }
    }

    /// Errors that cannot go away without someone editing the CustomSecret
    #[must_use]
    pub fn requires_spec_change(&self) -> bool {
        matches!(
            self,
            ReconcilerError::UnsupportedKind(_)
                | ReconcilerError::InvalidPasswordLength(_)
                | ReconcilerError::InvalidDuration { .. }
        )
    }
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing scheduled; wait for the next change to the request
    Done,
    /// Run again after the rotation period
    RequeueAfter(Duration),
}

impl ReconcileOutcome {
    /// Translate into the action the kube-runtime scheduler understands
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            ReconcileOutcome::Done => Action::await_change(),
            ReconcileOutcome::RequeueAfter(period) => Action::requeue(period),
        }
    }
}

/// How the generated Secret is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create the Secret; an existing one fails the reconciliation with
    /// `AlreadyExists`, so a rotation only succeeds once the previous Secret
    /// has been deleted by someone else
    CreateOnly,
    /// Create the Secret or replace its data, rotation overwrites in place
    #[default]
    Upsert,
}

impl WriteMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::CreateOnly => "create-only",
            WriteMode::Upsert => "upsert",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create-only" | "create" => Ok(WriteMode::CreateOnly),
            "upsert" | "replace" => Ok(WriteMode::Upsert),
            other => Err(format!(
                "unknown write mode '{other}' (expected 'upsert' or 'create-only')"
            )),
        }
    }
}
