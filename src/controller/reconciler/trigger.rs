//! # Trigger Detection
//!
//! Decides whether a watch event warrants a reconciliation pass.
//!
//! The controller watches both `CustomSecret` objects and the Secrets it owns,
//! so every pass produces events of its own (the Secret write and the status
//! write). Those must not start another pass, or each rotation would feed the
//! next one. A pass runs only when:
//! - the request has never been reconciled
//! - its spec changed (`metadata.generation` differs from `status.observedGeneration`)
//! - the generated Secret is missing
//! - a rotation is due according to `status.lastUpdated` and `rotationPeriod`
//!
//! Anything else is skipped, keeping the rotation schedule alive when one is
//! pending.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use super::duration::parse_go_duration;
use super::types::ReconcileOutcome;
use crate::crd::CustomSecret;

/// Rotations due within this window run immediately instead of being requeued
pub const ROTATION_DUE_TOLERANCE: Duration = Duration::from_secs(2);

/// Why a pass is being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// No status yet
    Initial,
    /// Spec edited since the last pass
    SpecChanged,
    /// The generated Secret was deleted
    SecretMissing,
    /// `rotationPeriod` elapsed since `lastUpdated`
    RotationDue,
}

impl Trigger {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::SpecChanged => "spec-changed",
            Trigger::SecretMissing => "secret-missing",
            Trigger::RotationDue => "rotation-due",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run(Trigger),
    /// Nothing to do now; return this outcome to the scheduler
    Skip(ReconcileOutcome),
}

/// Decide what to do with `request` at `now`
///
/// `secret_present` tells whether the generated Secret currently exists.
#[must_use]
pub fn decide(request: &CustomSecret, secret_present: bool, now: DateTime<Utc>) -> Decision {
    let Some(status) = request.status.as_ref().filter(|s| !s.secret_name.is_empty()) else {
        return Decision::Run(Trigger::Initial);
    };
    if request.metadata.generation != status.observed_generation {
        return Decision::Run(Trigger::SpecChanged);
    }
    if !secret_present {
        return Decision::Run(Trigger::SecretMissing);
    }

    // Invalid periods were reported by the pass that recorded this status
    let Some(period) = request
        .spec
        .rotation_period()
        .and_then(|p| parse_go_duration(p).ok())
        .filter(|p| !p.is_zero())
    else {
        return Decision::Skip(ReconcileOutcome::Done);
    };

    let Ok(last) = DateTime::parse_from_rfc3339(&status.last_updated) else {
        return Decision::Run(Trigger::RotationDue);
    };
    let Some(due) = chrono::Duration::from_std(period)
        .ok()
        .and_then(|period| last.with_timezone(&Utc).checked_add_signed(period))
    else {
        return Decision::Skip(ReconcileOutcome::Done);
    };

    match (due - now).to_std() {
        Ok(remaining) if remaining > ROTATION_DUE_TOLERANCE => {
            Decision::Skip(ReconcileOutcome::RequeueAfter(remaining))
        }
        _ => Decision::Run(Trigger::RotationDue),
    }
}
