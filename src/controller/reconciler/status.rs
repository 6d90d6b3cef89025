//! # Status Management
//!
//! Builds the `CustomSecret` status written after a successful secret write.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::crd::CustomSecretStatus;

/// Format a timestamp the way `status.lastUpdated` stores it (RFC 3339, UTC, seconds)
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Next value for `status.lastUpdated`
///
/// Never moves backwards: if the stored timestamp is later than `now` (clock
/// skew between replicas) it is kept as is. Unparsable stored values are
/// overwritten.
#[must_use]
pub fn next_last_updated(previous: Option<&str>, now: DateTime<Utc>) -> String {
    let now_secs = format_timestamp(now);
    let Some(previous) = previous.filter(|p| !p.is_empty()) else {
        return now_secs;
    };
    match DateTime::parse_from_rfc3339(previous) {
        Ok(stored) if stored.with_timezone(&Utc) > now => previous.to_string(),
        _ => now_secs,
    }
}

/// Status for a request whose Secret `secret_name` was just written from the
/// spec at `generation`
#[must_use]
pub fn build_status(
    previous: Option<&CustomSecretStatus>,
    secret_name: &str,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> CustomSecretStatus {
    CustomSecretStatus {
        last_updated: next_last_updated(previous.map(|s| s.last_updated.as_str()), now),
        secret_name: secret_name.to_string(),
        observed_generation: generation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 30, 15).unwrap()
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc_seconds() {
        assert_eq!(format_timestamp(at(9)), "2025-03-01T09:30:15Z");
    }

    #[test]
    fn test_last_updated_advances() {
        assert_eq!(
            next_last_updated(Some("2025-03-01T08:30:15Z"), at(9)),
            "2025-03-01T09:30:15Z"
        );
        assert_eq!(next_last_updated(None, at(9)), "2025-03-01T09:30:15Z");
        assert_eq!(next_last_updated(Some(""), at(9)), "2025-03-01T09:30:15Z");
    }

    #[test]
    fn test_last_updated_never_regresses() {
        assert_eq!(
            next_last_updated(Some("2025-03-01T10:30:15Z"), at(9)),
            "2025-03-01T10:30:15Z"
        );
        // Offsets are compared as instants
        assert_eq!(
            next_last_updated(Some("2025-03-01T11:00:00+01:00"), at(9)),
            "2025-03-01T11:00:00+01:00"
        );
    }

    #[test]
    fn test_garbage_last_updated_is_replaced() {
        assert_eq!(next_last_updated(Some("yesterday"), at(9)), "2025-03-01T09:30:15Z");
    }

    #[test]
    fn test_build_status_names_secret() {
        let status = build_status(None, "alice-secret", Some(3), at(9));
        assert_eq!(status.secret_name, "alice-secret");
        assert_eq!(status.last_updated, "2025-03-01T09:30:15Z");
        assert_eq!(status.observed_generation, Some(3));
    }
}
