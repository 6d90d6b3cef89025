//! # Rotation Period Parsing
//!
//! Parses Go-style duration strings ("300ms", "90s", "1h30m", "1.5h").
//!
//! A duration is an optionally signed sequence of decimal numbers, each with an
//! optional fraction and a mandatory unit. Valid units are `ns`, `us` (or `µs`),
//! `ms`, `s`, `m` and `h`. The special value `"0"` needs no unit.
//!
//! Negative durations are reported as [`DurationError::Negative`]. The reconciler
//! treats them like a zero period: no rotation is scheduled.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Largest representable duration, matching a signed 64-bit nanosecond count
const MAX_NANOS: u128 = i64::MAX as u128;

// A single `<int>[.<frac>]<unit>` component; every group may be empty and is
// validated afterwards so the error can say what is missing
static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<int>[0-9]*)(?:\.(?P<frac>[0-9]*))?(?P<unit>[^0-9.]*)")
        .expect("Failed to compile duration component regex - this should never happen")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration string cannot be empty")]
    Empty,
    #[error("invalid duration '{0}'")]
    Invalid(String),
    #[error("missing unit in duration '{0}'")]
    MissingUnit(String),
    #[error("unknown unit '{unit}' in duration '{input}' (expected ns, us, ms, s, m or h)")]
    UnknownUnit { unit: String, input: String },
    #[error("duration '{0}' must not be negative")]
    Negative(String),
    #[error("duration '{0}' is too large")]
    Overflow(String),
}

/// Parse a Go-style duration string
///
/// # Errors
///
/// Returns a [`DurationError`] describing the first problem found.
pub fn parse_go_duration(input: &str) -> Result<Duration, DurationError> {
    let original = input;
    let invalid = || DurationError::Invalid(original.to_string());

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        Some(_) => (false, input),
        None => return Err(DurationError::Empty),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let captures = COMPONENT.captures(rest).ok_or_else(invalid)?;
        let whole = captures.get(0).ok_or_else(invalid)?;
        let int = captures.name("int").map_or("", |m| m.as_str());
        let frac = captures.name("frac").map_or("", |m| m.as_str());
        let unit = captures.name("unit").map_or("", |m| m.as_str());

        if int.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(original.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: original.to_string(),
        })?;

        let overflow = || DurationError::Overflow(original.to_string());
        let whole_part = if int.is_empty() {
            0
        } else {
            int.parse::<u128>().ok().ok_or_else(overflow)?
        };
        let mut component = whole_part.checked_mul(scale).ok_or_else(overflow)?;
        component = component
            .checked_add(fraction_nanos(frac, scale))
            .ok_or_else(overflow)?;
        total = total.checked_add(component).ok_or_else(overflow)?;
        if total > MAX_NANOS {
            return Err(overflow());
        }

        rest = &rest[whole.end()..];
    }

    if negative && total > 0 {
        return Err(DurationError::Negative(original.to_string()));
    }

    let nanos = u64::try_from(total)
        .ok()
        .ok_or_else(|| DurationError::Overflow(original.to_string()))?;
    Ok(Duration::from_nanos(nanos))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        // U+00B5 micro sign and U+03BC Greek small letter mu
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

/// Nanoseconds contributed by the fractional digits of a component, truncated
fn fraction_nanos(frac: &str, scale: u128) -> u128 {
    let mut value: u128 = 0;
    let mut divisor: u128 = 1;
    // Digits beyond nanosecond precision of the largest unit cannot matter
    for digit in frac.bytes().take(24) {
        value = value * 10 + u128::from(digit - b'0');
        divisor *= 10;
    }
    value * scale / divisor
}
