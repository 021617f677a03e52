//! Time math shared by every runner that waits.
//!
//! Elapsed time is always recomputed from the persisted
//! `started_at_timestamp` against an explicit `now`, so a node can be
//! re-invoked any number of times, after any restart, and still compute the
//! correct remaining wait. Every proposed wait is capped to the engine's
//! maximum poll interval; `next_check` is the only place that cap is applied.

use chrono::{DateTime, TimeDelta, Utc};
use flowstep_types::config::DEFAULT_MAX_POLL_INTERVAL_SECS;
use flowstep_types::invocation::{CurrentAction, RunResult};

use crate::runner::RunError;

/// Message carried by `RunError::InvalidState` when the cursor cannot supply
/// a start time.
pub const STARTED_AT_INVALID: &str = "'startedAtTimestamp' is not set or is invalid";

/// The engine's default poll cap (10 minutes).
pub fn default_max_poll_interval() -> TimeDelta {
    TimeDelta::seconds(DEFAULT_MAX_POLL_INTERVAL_SECS as i64)
}

// ---------------------------------------------------------------------------
// Elapsed / remaining / next check
// ---------------------------------------------------------------------------

/// Time elapsed since the current action started.
///
/// Fails with `InvalidState` when there is no cursor or its timestamp is
/// missing or unrepresentable. No default is ever substituted.
pub fn elapsed(cursor: Option<&CurrentAction>, now: DateTime<Utc>) -> Result<TimeDelta, RunError> {
    let started_at = cursor
        .and_then(CurrentAction::started_at)
        .ok_or_else(|| RunError::InvalidState(STARTED_AT_INVALID.to_string()))?;
    Ok(now.signed_duration_since(started_at))
}

/// How much of `target` is left after `elapsed`. Non-positive means satisfied.
///
/// Saturates toward the sign of the exact difference on overflow.
pub fn remaining(target: TimeDelta, elapsed: TimeDelta) -> TimeDelta {
    target.checked_sub(&elapsed).unwrap_or(if elapsed > target {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

/// The delay until the next check, or `None` when the wait is satisfied.
pub fn next_check(remaining: TimeDelta, max_poll_interval: TimeDelta) -> Option<TimeDelta> {
    if remaining <= TimeDelta::zero() {
        None
    } else {
        Some(remaining.min(max_poll_interval))
    }
}

/// Turn a remaining wait into a run result: done when satisfied, otherwise
/// pending until `now` plus the capped delay.
pub fn schedule(
    now: DateTime<Utc>,
    remaining: TimeDelta,
    max_poll_interval: TimeDelta,
) -> Result<RunResult, RunError> {
    let Some(delay) = next_check(remaining, max_poll_interval) else {
        return Ok(RunResult::done());
    };
    let scheduled_at = now.checked_add_signed(delay).ok_or_else(|| {
        RunError::InvalidState(format!("next check {delay} after {now} is out of range"))
    })?;
    Ok(RunResult::pending(scheduled_at))
}

// ---------------------------------------------------------------------------
// Duration parsing
// ---------------------------------------------------------------------------

/// Errors from parsing a textual duration such as "2h".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration '{0}': expected a whole number followed by ms, s, m, h, d or w")]
    Invalid(String),

    #[error("duration '{0}' is out of range")]
    OutOfRange(String),
}

/// Parse a duration quantity with unit ("300s", "5m", "2h", "1d").
///
/// Accepted units: `ms`, `s`, `m`, `h`, `d`, `w`. Whitespace around the
/// value and between number and unit is ignored.
pub fn parse_duration(input: &str) -> Result<TimeDelta, DurationError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(DurationError::Invalid(input.to_string()));
    }
    let amount: i64 = digits
        .parse()
        .map_err(|_| DurationError::OutOfRange(input.to_string()))?;

    let delta = match unit.trim_start() {
        "ms" => TimeDelta::try_milliseconds(amount),
        "s" => TimeDelta::try_seconds(amount),
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        "w" => TimeDelta::try_weeks(amount),
        _ => return Err(DurationError::Invalid(input.to_string())),
    };

    delta.ok_or_else(|| DurationError::OutOfRange(input.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
