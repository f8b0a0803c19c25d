//! Timestamp helpers.
//!
//! All database writes are RFC-3339 UTC strings with millisecond precision and
//! a `Z` suffix (`2024-03-10T14:30:00.000Z`). That fixed shape sorts
//! lexicographically in time order, so freshness cutoffs can be compared as
//! plain text in SQL.

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};

/// RFC-3339 with any offset -> UTC.
///
/// Example:
/// - "2024-03-10T09:30:00-05:00" -> 2024-03-10T14:30:00Z
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Current time in storage format.
pub fn now_rfc3339() -> String {
    to_rfc3339_millis(Utc::now())
}

/// Sorts before every timestamp this crate writes.
pub const EARLIEST_TS: &str = "0000-01-01T00:00:00.000Z";

fn before(now: DateTime<Utc>, delta: Option<TimeDelta>) -> String {
    delta
        .and_then(|d| now.checked_sub_signed(d))
        .map(to_rfc3339_millis)
        .unwrap_or_else(|| EARLIEST_TS.to_string())
}

/// Storage-format timestamp `hours` before `now`, or [`EARLIEST_TS`] when
/// that lies outside the representable range.
pub fn hours_before(now: DateTime<Utc>, hours: i64) -> String {
    before(now, TimeDelta::try_hours(hours))
}

/// Storage-format timestamp `days` before `now`, clamped like [`hours_before`].
pub fn days_before(now: DateTime<Utc>, days: i64) -> String {
    before(now, TimeDelta::try_days(days))
}
