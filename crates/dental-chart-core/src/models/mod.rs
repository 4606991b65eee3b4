//! Domain models for the dental chart engine.

mod catalog;
mod chart;
mod condition;
mod history;
mod patient;
mod procedure;
mod surface;
mod tooth;

pub use catalog::*;
pub use chart::*;
pub use condition::*;
pub use history::*;
pub use patient::*;
pub use procedure::*;
pub use surface::*;
pub use tooth::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Current UTC time as fixed-width RFC 3339 (microsecond precision).
///
/// Fixed width keeps lexical and chronological order identical in storage.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Validate a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Normalize an appointment date or datetime to a UTC timestamp.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) or a bare
/// date (midnight UTC).
pub fn normalize_appointment(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_timestamp(ts.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(format_timestamp(naive.and_utc()));
        }
    }
    parse_date(raw)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| format_timestamp(naive.and_utc()))
}

/// Lower and upper timestamp bounds covering whole days `from..=to`.
pub fn day_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> (Option<String>, Option<String>) {
    let lower = from
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| format_timestamp(n.and_utc()));
    let upper = to
        .and_then(|d| d.succ_opt())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| format_timestamp(n.and_utc()));
    (lower, upper)
}
