//! Date spelling normalization for legacy imports.
//!
//! # Responsibility
//! - Rewrite `2023年4月5日` and `2023-4-5` spellings into `YYYY-MM-DD`.
//! - Provide an ordering key over canonical dates and RFC 3339 timestamps.
//!
//! # Invariants
//! - Normalizers are total: input without a recognizable date is returned
//!   unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ERA_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日").expect("valid era date regex"));
static DASHED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid dashed date regex"));

/// Normalizes `<Y>年<M>月<D>日` into `YYYY-MM-DD`.
///
/// The first match anywhere in `value` wins, so trailing time text is dropped.
pub fn normalize_era(value: &str) -> String {
    normalize_with(&ERA_DATE_RE, value)
}

/// Normalizes `<Y>-<M>-<D>` with unpadded month/day into `YYYY-MM-DD`.
pub fn normalize_dashed(value: &str) -> String {
    normalize_with(&DASHED_DATE_RE, value)
}

/// Ordering key for entry dates.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight).
/// Returns `None` for anything else.
pub fn date_sort_key(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(timestamp.naive_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn normalize_with(pattern: &Regex, value: &str) -> String {
    pattern
        .captures(value)
        .map(|caps| format_captures(&caps))
        .unwrap_or_else(|| value.to_string())
}

fn format_captures(caps: &Captures<'_>) -> String {
    format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3])
}
