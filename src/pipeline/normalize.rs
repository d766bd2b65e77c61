//! Cell-level cleaning rules. Each function is a fixed point: applying it to its own
//! output changes nothing, which is what makes the transform stage idempotent.

use crate::constants::UNKNOWN_COUNTRY;
use crate::country::country_name;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s.,!?]").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Keep ASCII letters, digits, whitespace and `. , ! ?`; collapse whitespace (including
/// newlines and tabs) to single spaces and trim. Never truncates otherwise.
pub fn sanitize_text(text: &str) -> String {
    let kept = DISALLOWED_CHARS.replace_all(text, "");
    WHITESPACE_RUN.replace_all(&kept, " ").trim().to_string()
}

/// Largest count the warehouse's signed INTEGER columns can hold.
pub const MAX_COUNT: u64 = i64::MAX as u64;

/// Parse a count cell. Missing, non-numeric and negative values become 0; decimals
/// truncate and anything above [`MAX_COUNT`] clamps to it. The flag reports whether
/// the raw cell needed coercing.
pub fn coerce_count(raw: Option<&str>) -> (u64, bool) {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return (0, true);
    };
    if let Ok(n) = value.parse::<u64>() {
        return if n > MAX_COUNT { (MAX_COUNT, true) } else { (n, false) };
    }
    match value.parse::<f64>() {
        // i64::MAX rounds up to 2^63 as f64, so `>=` catches everything out of range
        Ok(f) if f.is_finite() && f >= MAX_COUNT as f64 => (MAX_COUNT, true),
        Ok(f) if f.is_finite() && f >= 0.0 => (f as u64, true),
        _ => (0, true),
    }
}

/// Full country name for a code or name, or the `unknown` sentinel.
pub fn resolve_country(raw: Option<&str>) -> String {
    raw.and_then(country_name)
        .unwrap_or(UNKNOWN_COUNTRY)
        .to_string()
}

/// RFC 3339 first, then the `YYYY-MM-DD HH:MM:SS+00:00` form spreadsheets write back.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let value = raw.map(str::trim).filter(|v| !v.is_empty())?;
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z"))
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
}
