//! Lenient timestamp parsing. Never fails: unknown shapes resolve to the current time.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 / naive ISO-8601 string (naive is taken as UTC) or epoch seconds.
pub fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    let parsed = match value {
        Some(Value::String(s)) => parse_str(s),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .and_then(|secs| {
                let millis = (secs * 1000.0) as i64;
                Utc.timestamp_millis_opt(millis).single()
            }),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        if value.is_some() {
            tracing::debug!(raw = ?value, "unparseable timestamp; using now");
        }
        Utc::now()
    })
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
