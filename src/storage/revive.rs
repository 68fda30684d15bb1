// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Date revival for decoded JSON payloads.
//!
//! Dates are written as plain ISO-8601 strings, so on the way back every
//! string leaf that *looks* like a timestamp is turned into [`Json::Date`].
//! This is lossy on purpose: a user string such as `"2024-01-01T00:00:00Z"`
//! comes back as a date even if it was stored as text. Object keys are never
//! touched. Use [`NoRevival`] to keep strings as strings.

use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::storage::value::Json;

/// Decides whether a string leaf is really a date.
pub trait Reviver: Send + Sync {
    fn revive(&self, s: &str) -> Option<DateTime<Utc>>;
}

/// `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM]`. No zone means UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsoDateReviver;

/// Leaves every string alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRevival;

fn iso_pattern() -> &'static Regex {
    static ISO: OnceLock<Regex> = OnceLock::new();
    ISO.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d*)?)(?:(Z)|([+-])([\d:]*))?$")
            .expect("static ISO-8601 pattern")
    })
}

impl Reviver for IsoDateReviver {
    fn revive(&self, s: &str) -> Option<DateTime<Utc>> {
        let caps = iso_pattern().captures(s)?;
        let naive = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%dT%H:%M:%S%.f").ok()?;

        let offset = match (caps.get(3), caps.get(4)) {
            (Some(sign), Some(zone)) => parse_offset(sign.as_str(), zone.as_str())?,
            _ => FixedOffset::east_opt(0)?,
        };
        let local = offset.from_local_datetime(&naive).single()?;
        Some(local.with_timezone(&Utc))
    }
}

impl Reviver for NoRevival {
    fn revive(&self, _s: &str) -> Option<DateTime<Utc>> {
        None
    }
}

/// Accepts `HH:MM`, `HHMM` and `HH`.
fn parse_offset(sign: &str, zone: &str) -> Option<FixedOffset> {
    let digits: String = zone.chars().filter(|c| *c != ':').collect();
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    let secs = hours * 3600 + minutes * 60;
    if sign == "-" {
        FixedOffset::west_opt(secs)
    } else {
        FixedOffset::east_opt(secs)
    }
}

/// Walk a parsed payload, replacing date-looking string leaves.
pub fn revive(value: serde_json::Value, reviver: &dyn Reviver) -> Json {
    match value {
        serde_json::Value::String(s) => match reviver.revive(&s) {
            Some(date) => Json::Date(date),
            None => Json::String(s),
        },
        serde_json::Value::Array(items) => {
            Json::Array(items.into_iter().map(|v| revive(v, reviver)).collect())
        }
        serde_json::Value::Object(map) => Json::Object(
            map.into_iter().map(|(k, v)| (k, revive(v, reviver))).collect(),
        ),
        other => Json::from(other),
    }
}
