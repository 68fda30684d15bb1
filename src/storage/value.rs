// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Stored value shapes.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Number;

/// What a key maps to. The variant is written into the record header.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Binary(Bytes),
    Json(Json),
}

/// Structured payload. Same as JSON plus a temporal leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Json {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Serialized as `YYYY-MM-DDTHH:MM:SS.sssZ`. Only years 0 to 9999 fit that
    /// form; encoding any other year fails.
    Date(DateTime<Utc>),
    Array(Vec<Json>),
    Object(BTreeMap<String, Json>),
}

impl Value {
    pub fn as_binary(&self) -> Option<&Bytes> {
        match self {
            Value::Binary(b) => Some(b),
            Value::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Json> {
        match self {
            Value::Json(j) => Some(j),
            Value::Binary(_) => None,
        }
    }
}

impl Json {
    /// Object member lookup; `None` for non-objects.
    pub fn get(&self, field: &str) -> Option<&Json> {
        match self {
            Json::Object(map) => map.get(field),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Json::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Json::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Json]> {
        match self {
            Json::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Years a date leaf can carry and still be read back as a date.
pub const DATE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Wire form of a date leaf. `None` outside [`DATE_YEARS`], where chrono
/// would emit a signed, expanded year.
pub fn format_date(date: &DateTime<Utc>) -> Option<String> {
    DATE_YEARS
        .contains(&date.year())
        .then(|| date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Serialize for Json {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Json::Null => serializer.serialize_unit(),
            Json::Bool(b) => serializer.serialize_bool(*b),
            Json::Number(n) => n.serialize(serializer),
            Json::String(s) => serializer.serialize_str(s),
            Json::Date(d) => match format_date(d) {
                Some(text) => serializer.serialize_str(&text),
                None => Err(S::Error::custom(format!("date year {} out of range", d.year()))),
            },
            Json::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Json::Object(map) => {
                let mut obj = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    obj.serialize_entry(k, v)?;
                }
                obj.end()
            }
        }
    }
}

/// Plain conversion, no date revival.
impl From<serde_json::Value> for Json {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Json::Null,
            serde_json::Value::Bool(b) => Json::Bool(b),
            serde_json::Value::Number(n) => Json::Number(n),
            serde_json::Value::String(s) => Json::String(s),
            serde_json::Value::Array(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            serde_json::Value::Object(map) => {
                Json::Object(map.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
            }
        }
    }
}

impl From<DateTime<Utc>> for Json {
    fn from(date: DateTime<Utc>) -> Self {
        Json::Date(date)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value.into())
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        Value::Json(value)
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value::Binary(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(Bytes::from(bytes))
    }
}
