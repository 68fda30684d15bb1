// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! On-disk record codec.
//!
//! ## File Layout
//!
//! ```text
//! {"type":"binary","key":"bin1"}\n<raw bytes ...>
//! {"type":"json","key":"j1"}\n{"when":"2024-01-01T00:00:00.000Z"}
//! └──────── header ─────────┘ │ └────────── payload ──────────┘
//!                             0x0A
//! ```
//!
//! The header is compact JSON, which escapes any newline inside the key, so
//! the first 0x0A byte in the file always ends the header.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::storage::revive::{self, IsoDateReviver, Reviver};
use crate::storage::value::Value;

pub const HEADER_TERMINATOR: u8 = b'\n';

/// Payload tag carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Binary,
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader<'a> {
    #[serde(rename = "type")]
    kind: RecordKind,
    #[serde(borrow)]
    key: Cow<'a, str>,
}

/// A decoded record: the key as stored plus its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

/// Encoder/decoder with a pluggable date reviver.
#[derive(Clone)]
pub struct RecordCodec {
    reviver: Arc<dyn Reviver>,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(Arc::new(IsoDateReviver))
    }
}

impl std::fmt::Debug for RecordCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCodec").finish_non_exhaustive()
    }
}

impl RecordCodec {
    pub fn new(reviver: Arc<dyn Reviver>) -> Self {
        Self { reviver }
    }

    /// Build the full file content for `key` → `value`.
    pub fn encode(&self, key: &str, value: &Value) -> Result<Vec<u8>> {
        let kind = match value {
            Value::Binary(_) => RecordKind::Binary,
            Value::Json(_) => RecordKind::Json,
        };
        let header = RecordHeader { kind, key: Cow::Borrowed(key) };

        let mut buf = serde_json::to_vec(&header)
            .map_err(|e| StoreError::Serialization(format!("record header: {e}")))?;
        buf.push(HEADER_TERMINATOR);

        match value {
            Value::Binary(data) => buf.extend_from_slice(data),
            Value::Json(doc) => serde_json::to_writer(&mut buf, doc)
                .map_err(|e| StoreError::Serialization(format!("json payload: {e}")))?,
        }
        Ok(buf)
    }

    /// Parse file content back into an [`Entry`].
    pub fn decode(&self, buf: &[u8]) -> Result<Entry> {
        let split = buf.iter().position(|b| *b == HEADER_TERMINATOR);
        let (head, payload) = match split {
            Some(i) => (&buf[..i], &buf[i + 1..]),
            // No terminator: everything is header, payload is empty.
            None => (buf, &buf[buf.len()..]),
        };

        let header: RecordHeader<'_> = serde_json::from_slice(head)
            .map_err(|e| StoreError::corrupt(format!("unreadable header: {e}")))?;

        let value = match header.kind {
            RecordKind::Binary => Value::Binary(Bytes::copy_from_slice(payload)),
            RecordKind::Json => {
                let raw: serde_json::Value = serde_json::from_slice(payload)
                    .map_err(|e| StoreError::corrupt(format!("unreadable json payload: {e}")))?;
                Value::Json(revive::revive(raw, self.reviver.as_ref()))
            }
        };

        Ok(Entry { key: header.key.into_owned(), value })
    }
}

/// [`RecordCodec::encode`] with the default reviver.
pub fn encode(key: &str, value: &Value) -> Result<Vec<u8>> {
    RecordCodec::default().encode(key, value)
}

/// [`RecordCodec::decode`] with ISO-8601 date revival.
pub fn decode(buf: &[u8]) -> Result<Entry> {
    RecordCodec::default().decode(buf)
}
