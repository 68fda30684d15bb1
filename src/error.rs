// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid key: {0}")]
    Validation(String),

    #[error("Corrupt record{}: {reason}", location(.path))]
    CorruptRecord {
        path: Option<PathBuf>,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan no longer accepts paths")]
    ScanClosed,

    #[error("Scan aborted at {path:?}: {source}")]
    Scan {
        path: PathBuf,
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Corrupt record error not yet tied to a file.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        StoreError::CorruptRecord { path: None, reason: reason.into() }
    }

    /// Attach the on-disk location to a corrupt-record error.
    pub fn at_path(self, at: PathBuf) -> Self {
        match self {
            StoreError::CorruptRecord { path: None, reason } => {
                StoreError::CorruptRecord { path: Some(at), reason }
            }
            other => other,
        }
    }
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, StoreError>;
