// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

pub mod config;
pub mod error;
pub mod scan;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Result, StoreError};
pub use scan::ScanSummary;
pub use storage::{Entry, Json, Value};
pub use store::{create, is_valid_key, Store};
