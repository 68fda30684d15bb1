// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Storage subsystem: key sharding, record codec, value model, file-system seam.

pub mod fs;
pub mod record;
pub mod revive;
pub mod shard;
pub mod value;

pub use record::{decode, encode, Entry, RecordCodec, RecordKind};
pub use shard::{path_for, StoragePath};
pub use value::{Json, Value};
