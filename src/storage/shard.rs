// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Key → file location.
//!
//! ```text
//! sha1(key) = 4a 7d1ed414474e4033ac29ccb8653d9b5e...
//!             ││ └──────────── 38 hex ───────────┘
//!             └┴─ shard directory (≤ 256 of them)
//!
//! <root>/4a/7d1ed414474e4033ac29ccb8653d9b5e...
//! ```

use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

pub const SHARD_NAME_LEN: usize = 2;
pub const RECORD_NAME_LEN: usize = 38;

/// Relative location of a record: `<shard>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    pub shard: String,
    pub file: String,
}

impl StoragePath {
    /// Absolute path of the record under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.shard).join(&self.file)
    }
}

/// Map a key to its shard directory and file name.
///
/// The key must be non-empty; see [`crate::is_valid_key`]. Nothing is checked here.
pub fn path_for(key: &str) -> StoragePath {
    let digest = hex::encode(Sha1::digest(key.as_bytes()));
    let (shard, file) = digest.split_at(SHARD_NAME_LEN);
    StoragePath { shard: shard.to_string(), file: file.to_string() }
}

pub fn is_shard_dir_name(name: &str) -> bool {
    name.len() == SHARD_NAME_LEN && is_lower_hex(name)
}

/// True for record files, false for safe-write temp files and strays.
pub fn is_record_file_name(name: &str) -> bool {
    name.len() == RECORD_NAME_LEN && is_lower_hex(name)
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest_split() {
        // sha1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        let p = path_for("abc");
        assert_eq!(p.shard, "a9");
        assert_eq!(p.file, "993e364706816aba3e25717850c26c9cd0d89d");
        assert!(is_shard_dir_name(&p.shard));
        assert!(is_record_file_name(&p.file));
    }

    #[test]
    fn distinct_keys_distinct_paths() {
        let keys = ["a", "b", "A", "a ", "ключ", "bin1", "j1"];
        for (i, a) in keys.iter().enumerate() {
            assert_eq!(path_for(a), path_for(a));
            for b in &keys[i + 1..] {
                assert_ne!(path_for(a), path_for(b), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(!is_shard_dir_name("A9"));
        assert!(!is_shard_dir_name("a9a"));
        assert!(!is_record_file_name("993e364706816aba3e25717850c26c9cd0d89d.tmp"));
        assert!(!is_record_file_name("xyz"));
    }
}
