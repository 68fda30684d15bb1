// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! File-system seam used by the store and the scanner.
//!
//! Missing paths are never errors here: reads give `None`, listings give an
//! empty vec, and removes succeed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;

/// Suffix of the sibling file a safe write goes through before the rename.
pub const TEMP_SUFFIX: &str = "tmp";

/// One name returned by [`FileSystem::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Storage primitives the store needs. Implementations must be `Send + Sync`
/// so scan workers can share them across tasks.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Replace `path` with `data` so readers only ever see the old or the new
    /// content. Parent directories are created as needed.
    async fn safe_write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Whole-file read. `None` if the file does not exist.
    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Remove a file. Removing a missing file is a no-op.
    async fn remove(&self, path: &Path) -> Result<()>;

    /// Names directly under `dir`. Empty if `dir` does not exist.
    async fn list(&self, dir: &Path) -> Result<Vec<DirEntry>>;
}

/// [`FileSystem`] over the local disk via `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique per write, so concurrent writers of one key never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{name}.{}-{seq}.{TEMP_SUFFIX}", std::process::id()))
}

#[async_trait::async_trait]
impl FileSystem for LocalFs {
    async fn safe_write(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write + fsync the sibling first, then rename over the target.
        let tmp = temp_path(path);
        let written: std::io::Result<()> = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;
        if let Err(e) = written {
            // Nothing else ever removes a stray temp file.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), size = data.len(), "record written");
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "record removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_dir = entry.file_type().await?.is_dir();
            out.push(DirEntry { name, is_dir });
        }
        Ok(out)
    }
}
