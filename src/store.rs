// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! The key/value store: one record file per key under a sharded root.
//!
//! `set`/`get`/`del` touch a single file each and share no state, so calls on
//! different keys run fully independently. Concurrent `set`s of one key are
//! not serialized; the last rename wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::config::{Config, ScanConfig};
use crate::error::{Result, StoreError};
use crate::scan::{self, ScanCoordinator, ScanSummary};
use crate::storage::fs::{FileSystem, LocalFs};
use crate::storage::record::{Entry, RecordCodec};
use crate::storage::revive::{IsoDateReviver, NoRevival, Reviver};
use crate::storage::shard::path_for;
use crate::storage::value::Value;

/// Keys must be non-empty strings.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
}

fn check_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(StoreError::Validation("key must be a non-empty string".into()))
    }
}

/// Open a store rooted at `storage_dir` with default settings.
pub async fn create(storage_dir: impl Into<PathBuf>) -> Result<Store> {
    Store::open(Config::new(storage_dir)).await
}

/// Handle to an on-disk store. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    codec: RecordCodec,
    scan: ScanConfig,
}

impl Store {
    /// Open (or create) the store described by `config` on the local disk.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.storage.base_path).await?;

        let reviver: Arc<dyn Reviver> = if config.storage.revive_dates {
            Arc::new(IsoDateReviver)
        } else {
            Arc::new(NoRevival)
        };
        info!(
            root = ?config.storage.base_path,
            revive_dates = config.storage.revive_dates,
            scan_concurrency = config.scan.concurrency,
            fail_fast = config.scan.fail_fast,
            "Store opened"
        );

        Ok(Self::with_fs(
            config.storage.base_path,
            Arc::new(LocalFs),
            RecordCodec::new(reviver),
            config.scan,
        ))
    }

    /// Assemble a store over a custom file system. No I/O is done here.
    pub fn with_fs(
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        codec: RecordCodec,
        scan: ScanConfig,
    ) -> Self {
        Self { root: root.into(), fs, codec, scan }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute record path for `key`.
    pub fn path_of(&self, key: &str) -> PathBuf {
        path_for(key).resolve(&self.root)
    }

    /// Write `value` under `key`, replacing any previous record atomically.
    ///
    /// The key is not validated; see [`is_valid_key`] or [`Store::checked_set`].
    pub async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_of(key);
        let buf = self.codec.encode(key, value)?;
        self.fs.safe_write(&path, &buf).await?;
        debug!(key, bytes = buf.len(), "set");
        Ok(())
    }

    /// Value stored under `key`, or `None` if there is none.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }

    /// Like [`Store::get`], keeping the key read back from the record header.
    pub async fn get_entry(&self, key: &str) -> Result<Option<Entry>> {
        let path = self.path_of(key);
        let Some(buf) = self.fs.read(&path).await? else {
            debug!(key, "get: absent");
            return Ok(None);
        };
        let entry = self.codec.decode(&buf).map_err(|e| e.at_path(path))?;
        Ok(Some(entry))
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub async fn del(&self, key: &str) -> Result<()> {
        let path = self.path_of(key);
        self.fs.remove(&path).await?;
        debug!(key, "del");
        Ok(())
    }

    pub async fn checked_set(&self, key: &str, value: &Value) -> Result<()> {
        check_key(key)?;
        self.set(key, value).await
    }

    pub async fn checked_get(&self, key: &str) -> Result<Option<Value>> {
        check_key(key)?;
        self.get(key).await
    }

    pub async fn checked_del(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.del(key).await
    }

    /// Call `visit(key, value)` for every stored entry, in no particular order.
    ///
    /// Returns once every record found by the directory walk has been
    /// processed. See [`ScanConfig::fail_fast`] for the failure policy.
    pub async fn each<F>(&self, mut visit: F) -> Result<ScanSummary>
    where
        F: FnMut(String, Value),
    {
        let receiver = self.start_scan();
        let summary = receiver.drive(|entry| visit(entry.key, entry.value)).await?;
        info!(visited = summary.visited, failures = summary.failures.len(), "Scan complete");
        Ok(summary)
    }

    /// Every stored entry as a stream. Fail-soft failures show up as `Err`
    /// items; under fail-fast the first error ends the stream.
    pub fn entries(&self) -> ReceiverStream<Result<Entry>> {
        let receiver = self.start_scan();
        let (tx, rx) = mpsc::channel(self.scan.channel_capacity.max(1));
        tokio::spawn(receiver.forward(tx));
        ReceiverStream::new(rx)
    }

    fn start_scan(&self) -> scan::ScanReceiver {
        let (coordinator, receiver) =
            ScanCoordinator::new(self.fs.clone(), self.codec.clone(), &self.scan);
        tokio::spawn(scan::enumerate(self.fs.clone(), self.root.clone(), coordinator));
        receiver
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("scan", &self.scan)
            .finish_non_exhaustive()
    }
}
