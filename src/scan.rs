// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Full-store scan: a fixed pool of record readers fed by a directory walk.
//!
//! ```text
//!  enumerate()                    ScanCoordinator                 ScanReceiver
//!  ───────────                    ───────────────                 ────────────
//!  list root ──┐
//!  list 00/ ───┼─ add_path ──→ pending += 1 ─→ queue (bounded)
//!  list 01/ ───┤                                    │
//!  ...         │                      `concurrency` workers
//!  list ff/ ───┘                        read → decode
//!       │                                   │ mpsc
//!       ▼                                   ├──────────────→ visit(entry)
//!  no_more_paths                     pending -= 1
//!                                           │
//!                   no_more_paths && pending == 0 ── oneshot ──→ done
//! ```
//!
//! An empty work queue does not mean the scan is over: the walk may still be
//! listing a shard directory. Completion needs both the producer's
//! `no_more_paths` and a zero pending count, whichever comes last. Both are
//! checked under one mutex and the one-shot sender is taken there, so `done`
//! fires exactly once.
//!
//! Each worker sends its event before it decrements `pending`, so every event
//! is already queued by the time `done` fires. Paths, in-flight reads and
//! shard listings are all bounded, so memory does not grow with store size.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::config::ScanConfig;
use crate::error::{Result, StoreError};
use crate::storage::fs::FileSystem;
use crate::storage::record::{Entry, RecordCodec};
use crate::storage::shard::{is_record_file_name, is_shard_dir_name};

/// One record that could not be listed, read or decoded.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: StoreError,
}

#[derive(Debug)]
pub enum ScanEvent {
    Entry(Entry),
    Failed(ScanFailure),
}

/// Outcome of a fail-soft scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub visited: usize,
    pub failures: Vec<ScanFailure>,
}

impl ScanSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Completion {
    no_more_paths: bool,
    done: Option<oneshot::Sender<()>>,
}

struct Shared {
    fs: Arc<dyn FileSystem>,
    codec: RecordCodec,
    pending: AtomicUsize,
    aborted: AtomicBool,
    fail_fast: bool,
    events: mpsc::Sender<ScanEvent>,
    completion: Mutex<Completion>,
}

type WorkQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<PathBuf>>>;

/// Producer side of a scan. Dropping it counts as `no_more_paths` and lets
/// the workers exit once the queue is drained.
pub struct ScanCoordinator {
    shared: Arc<Shared>,
    queue: mpsc::Sender<PathBuf>,
    concurrency: usize,
}

/// Consumer side of a scan.
pub struct ScanReceiver {
    events: mpsc::Receiver<ScanEvent>,
    done: oneshot::Receiver<()>,
    completed: bool,
    fail_fast: bool,
}

impl ScanCoordinator {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        codec: RecordCodec,
        config: &ScanConfig,
    ) -> (ScanCoordinator, ScanReceiver) {
        let concurrency = config.concurrency.max(1);
        let (events_tx, events_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (queue_tx, queue_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (done_tx, done_rx) = oneshot::channel();

        let shared = Arc::new(Shared {
            fs,
            codec,
            pending: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            fail_fast: config.fail_fast,
            events: events_tx,
            completion: Mutex::new(Completion { no_more_paths: false, done: Some(done_tx) }),
        });

        let queue: WorkQueue = Arc::new(tokio::sync::Mutex::new(queue_rx));
        for _ in 0..concurrency {
            tokio::spawn(run_worker(shared.clone(), queue.clone()));
        }

        let receiver = ScanReceiver {
            events: events_rx,
            done: done_rx,
            completed: false,
            fail_fast: config.fail_fast,
        };
        (ScanCoordinator { shared, queue: queue_tx, concurrency }, receiver)
    }

    /// Register a record file. Processing may start before this returns.
    ///
    /// Waits while the work queue is full, so the consumer must be draining
    /// events on another task.
    pub async fn add_path(&self, path: PathBuf) -> Result<()> {
        self.shared.register()?;
        if self.queue.send(path).await.is_err() {
            // Workers hold the receiver until this sender is dropped.
            self.shared.finish_one();
            return Err(StoreError::ScanClosed);
        }
        Ok(())
    }

    /// Report a failure that is not tied to a single record read, such as
    /// a shard directory that cannot be listed.
    pub async fn report_failure(&self, path: PathBuf, error: StoreError) -> Result<()> {
        self.shared.register()?;
        self.shared.fail(path, error).await;
        self.shared.finish_one();
        Ok(())
    }

    /// The producer is done; completion fires once pending work drains.
    pub fn no_more_paths(&self) {
        let mut state = self.shared.completion.lock();
        state.no_more_paths = true;
        self.shared.fire_if_complete(&mut state);
    }

    /// Number of record readers, also the cap on concurrent shard listings.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Paths registered but not yet finished.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// True once a fail-fast abort happened or the consumer went away.
    pub fn is_cancelled(&self) -> bool {
        self.shared.aborted.load(Ordering::Acquire) || self.shared.events.is_closed()
    }
}

impl Drop for ScanCoordinator {
    fn drop(&mut self) {
        self.no_more_paths();
    }
}

impl Shared {
    /// Count a new unit of work, unless the producer already closed.
    fn register(&self) -> Result<()> {
        let state = self.completion.lock();
        if state.no_more_paths {
            return Err(StoreError::ScanClosed);
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn process(&self, path: PathBuf) {
        if self.aborted.load(Ordering::Acquire) {
            debug!(path = %path.display(), "scan aborted, skipping record");
        } else {
            match self.load(&path).await {
                Ok(Some(entry)) => {
                    // A closed channel means the consumer is gone; nothing to deliver to.
                    let _ = self.events.send(ScanEvent::Entry(entry)).await;
                }
                Ok(None) => {
                    debug!(path = %path.display(), "record vanished before read");
                }
                Err(error) => self.fail(path, error).await,
            }
        }
        self.finish_one();
    }

    async fn load(&self, path: &Path) -> Result<Option<Entry>> {
        let Some(buf) = self.fs.read(path).await? else {
            return Ok(None);
        };
        self.codec
            .decode(&buf)
            .map(Some)
            .map_err(|e| e.at_path(path.to_path_buf()))
    }

    async fn fail(&self, path: PathBuf, error: StoreError) {
        warn!(path = %path.display(), error = %error, "scan failure");
        if self.fail_fast {
            self.aborted.store(true, Ordering::Release);
        }
        let _ = self.events.send(ScanEvent::Failed(ScanFailure { path, error })).await;
    }

    fn finish_one(&self) {
        let prev = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "pending underflow");
        if prev == 1 {
            let mut state = self.completion.lock();
            self.fire_if_complete(&mut state);
        }
    }

    fn fire_if_complete(&self, state: &mut Completion) {
        if state.no_more_paths && self.pending.load(Ordering::Acquire) == 0 {
            if let Some(done) = state.done.take() {
                let _ = done.send(());
            }
        }
    }
}

async fn run_worker(shared: Arc<Shared>, queue: WorkQueue) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(path) = next else {
            break;
        };
        shared.process(path).await;
    }
}

impl ScanReceiver {
    /// Next event, or `None` once the scan is complete and drained.
    pub async fn next(&mut self) -> Option<ScanEvent> {
        loop {
            if self.completed {
                return self.events.try_recv().ok();
            }
            tokio::select! {
                biased;
                Some(event) = self.events.recv() => return Some(event),
                _ = &mut self.done => self.completed = true,
            }
        }
    }

    /// Feed every entry to `visit` and wait for completion.
    ///
    /// Fail-soft: failures are collected into the summary. Fail-fast: the
    /// first failure is returned as [`StoreError::Scan`] after in-flight work
    /// has drained, and nothing is visited after it.
    pub async fn drive<F>(mut self, mut visit: F) -> Result<ScanSummary>
    where
        F: FnMut(Entry),
    {
        let mut summary = ScanSummary::default();
        while let Some(event) = self.next().await {
            match event {
                ScanEvent::Entry(entry) => {
                    if self.fail_fast && !summary.failures.is_empty() {
                        continue;
                    }
                    summary.visited += 1;
                    visit(entry);
                }
                ScanEvent::Failed(failure) => summary.failures.push(failure),
            }
        }

        if self.fail_fast && !summary.failures.is_empty() {
            let first = summary.failures.swap_remove(0);
            return Err(StoreError::Scan { path: first.path, source: Box::new(first.error) });
        }
        Ok(summary)
    }

    /// Forward entries to `tx` until completion, the first fail-fast error,
    /// or until `tx` is dropped.
    pub async fn forward(mut self, tx: mpsc::Sender<Result<Entry>>) {
        while let Some(event) = self.next().await {
            let (item, stop) = match event {
                ScanEvent::Entry(entry) => (Ok(entry), false),
                ScanEvent::Failed(f) => {
                    let err = if self.fail_fast {
                        StoreError::Scan { path: f.path, source: Box::new(f.error) }
                    } else {
                        f.error
                    };
                    (Err(err), self.fail_fast)
                }
            };
            if tx.send(item).await.is_err() || stop {
                return;
            }
        }
    }
}

/// Walk `<root>/<shard>/<record>` and feed every record path to `coordinator`.
///
/// Up to `coordinator.concurrency()` shard directories are listed at once and
/// paths are registered as soon as their directory listing returns.
pub async fn enumerate(fs: Arc<dyn FileSystem>, root: PathBuf, coordinator: ScanCoordinator) {
    let shards = match fs.list(&root).await {
        Ok(shards) => shards,
        Err(e) => {
            let _ = coordinator.report_failure(root, e).await;
            return;
        }
    };

    let mut dirs = shards
        .into_iter()
        .filter(|d| d.is_dir && is_shard_dir_name(&d.name))
        .map(|d| root.join(&d.name));
    // Directories handed to a listing task and not yet handed back.
    let mut outstanding: HashSet<PathBuf> = HashSet::new();
    let mut listings = JoinSet::new();

    loop {
        while listings.len() < coordinator.concurrency() {
            let Some(dir) = dirs.next() else {
                break;
            };
            outstanding.insert(dir.clone());
            let fs = fs.clone();
            listings.spawn(async move {
                let listed = fs.list(&dir).await;
                (dir, listed)
            });
        }

        let Some(joined) = listings.join_next().await else {
            break;
        };
        if coordinator.is_cancelled() {
            listings.abort_all();
            coordinator.no_more_paths();
            return;
        }
        let (dir, listed) = match joined {
            Ok(res) => res,
            Err(e) => {
                error!(error = %e, "shard listing task failed");
                continue;
            }
        };
        outstanding.remove(&dir);
        match listed {
            Ok(files) => {
                for file in files.into_iter().filter(|f| !f.is_dir && is_record_file_name(&f.name)) {
                    if coordinator.add_path(dir.join(&file.name)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = coordinator.report_failure(dir, e).await;
            }
        }
    }

    // Only a panicked listing task leaves its directory behind.
    for dir in outstanding {
        let error = StoreError::Io(io::Error::other("shard listing task failed"));
        let _ = coordinator.report_failure(dir, error).await;
    }
    coordinator.no_more_paths();
}
