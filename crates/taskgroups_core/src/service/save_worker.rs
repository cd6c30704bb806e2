//! Write-behind save pipeline.
//!
//! # Responsibility
//! - Take collection snapshots off the caller's critical path.
//! - Apply them in submission order on one background thread.
//! - Drain pending work on flush and on shutdown.
//!
//! # Invariants
//! - Snapshots of one scope are written in the order they were submitted.
//! - A failed snapshot is retried on flush unless a newer snapshot of the
//!   same scope replaced it.
//! - Dropping the worker waits for every queued snapshot.
//! - A scope counts as unsaved while one of its snapshots is queued or
//!   awaiting retry.

use crate::model::group::Collections;
use crate::model::scope::ScopeKey;
use crate::repo::blob_repo::{PersistError, PersistResult};
use crate::repo::collections_repo::CollectionsRepository;
use crossbeam::channel::{self, Receiver, Sender};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Destination for snapshots produced by mutations.
pub trait SnapshotSink: Send {
    /// Hands over one full snapshot of `scope`.
    fn submit(&self, scope: &ScopeKey, snapshot: Collections) -> PersistResult<()>;
    /// Blocks until previously submitted snapshots are durable.
    fn flush(&self) -> PersistResult<()>;
    /// Whether an accepted snapshot of `scope` is not durable yet.
    fn has_pending(&self, _scope: &ScopeKey) -> bool {
        false
    }
}

/// Synchronous sink: every submit is a blocking save.
impl SnapshotSink for CollectionsRepository {
    fn submit(&self, scope: &ScopeKey, snapshot: Collections) -> PersistResult<()> {
        self.save(scope, &snapshot)
    }

    fn flush(&self) -> PersistResult<()> {
        Ok(())
    }
}

enum SaveCommand {
    Save {
        scope: ScopeKey,
        snapshot: Collections,
    },
    Flush(Sender<PersistResult<()>>),
    Shutdown,
}

/// Per-scope bookkeeping of snapshots that are not durable yet.
#[derive(Default)]
struct Outstanding {
    queued: BTreeMap<ScopeKey, usize>,
    failed: BTreeSet<ScopeKey>,
}

type SharedOutstanding = Arc<Mutex<Outstanding>>;

impl Outstanding {
    fn enqueue(&mut self, scope: &ScopeKey) {
        *self.queued.entry(scope.clone()).or_insert(0) += 1;
    }

    fn dequeue(&mut self, scope: &ScopeKey) {
        if let Some(count) = self.queued.get_mut(scope) {
            *count -= 1;
            if *count == 0 {
                self.queued.remove(scope);
            }
        }
    }

    fn contains(&self, scope: &ScopeKey) -> bool {
        self.queued.contains_key(scope) || self.failed.contains(scope)
    }
}

fn with_outstanding(outstanding: &SharedOutstanding, f: impl FnOnce(&mut Outstanding)) {
    match outstanding.lock() {
        Ok(mut guard) => f(&mut guard),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

/// Cloneable submission handle of a running [`SaveWorker`].
#[derive(Clone)]
pub struct SaveQueue {
    tx: Sender<SaveCommand>,
    outstanding: SharedOutstanding,
}

impl SnapshotSink for SaveQueue {
    fn submit(&self, scope: &ScopeKey, snapshot: Collections) -> PersistResult<()> {
        with_outstanding(&self.outstanding, |o| o.enqueue(scope));
        let sent = self.tx.send(SaveCommand::Save {
            scope: scope.clone(),
            snapshot,
        });
        if sent.is_err() {
            with_outstanding(&self.outstanding, |o| o.dequeue(scope));
            return Err(PersistError::WorkerUnavailable);
        }
        Ok(())
    }

    fn flush(&self) -> PersistResult<()> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.tx
            .send(SaveCommand::Flush(reply_tx))
            .map_err(|_| PersistError::WorkerUnavailable)?;
        reply_rx
            .recv()
            .map_err(|_| PersistError::WorkerUnavailable)?
    }

    fn has_pending(&self, scope: &ScopeKey) -> bool {
        match self.outstanding.lock() {
            Ok(guard) => guard.contains(scope),
            Err(poisoned) => poisoned.into_inner().contains(scope),
        }
    }
}

/// Background thread owning the save order.
pub struct SaveWorker {
    queue: SaveQueue,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    /// Spawns the worker thread.
    pub fn start(repo: CollectionsRepository) -> PersistResult<Self> {
        let (tx, rx) = channel::unbounded();
        let outstanding = SharedOutstanding::default();
        let tracked = Arc::clone(&outstanding);
        let handle = thread::Builder::new()
            .name("taskgroups-save".to_string())
            .spawn(move || run_save_loop(repo, rx, tracked))
            .map_err(|err| {
                error!(
                    "event=save_worker module=service status=error error_code=spawn_failed error={}",
                    err
                );
                PersistError::WorkerUnavailable
            })?;
        info!("event=save_worker module=service status=start");
        Ok(Self {
            queue: SaveQueue { tx, outstanding },
            handle: Some(handle),
        })
    }

    /// Returns a handle for submitting snapshots.
    pub fn queue(&self) -> SaveQueue {
        self.queue.clone()
    }

    /// Flushes pending work, then stops and joins the thread.
    pub fn shutdown(mut self) -> PersistResult<()> {
        let flushed = self.queue.flush();
        self.stop();
        flushed
    }

    fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.queue.tx.send(SaveCommand::Shutdown);
        if handle.join().is_err() {
            error!("event=save_worker module=service status=error error_code=worker_panicked");
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_save_loop(
    repo: CollectionsRepository,
    rx: Receiver<SaveCommand>,
    outstanding: SharedOutstanding,
) {
    let mut failed: BTreeMap<ScopeKey, Collections> = BTreeMap::new();
    while let Ok(command) = rx.recv() {
        match command {
            SaveCommand::Save { scope, snapshot } => {
                failed.remove(&scope);
                let saved = repo.save(&scope, &snapshot).is_ok();
                with_outstanding(&outstanding, |o| {
                    o.dequeue(&scope);
                    if saved {
                        o.failed.remove(&scope);
                    } else {
                        o.failed.insert(scope.clone());
                    }
                });
                if !saved {
                    failed.insert(scope, snapshot);
                }
            }
            SaveCommand::Flush(reply) => {
                retry_failed(&repo, &mut failed, &outstanding);
                let result = if failed.is_empty() {
                    Ok(())
                } else {
                    Err(PersistError::PendingFailures(failed.len()))
                };
                let _ = reply.send(result);
            }
            SaveCommand::Shutdown => break,
        }
    }

    retry_failed(&repo, &mut failed, &outstanding);
    if failed.is_empty() {
        info!("event=save_worker module=service status=ok action=stopped");
    } else {
        error!(
            "event=save_worker module=service status=error action=stopped unsaved_scopes={}",
            failed.len()
        );
    }
}

fn retry_failed(
    repo: &CollectionsRepository,
    failed: &mut BTreeMap<ScopeKey, Collections>,
    outstanding: &SharedOutstanding,
) {
    if failed.is_empty() {
        return;
    }
    warn!(
        "event=save_worker module=service status=start action=retry scopes={}",
        failed.len()
    );
    failed.retain(|scope, snapshot| repo.save(scope, snapshot).is_err());
    with_outstanding(outstanding, |o| {
        o.failed.retain(|scope| failed.contains_key(scope));
    });
}

#[cfg(test)]
mod tests {
    use super::{SaveWorker, SnapshotSink};
    use crate::model::group::{Collections, Group};
    use crate::model::scope::ScopeKey;
    use crate::repo::blob_repo::{MemoryBlobRepository, PersistError};
    use crate::repo::collections_repo::CollectionsRepository;
    use std::sync::Arc;

    fn snapshot_with(titles: &[&str]) -> Collections {
        Collections {
            groups: titles.iter().map(|t| Group::new(*t, "star")).collect(),
            mains: Vec::new(),
        }
    }

    #[test]
    fn snapshots_land_in_submission_order() {
        let blobs = Arc::new(MemoryBlobRepository::new());
        let repo = CollectionsRepository::new(blobs);
        let worker = SaveWorker::start(repo.clone()).unwrap();
        let queue = worker.queue();
        let scope = ScopeKey::parse("ordered").unwrap();

        for count in 1..=20 {
            let titles: Vec<String> = (0..count).map(|i| format!("g{i}")).collect();
            let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
            queue.submit(&scope, snapshot_with(&refs)).unwrap();
        }
        queue.flush().unwrap();

        assert_eq!(repo.load(&scope).groups.len(), 20);
    }

    #[test]
    fn failed_save_is_retried_on_flush() {
        let blobs = Arc::new(MemoryBlobRepository::new());
        let repo = CollectionsRepository::new(blobs.clone());
        let worker = SaveWorker::start(repo.clone()).unwrap();
        let queue = worker.queue();
        let scope = ScopeKey::parse("retry").unwrap();

        blobs.set_fail_writes(true);
        queue.submit(&scope, snapshot_with(&["kept"])).unwrap();
        let err = queue.flush().unwrap_err();
        assert!(matches!(err, PersistError::PendingFailures(1)));
        assert!(repo.load(&scope).groups.is_empty());

        blobs.set_fail_writes(false);
        queue.flush().unwrap();
        assert_eq!(repo.load(&scope).groups[0].title, "kept");
    }

    #[test]
    fn pending_state_tracks_failed_scope_until_retry_succeeds() {
        let blobs = Arc::new(MemoryBlobRepository::new());
        let repo = CollectionsRepository::new(blobs.clone());
        let worker = SaveWorker::start(repo).unwrap();
        let queue = worker.queue();
        let broken = ScopeKey::parse("broken").unwrap();
        let other = ScopeKey::parse("other").unwrap();

        blobs.set_fail_writes(true);
        queue.submit(&broken, snapshot_with(&["x"])).unwrap();
        assert!(queue.flush().is_err());
        assert!(queue.has_pending(&broken));
        assert!(!queue.has_pending(&other));

        blobs.set_fail_writes(false);
        queue.flush().unwrap();
        assert!(!queue.has_pending(&broken));
    }

    #[test]
    fn shutdown_drains_queue_and_rejects_late_submits() {
        let blobs = Arc::new(MemoryBlobRepository::new());
        let repo = CollectionsRepository::new(blobs);
        let worker = SaveWorker::start(repo.clone()).unwrap();
        let queue = worker.queue();
        let scope = ScopeKey::parse("drain").unwrap();

        queue.submit(&scope, snapshot_with(&["a", "b"])).unwrap();
        worker.shutdown().unwrap();

        assert_eq!(repo.load(&scope).groups.len(), 2);
        let err = queue.submit(&scope, snapshot_with(&["late"])).unwrap_err();
        assert!(matches!(err, PersistError::WorkerUnavailable));
    }
}
