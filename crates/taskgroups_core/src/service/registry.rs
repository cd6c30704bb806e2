//! Per-scope lifecycle managers sharing one save worker.
//!
//! # Invariants
//! - Exactly one manager exists per scope; each sits behind its own lock, so
//!   commands on one scope serialize while other scopes run independently.
//! - The registry map lock is only held to look up or insert a manager, or
//!   to apply a tier change, so every manager ends on the latest tier.
//! - `shutdown` drains every queued save before returning.

use crate::model::scope::ScopeKey;
use crate::repo::blob_repo::{BlobRepository, PersistError, PersistResult};
use crate::repo::collections_repo::CollectionsRepository;
use crate::service::lifecycle::LifecycleManager;
use crate::service::quota::Tier;
use crate::service::save_worker::{SaveQueue, SaveWorker, SnapshotSink};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Manager type handed out by the registry.
pub type ScopeManager = LifecycleManager<SaveQueue>;

/// Shared handle to one scope's manager.
pub type SharedScopeManager = Arc<Mutex<ScopeManager>>;

/// Owner of all open workspaces of a process.
pub struct WorkspaceRegistry {
    repo: CollectionsRepository,
    worker: Mutex<Option<SaveWorker>>,
    queue: SaveQueue,
    tier: Mutex<Tier>,
    scopes: Mutex<HashMap<ScopeKey, SharedScopeManager>>,
}

impl WorkspaceRegistry {
    /// Starts the save worker on top of `blobs`.
    pub fn start(blobs: Arc<dyn BlobRepository>) -> PersistResult<Self> {
        let repo = CollectionsRepository::new(blobs);
        let worker = SaveWorker::start(repo.clone())?;
        let queue = worker.queue();
        Ok(Self {
            repo,
            worker: Mutex::new(Some(worker)),
            queue,
            tier: Mutex::new(Tier::default()),
            scopes: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the manager of `scope`, loading it on first access.
    pub fn workspace(&self, scope: &ScopeKey) -> PersistResult<SharedScopeManager> {
        if let Some(existing) = lock(&self.scopes)?.get(scope) {
            return Ok(Arc::clone(existing));
        }

        let mut manager =
            LifecycleManager::open(scope.clone(), &self.repo, self.queue.clone(), self.tier()?);
        let mut scopes = lock(&self.scopes)?;
        // Re-read under the map lock: a `set_tier` that ran during the load
        // could not see this manager yet.
        manager.set_tier(self.tier()?);
        // A concurrent first access may have won; keep its manager.
        let shared = scopes
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(manager)));
        Ok(Arc::clone(shared))
    }

    /// Runs `f` with exclusive access to one scope's manager.
    pub fn with_workspace<T>(
        &self,
        scope: &ScopeKey,
        f: impl FnOnce(&mut ScopeManager) -> T,
    ) -> PersistResult<T> {
        let shared = self.workspace(scope)?;
        let mut manager = lock(&shared)?;
        Ok(f(&mut manager))
    }

    pub fn tier(&self) -> PersistResult<Tier> {
        Ok(*lock(&self.tier)?)
    }

    /// Updates the tier flag for all open and future workspaces.
    pub fn set_tier(&self, tier: Tier) -> PersistResult<()> {
        // Lock order is scopes, then tier, as in `workspace`.
        let scopes = lock(&self.scopes)?;
        *lock(&self.tier)? = tier;
        for shared in scopes.values() {
            lock(shared)?.set_tier(tier);
        }
        drop(scopes);
        info!(
            "event=tier_change module=service status=ok premium={}",
            tier.is_premium()
        );
        Ok(())
    }

    /// Waits for every snapshot submitted so far.
    pub fn flush_all(&self) -> PersistResult<()> {
        self.queue.flush()
    }

    /// Flushes and stops the save worker. Later saves fail with
    /// `WorkerUnavailable` and leave managers marked unsaved.
    pub fn shutdown(&self) -> PersistResult<()> {
        match lock(&self.worker)?.take() {
            Some(worker) => worker.shutdown(),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> PersistResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| PersistError::LockPoisoned)
}
