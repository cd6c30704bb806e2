//! Scope-partitioned load/save of group collections.
//!
//! # Responsibility
//! - Encode both collections as JSON records `groups:<scope>` and
//!   `mains:<scope>`.
//! - Recover from missing or malformed records without failing the caller.
//! - Repair reference integrity of loaded data.
//!
//! # Invariants
//! - Both records of one save are written in a single atomic blob write.
//! - `load` after `save` returns structurally equal collections.
//! - Loaded main groups only reference loaded groups, each at most once.

use crate::model::group::{Collections, Group, MainGroup};
use crate::model::scope::ScopeKey;
use crate::repo::blob_repo::{BlobRepository, PersistResult};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Collections persistence on top of a shared blob repository.
#[derive(Clone)]
pub struct CollectionsRepository {
    blobs: Arc<dyn BlobRepository>,
}

impl CollectionsRepository {
    pub fn new(blobs: Arc<dyn BlobRepository>) -> Self {
        Self { blobs }
    }

    /// Loads both collections of `scope`.
    ///
    /// Missing, unreadable or malformed records are replaced by empty
    /// collections and reported as `decode_error` log events.
    pub fn load(&self, scope: &ScopeKey) -> Collections {
        let started_at = Instant::now();
        let groups: Vec<Group> = self.load_record(scope, &scope.groups_key());
        let mains: Vec<MainGroup> = self.load_record(scope, &scope.mains_key());

        let collections = repair_integrity(scope, Collections { groups, mains });
        info!(
            "event=store_load module=repo status=ok scope={} groups={} mains={} duration_ms={}",
            scope,
            collections.groups.len(),
            collections.mains.len(),
            started_at.elapsed().as_millis()
        );
        collections
    }

    /// Saves both collections of `scope` in one atomic write.
    pub fn save(&self, scope: &ScopeKey, collections: &Collections) -> PersistResult<()> {
        let started_at = Instant::now();
        let entries = vec![
            (scope.groups_key(), serde_json::to_vec(&collections.groups)?),
            (scope.mains_key(), serde_json::to_vec(&collections.mains)?),
        ];

        match self.blobs.write_blobs(&entries) {
            Ok(()) => {
                info!(
                    "event=save module=repo status=ok scope={} groups={} mains={} duration_ms={}",
                    scope,
                    collections.groups.len(),
                    collections.mains.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=save module=repo status=error scope={} error_code=write_failed error={}",
                    scope, err
                );
                Err(err)
            }
        }
    }

    fn load_record<T: DeserializeOwned>(&self, scope: &ScopeKey, key: &str) -> Vec<T> {
        let bytes = match self.blobs.read_blob(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(err) => {
                error!(
                    "event=decode_error module=repo status=error scope={} key={} error_code=read_failed error={}",
                    scope, key, err
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(records) => records,
            Err(err) => {
                error!(
                    "event=decode_error module=repo status=error scope={} key={} error_code=malformed_record bytes={} error={}",
                    scope,
                    key,
                    bytes.len(),
                    err
                );
                Vec::new()
            }
        }
    }
}

/// Drops duplicate ids, duplicate references and dangling references.
pub fn repair_integrity(scope: &ScopeKey, collections: Collections) -> Collections {
    let loaded_groups = collections.groups.len();
    let mut seen_groups = HashSet::new();
    let groups: Vec<Group> = collections
        .groups
        .into_iter()
        .filter(|group| seen_groups.insert(group.id))
        .collect();

    let mut seen_mains = HashSet::new();
    let mut dropped_refs = 0usize;
    let mut duplicate_mains = 0usize;
    let mut mains = Vec::with_capacity(collections.mains.len());
    for mut main in collections.mains {
        if !seen_mains.insert(main.id) {
            duplicate_mains += 1;
            continue;
        }
        let before = main.group_ids.len();
        let mut seen_refs = HashSet::new();
        main.group_ids
            .retain(|group_id| seen_groups.contains(group_id) && seen_refs.insert(*group_id));
        dropped_refs += before - main.group_ids.len();
        mains.push(main);
    }

    let duplicate_groups = loaded_groups - groups.len();
    if dropped_refs > 0 || duplicate_mains > 0 || duplicate_groups > 0 {
        warn!(
            "event=integrity_repair module=repo status=ok scope={} dropped_refs={} duplicate_groups={} duplicate_mains={}",
            scope, dropped_refs, duplicate_groups, duplicate_mains
        );
    }

    Collections { groups, mains }
}

#[cfg(test)]
mod tests {
    use super::{repair_integrity, CollectionsRepository};
    use crate::model::group::{Collections, Group, MainGroup};
    use crate::model::scope::ScopeKey;
    use crate::repo::blob_repo::{BlobRepository, MemoryBlobRepository};
    use std::sync::Arc;
    use uuid::Uuid;

    fn scope() -> ScopeKey {
        ScopeKey::parse("unit").unwrap()
    }

    #[test]
    fn repair_drops_dangling_and_duplicate_references() {
        let group = Group::new("Kept", "star");
        let dangling = Uuid::new_v4();
        let main = MainGroup::new("M", "folder", vec![group.id, dangling, group.id]);

        let repaired = repair_integrity(
            &scope(),
            Collections {
                groups: vec![group.clone()],
                mains: vec![main],
            },
        );

        assert_eq!(repaired.mains[0].group_ids, vec![group.id]);
    }

    #[test]
    fn repair_keeps_first_of_duplicate_ids() {
        let first = Group::new("First", "star");
        let mut shadow = first.clone();
        shadow.title = "Shadow".to_string();
        let main = MainGroup::new("M", "folder", Vec::new());
        let mut main_shadow = main.clone();
        main_shadow.title = "Shadow".to_string();

        let repaired = repair_integrity(
            &scope(),
            Collections {
                groups: vec![first, shadow],
                mains: vec![main, main_shadow],
            },
        );

        assert_eq!(repaired.groups.len(), 1);
        assert_eq!(repaired.groups[0].title, "First");
        assert_eq!(repaired.mains.len(), 1);
        assert_eq!(repaired.mains[0].title, "M");
    }

    #[test]
    fn malformed_groups_record_loads_empty_and_drops_its_references() {
        let blobs = Arc::new(MemoryBlobRepository::new());
        let repo = CollectionsRepository::new(blobs.clone());
        let group = Group::new("Lost", "star");
        let main = MainGroup::new("M", "folder", vec![group.id]);
        repo.save(
            &scope(),
            &Collections {
                groups: vec![group],
                mains: vec![main.clone()],
            },
        )
        .unwrap();

        blobs.put_raw("groups:unit", b"{not json".to_vec()).unwrap();

        let loaded = repo.load(&scope());
        assert!(loaded.groups.is_empty());
        assert_eq!(loaded.mains.len(), 1);
        assert_eq!(loaded.mains[0].id, main.id);
        assert!(loaded.mains[0].group_ids.is_empty());
    }

    #[test]
    fn save_writes_both_record_keys() {
        let blobs = Arc::new(MemoryBlobRepository::new());
        let repo = CollectionsRepository::new(blobs.clone());
        repo.save(&scope(), &Collections::default()).unwrap();

        assert_eq!(blobs.read_blob("groups:unit").unwrap().as_deref(), Some(&b"[]"[..]));
        assert_eq!(blobs.read_blob("mains:unit").unwrap().as_deref(), Some(&b"[]"[..]));
    }
}
