//! Group lifecycle use-case service.
//!
//! # Responsibility
//! - Create groups and resolve their parent attachment.
//! - Delete groups and main groups, cascading to orphaned groups.
//! - Keep the current selection valid and trigger saves after mutations.
//!
//! # Invariants
//! - Every main-group reference resolves to a stored group after every
//!   operation.
//! - A refused `add_group` (quota, title, parent) mutates nothing.
//! - A group is never created without a parent main group.
//! - Missing ids turn commands into no-ops instead of errors.

use crate::model::group::{Group, GroupId, MainGroup, MainGroupId};
use crate::model::item::{Item, ItemId, Priority};
use crate::model::scope::ScopeKey;
use crate::model::selection::Selection;
use crate::repo::blob_repo::PersistResult;
use crate::repo::collections_repo::CollectionsRepository;
use crate::service::hierarchy::{build_tree, DisplayNode};
use crate::service::quota::{self, QuotaKind, Tier};
use crate::service::save_worker::SnapshotSink;
use crate::store::entity_store::EntityStore;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Title of the main group created by [`AttachChoice::Auto`].
pub const DEFAULT_MAIN_GROUP_TITLE: &str = "My Groups";

/// Symbol used for implicit parents and blank parent symbols.
pub const DEFAULT_MAIN_GROUP_SYMBOL: &str = "folder";

/// Where a newly created group gets attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachChoice {
    /// Append to this existing main group.
    Existing(MainGroupId),
    /// Create a new main group holding only the new group.
    NewParent { title: String, symbol: String },
    /// Append to the first main group, creating a default one if none exist.
    Auto,
}

/// Errors from lifecycle commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Tier quota reached; nothing was created.
    QuotaExceeded(QuotaKind),
    /// Title is blank after trim.
    InvalidTitle,
    /// `AttachChoice::Existing` names a main group that does not exist.
    MainGroupNotFound(MainGroupId),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded(QuotaKind::Group) => write!(f, "group quota exceeded"),
            Self::QuotaExceeded(QuotaKind::MainGroup) => {
                write!(f, "main group quota exceeded")
            }
            Self::InvalidTitle => write!(f, "title must not be blank"),
            Self::MainGroupNotFound(id) => write!(f, "main group not found: {id}"),
        }
    }
}

impl Error for LifecycleError {}

/// Single-writer owner of one scope's collections.
pub struct LifecycleManager<S: SnapshotSink> {
    scope: ScopeKey,
    store: EntityStore,
    selection: Option<Selection>,
    tier: Tier,
    sink: S,
    revision: u64,
    dirty: bool,
}

impl<S: SnapshotSink> LifecycleManager<S> {
    /// Loads `scope` from `repo` and derives the initial selection.
    ///
    /// Initial selection is the first main group's first group, else any
    /// group, else the profile page.
    pub fn open(scope: ScopeKey, repo: &CollectionsRepository, sink: S, tier: Tier) -> Self {
        let store = EntityStore::from_collections(repo.load(&scope));
        Self::with_store(scope, store, sink, tier)
    }

    /// Wraps an already populated store.
    pub fn with_store(scope: ScopeKey, store: EntityStore, sink: S, tier: Tier) -> Self {
        let mut manager = Self {
            scope,
            store,
            selection: None,
            tier,
            sink,
            revision: 0,
            dirty: false,
        };
        manager.selection = Some(manager.initial_selection());
        manager
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Updates the tier consumed by quota checks.
    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier;
    }

    /// Increases on every applied mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns whether the current state may not be durable: the last
    /// submit failed, or the sink still holds a queued or failed snapshot.
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty || self.sink.has_pending(&self.scope)
    }

    /// Pre-flight check for group creation.
    pub fn can_add_group(&self) -> bool {
        quota::can_add_group(self.store.group_count(), self.tier)
    }

    /// Pre-flight check for main-group creation.
    pub fn can_add_main_group(&self) -> bool {
        quota::can_add_main_group(self.store.main_group_count(), self.tier)
    }

    /// Builds the display tree for the current state.
    pub fn tree(&self) -> Vec<DisplayNode> {
        build_tree(self.store.list_main_groups(), self.store.list_groups())
    }

    /// Creates a group and attaches it according to `attach`.
    ///
    /// All checks run before any insert, so an error leaves the store as it
    /// was. Quota is checked before the titles. On success the new group
    /// becomes the selection.
    pub fn add_group(
        &mut self,
        title: &str,
        symbol: &str,
        attach: AttachChoice,
    ) -> Result<GroupId, LifecycleError> {
        if !self.can_add_group() {
            return Err(self.quota_denied(QuotaKind::Group));
        }
        let title = normalize_title(title)?;
        match &attach {
            AttachChoice::Existing(main_id) => {
                if self.store.get_main_group(*main_id).is_none() {
                    return Err(LifecycleError::MainGroupNotFound(*main_id));
                }
            }
            AttachChoice::NewParent { title, .. } => {
                if !self.can_add_main_group() {
                    return Err(self.quota_denied(QuotaKind::MainGroup));
                }
                normalize_title(title)?;
            }
            AttachChoice::Auto => {}
        }

        let group = Group::new(title, symbol);
        let group_id = group.id;
        self.insert_group(group);

        let attached_to = match attach {
            AttachChoice::Existing(main_id) => {
                self.store
                    .update_main_group(main_id, |main| main.attach(group_id));
                main_id
            }
            AttachChoice::NewParent { title, symbol } => {
                let symbol = if symbol.trim().is_empty() {
                    DEFAULT_MAIN_GROUP_SYMBOL.to_string()
                } else {
                    symbol
                };
                self.insert_main_group(MainGroup::new(title.trim(), symbol, vec![group_id]))
            }
            AttachChoice::Auto => match self.store.list_main_groups().first().map(|m| m.id) {
                Some(first_id) => {
                    self.store
                        .update_main_group(first_id, |main| main.attach(group_id));
                    first_id
                }
                None => self.insert_main_group(MainGroup::new(
                    DEFAULT_MAIN_GROUP_TITLE,
                    DEFAULT_MAIN_GROUP_SYMBOL,
                    vec![group_id],
                )),
            },
        };

        info!(
            "event=group_add module=service status=ok scope={} group={} main={} groups={} mains={}",
            self.scope,
            group_id,
            attached_to,
            self.store.group_count(),
            self.store.main_group_count()
        );
        self.selection = Some(Selection::Group(group_id));
        self.commit();
        Ok(group_id)
    }

    /// Deletes one group, unlinking it from every main group.
    ///
    /// Returns `false` when the group does not exist.
    pub fn delete_group(&mut self, group_id: GroupId) -> bool {
        if !self.remove_group_unsaved(group_id) {
            return false;
        }
        self.ensure_selection();
        info!(
            "event=group_delete module=service status=ok scope={} group={} groups={}",
            self.scope,
            group_id,
            self.store.group_count()
        );
        self.commit();
        true
    }

    /// Deletes one main group and every group no other main group references.
    ///
    /// Returns `false` when the main group does not exist.
    pub fn delete_main_group(&mut self, main_id: MainGroupId) -> bool {
        let Some(removed) = self.store.remove_main_group(main_id) else {
            return false;
        };

        let mut cascaded = 0usize;
        for group_id in removed.group_ids {
            if self.store.is_referenced(group_id) {
                continue;
            }
            if self.remove_group_unsaved(group_id) {
                cascaded += 1;
            }
        }
        self.ensure_selection();

        info!(
            "event=main_group_delete module=service status=ok scope={} main={} cascaded_groups={}",
            self.scope, main_id, cascaded
        );
        self.commit();
        true
    }

    /// Renames a group. Returns `Ok(false)` when it does not exist.
    pub fn rename_group(&mut self, group_id: GroupId, title: &str) -> Result<bool, LifecycleError> {
        let title = normalize_title(title)?;
        Ok(self.mutate_group(group_id, |group| group.title = title))
    }

    /// Renames a main group. Returns `Ok(false)` when it does not exist.
    pub fn rename_main_group(
        &mut self,
        main_id: MainGroupId,
        title: &str,
    ) -> Result<bool, LifecycleError> {
        let title = normalize_title(title)?;
        let renamed = self
            .store
            .update_main_group(main_id, |main| main.title = title)
            .is_some();
        if renamed {
            self.commit();
        }
        Ok(renamed)
    }

    pub fn set_group_symbol(&mut self, group_id: GroupId, symbol: &str) -> bool {
        let symbol = symbol.to_string();
        self.mutate_group(group_id, |group| group.symbol = symbol)
    }

    /// Appends an empty item to a group.
    pub fn add_item(&mut self, group_id: GroupId) -> Option<ItemId> {
        let item = Item::new();
        let item_id = item.id;
        self.mutate_group(group_id, |group| group.tasks.push(item))
            .then_some(item_id)
    }

    pub fn set_item_title(&mut self, group_id: GroupId, item_id: ItemId, title: &str) -> bool {
        let title = title.to_string();
        self.mutate_item(group_id, item_id, |item| item.title = title)
    }

    pub fn toggle_item_completed(&mut self, group_id: GroupId, item_id: ItemId) -> bool {
        self.mutate_item(group_id, item_id, |item| {
            item.is_completed = !item.is_completed
        })
    }

    pub fn set_item_priority(
        &mut self,
        group_id: GroupId,
        item_id: ItemId,
        priority: Priority,
    ) -> bool {
        self.mutate_item(group_id, item_id, |item| item.priority = priority)
    }

    /// Replaces (or clears with `None`) the annotation blob of one item.
    pub fn set_item_annotation(
        &mut self,
        group_id: GroupId,
        item_id: ItemId,
        blob: Option<Vec<u8>>,
    ) -> bool {
        self.mutate_item(group_id, item_id, |item| item.annotation_blob = blob)
    }

    pub fn item_annotation(&self, group_id: GroupId, item_id: ItemId) -> Option<&[u8]> {
        self.store
            .get_group(group_id)?
            .item(item_id)?
            .annotation_blob
            .as_deref()
    }

    pub fn delete_item(&mut self, group_id: GroupId, item_id: ItemId) -> bool {
        let removed = self
            .store
            .update_group(group_id, |group| {
                let before = group.tasks.len();
                group.tasks.retain(|item| item.id != item_id);
                before != group.tasks.len()
            })
            .unwrap_or(false);
        if removed {
            self.commit();
        }
        removed
    }

    /// Moves the item at `from` to index `to` within one group.
    pub fn move_item(&mut self, group_id: GroupId, from: usize, to: usize) -> bool {
        let moved = self
            .store
            .update_group(group_id, |group| group.move_item(from, to))
            .unwrap_or(false);
        if moved {
            self.commit();
        }
        moved
    }

    /// Reorders a group's items from high to low priority.
    pub fn sort_items_by_priority(&mut self, group_id: GroupId) -> bool {
        self.mutate_group(group_id, Group::sort_by_priority)
    }

    /// Changes the selection. Selecting a missing group is a no-op.
    pub fn select(&mut self, selection: Selection) -> bool {
        if let Selection::Group(group_id) = selection {
            if self.store.get_group(group_id).is_none() {
                return false;
            }
        }
        self.selection = Some(selection);
        true
    }

    /// Submits the current state again, e.g. after a failed write.
    pub fn save_now(&mut self) -> PersistResult<()> {
        self.persist()?;
        let flushed = self.sink.flush();
        self.dirty = flushed.is_err();
        flushed
    }

    /// Waits until submitted snapshots are durable.
    pub fn flush(&self) -> PersistResult<()> {
        self.sink.flush()
    }

    fn insert_group(&mut self, group: Group) {
        let group_id = group.id;
        if !self.store.insert_group(group) {
            warn!(
                "event=group_add module=service status=error scope={} group={} error_code=duplicate_id",
                self.scope, group_id
            );
        }
    }

    fn insert_main_group(&mut self, main: MainGroup) -> MainGroupId {
        let main_id = main.id;
        if !self.store.insert_main_group(main) {
            warn!(
                "event=group_add module=service status=error scope={} main={} error_code=duplicate_id",
                self.scope, main_id
            );
        }
        main_id
    }

    /// Unlinks and removes one group, clearing the selection if it pointed
    /// at it. Does not save.
    fn remove_group_unsaved(&mut self, group_id: GroupId) -> bool {
        if self.store.get_group(group_id).is_none() {
            return false;
        }
        if self.selection == Some(Selection::Group(group_id)) {
            self.selection = None;
        }
        self.store.update_all_main_groups(|main| {
            main.detach(group_id);
        });
        self.store.remove_group(group_id).is_some()
    }

    /// Re-derives a cleared or stale selection: any remaining group, else
    /// the profile page.
    fn ensure_selection(&mut self) {
        let stale = match self.selection {
            None => true,
            Some(Selection::Group(group_id)) => self.store.get_group(group_id).is_none(),
            Some(Selection::Profile) => false,
        };
        if stale {
            self.selection = Some(self.fallback_selection());
        }
    }

    fn fallback_selection(&self) -> Selection {
        self.store
            .list_groups()
            .first()
            .map_or(Selection::Profile, |group| Selection::Group(group.id))
    }

    fn initial_selection(&self) -> Selection {
        self.store
            .list_main_groups()
            .first()
            .and_then(|main| main.group_ids.first())
            .filter(|group_id| self.store.get_group(**group_id).is_some())
            .map_or_else(|| self.fallback_selection(), |id| Selection::Group(*id))
    }

    fn mutate_group(&mut self, group_id: GroupId, mutator: impl FnOnce(&mut Group)) -> bool {
        let applied = self.store.update_group(group_id, mutator).is_some();
        if applied {
            self.commit();
        }
        applied
    }

    fn mutate_item(
        &mut self,
        group_id: GroupId,
        item_id: ItemId,
        mutator: impl FnOnce(&mut Item),
    ) -> bool {
        let applied = self
            .store
            .update_group(group_id, |group| group.item_mut(item_id).map(mutator).is_some())
            .unwrap_or(false);
        if applied {
            self.commit();
        }
        applied
    }

    fn quota_denied(&self, kind: QuotaKind) -> LifecycleError {
        warn!(
            "event=quota_denied module=service status=error scope={} kind={:?} groups={} mains={}",
            self.scope,
            kind,
            self.store.group_count(),
            self.store.main_group_count()
        );
        LifecycleError::QuotaExceeded(kind)
    }

    fn commit(&mut self) {
        self.revision += 1;
        // Failures stay visible through `has_unsaved_changes`.
        let _ = self.persist();
    }

    fn persist(&mut self) -> PersistResult<()> {
        let submitted = self.sink.submit(&self.scope, self.store.snapshot());
        self.dirty = submitted.is_err();
        if let Err(err) = &submitted {
            error!(
                "event=save module=service status=error scope={} revision={} error={}",
                self.scope, self.revision, err
            );
        }
        submitted
    }
}

fn normalize_title(value: &str) -> Result<String, LifecycleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_title, AttachChoice, LifecycleError, LifecycleManager};
    use crate::model::scope::ScopeKey;
    use crate::model::selection::Selection;
    use crate::repo::blob_repo::MemoryBlobRepository;
    use crate::repo::collections_repo::CollectionsRepository;
    use crate::service::quota::{QuotaKind, Tier};
    use crate::store::entity_store::EntityStore;
    use std::sync::Arc;

    fn manager(tier: Tier) -> LifecycleManager<CollectionsRepository> {
        let repo = CollectionsRepository::new(Arc::new(MemoryBlobRepository::new()));
        LifecycleManager::with_store(
            ScopeKey::parse("unit").unwrap(),
            EntityStore::new(),
            repo,
            tier,
        )
    }

    #[test]
    fn normalize_title_trims_and_rejects_blank() {
        assert_eq!(normalize_title("  Work ").unwrap(), "Work");
        assert_eq!(normalize_title(" \n"), Err(LifecycleError::InvalidTitle));
    }

    #[test]
    fn empty_store_selects_profile() {
        let manager = manager(Tier::Free);
        assert_eq!(manager.selection(), Some(Selection::Profile));
        assert_eq!(manager.revision(), 0);
    }

    #[test]
    fn blank_title_is_rejected_without_mutation() {
        let mut manager = manager(Tier::Free);
        let err = manager.add_group("   ", "star", AttachChoice::Auto).unwrap_err();
        assert_eq!(err, LifecycleError::InvalidTitle);
        assert_eq!(manager.store().group_count(), 0);
        assert_eq!(manager.store().main_group_count(), 0);
    }

    #[test]
    fn new_parent_quota_is_checked_before_group_insert() {
        let mut manager = manager(Tier::Free);
        manager.add_group("First", "star", AttachChoice::Auto).unwrap();

        let err = manager
            .add_group(
                "Second",
                "star",
                AttachChoice::NewParent {
                    title: "Another".to_string(),
                    symbol: "folder".to_string(),
                },
            )
            .unwrap_err();

        assert_eq!(err, LifecycleError::QuotaExceeded(QuotaKind::MainGroup));
        assert_eq!(manager.store().group_count(), 1);
        assert_eq!(manager.store().main_group_count(), 1);
    }

    #[test]
    fn blank_parent_symbol_falls_back_to_folder() {
        let mut manager = manager(Tier::Premium);
        manager
            .add_group(
                "Trips",
                "airplane",
                AttachChoice::NewParent {
                    title: " Travel ".to_string(),
                    symbol: "  ".to_string(),
                },
            )
            .unwrap();

        let main = &manager.store().list_main_groups()[0];
        assert_eq!(main.title, "Travel");
        assert_eq!(main.symbol, "folder");
    }

    #[test]
    fn select_missing_group_is_noop() {
        let mut manager = manager(Tier::Free);
        let before = manager.selection();
        assert!(!manager.select(Selection::Group(uuid::Uuid::new_v4())));
        assert_eq!(manager.selection(), before);
        assert!(manager.select(Selection::Profile));
    }
}
