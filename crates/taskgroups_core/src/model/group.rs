//! Group and main-group models.
//!
//! # Responsibility
//! - Define the ordered item container (`Group`).
//! - Define the top-level reference list (`MainGroup`).
//!
//! # Invariants
//! - `Group::tasks` order is presentation order and is preserved on save.
//! - `MainGroup::group_ids` holds each group id at most once.

use crate::model::item::{Item, ItemId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task group.
pub type GroupId = Uuid;

/// Stable identifier for a main group.
pub type MainGroupId = Uuid;

/// Named, ordered collection of task items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    /// Display tag chosen by the UI; never interpreted here.
    pub symbol: String,
    pub tasks: Vec<Item>,
}

impl Group {
    /// Creates an empty group with a generated id.
    pub fn new(title: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            symbol: symbol.into(),
            tasks: Vec::new(),
        }
    }

    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.tasks.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: ItemId) -> Option<&mut Item> {
        self.tasks.iter_mut().find(|item| item.id == item_id)
    }

    /// Number of completed items.
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|item| item.is_completed).count()
    }

    /// Moves the item at `from` so that it ends up at index `to`.
    ///
    /// Returns `false` and leaves the list untouched when either index is out
    /// of range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tasks.len() || to >= self.tasks.len() {
            return false;
        }
        let item = self.tasks.remove(from);
        self.tasks.insert(to, item);
        true
    }

    /// Sorts items from high to low priority, keeping the relative order of
    /// equal priorities.
    pub fn sort_by_priority(&mut self) {
        self.tasks
            .sort_by(|left, right| right.priority.cmp(&left.priority));
    }
}

/// Top-level node referencing groups by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainGroup {
    pub id: MainGroupId,
    pub title: String,
    pub symbol: String,
    pub group_ids: Vec<GroupId>,
}

impl MainGroup {
    /// Creates a main group with a generated id and the given references.
    pub fn new(
        title: impl Into<String>,
        symbol: impl Into<String>,
        group_ids: Vec<GroupId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            symbol: symbol.into(),
            group_ids,
        }
    }

    pub fn references(&self, group_id: GroupId) -> bool {
        self.group_ids.contains(&group_id)
    }

    /// Appends `group_id` unless it is already referenced.
    ///
    /// Returns whether the list changed.
    pub fn attach(&mut self, group_id: GroupId) -> bool {
        if self.references(group_id) {
            return false;
        }
        self.group_ids.push(group_id);
        true
    }

    /// Removes every reference to `group_id`.
    pub fn detach(&mut self, group_id: GroupId) -> bool {
        let before = self.group_ids.len();
        self.group_ids.retain(|id| *id != group_id);
        before != self.group_ids.len()
    }
}

/// Both flat collections of one workspace scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    pub groups: Vec<Group>,
    pub mains: Vec<MainGroup>,
}

impl Collections {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.mains.is_empty()
    }
}
