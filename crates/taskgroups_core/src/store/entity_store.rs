//! Insertion-ordered entity store for groups and main groups.
//!
//! # Invariants
//! - Iteration order equals insertion order.
//! - Ids are unique per collection; duplicate inserts are rejected.
//! - Removing a missing id is a no-op.

use crate::model::group::{Collections, Group, GroupId, MainGroup, MainGroupId};

/// Authoritative in-memory collections of one workspace scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    groups: Vec<Group>,
    mains: Vec<MainGroup>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from loaded collections, keeping their order.
    pub fn from_collections(collections: Collections) -> Self {
        Self {
            groups: collections.groups,
            mains: collections.mains,
        }
    }

    /// Copies both collections for persistence.
    pub fn snapshot(&self) -> Collections {
        Collections {
            groups: self.groups.clone(),
            mains: self.mains.clone(),
        }
    }

    pub fn list_groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn list_main_groups(&self) -> &[MainGroup] {
        &self.mains
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn main_group_count(&self) -> usize {
        self.mains.len()
    }

    pub fn get_group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn get_main_group(&self, id: MainGroupId) -> Option<&MainGroup> {
        self.mains.iter().find(|main| main.id == id)
    }

    /// Appends a group. Returns `false` when the id is already present.
    #[must_use]
    pub fn insert_group(&mut self, group: Group) -> bool {
        if self.get_group(group.id).is_some() {
            return false;
        }
        self.groups.push(group);
        true
    }

    /// Appends a main group. Returns `false` when the id is already present.
    #[must_use]
    pub fn insert_main_group(&mut self, main: MainGroup) -> bool {
        if self.get_main_group(main.id).is_some() {
            return false;
        }
        self.mains.push(main);
        true
    }

    /// Removes and returns a group, preserving the order of the rest.
    pub fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        let index = self.groups.iter().position(|group| group.id == id)?;
        Some(self.groups.remove(index))
    }

    /// Removes and returns a main group, preserving the order of the rest.
    pub fn remove_main_group(&mut self, id: MainGroupId) -> Option<MainGroup> {
        let index = self.mains.iter().position(|main| main.id == id)?;
        Some(self.mains.remove(index))
    }

    /// Applies `mutator` to one group in place.
    ///
    /// Returns `None` when the group does not exist.
    pub fn update_group<T>(
        &mut self,
        id: GroupId,
        mutator: impl FnOnce(&mut Group) -> T,
    ) -> Option<T> {
        self.groups
            .iter_mut()
            .find(|group| group.id == id)
            .map(mutator)
    }

    /// Applies `mutator` to one main group in place.
    ///
    /// Returns `None` when the main group does not exist.
    pub fn update_main_group<T>(
        &mut self,
        id: MainGroupId,
        mutator: impl FnOnce(&mut MainGroup) -> T,
    ) -> Option<T> {
        self.mains.iter_mut().find(|main| main.id == id).map(mutator)
    }

    /// Applies `mutator` to every main group in order.
    pub fn update_all_main_groups(&mut self, mut mutator: impl FnMut(&mut MainGroup)) {
        for main in &mut self.mains {
            mutator(main);
        }
    }

    /// Returns whether any main group references `group_id`.
    pub fn is_referenced(&self, group_id: GroupId) -> bool {
        self.mains.iter().any(|main| main.references(group_id))
    }

    /// Returns whether every main-group reference resolves to a stored group.
    pub fn references_resolve(&self) -> bool {
        self.mains.iter().all(|main| {
            main.group_ids
                .iter()
                .all(|group_id| self.get_group(*group_id).is_some())
        })
    }
}
