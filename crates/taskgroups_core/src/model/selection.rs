//! Sidebar selection state.

use crate::model::group::GroupId;

/// What the detail pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// One task group.
    Group(GroupId),
    /// Profile page; used when no group is available.
    Profile,
}

impl Selection {
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::Group(id) => Some(*id),
            Self::Profile => None,
        }
    }
}
