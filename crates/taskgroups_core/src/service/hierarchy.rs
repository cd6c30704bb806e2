//! Display hierarchy builder.
//!
//! # Responsibility
//! - Turn the flat group/main-group collections into the sidebar tree.
//!
//! # Invariants
//! - Pure: identical input yields identical output, nothing is mutated.
//! - Unresolved group ids are skipped, never rendered.
//! - A main group without resolvable children still renders as a leaf.

use crate::model::group::{Group, MainGroup};
use crate::model::selection::Selection;
use uuid::Uuid;

/// Read-only node of the display tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNode {
    pub id: Uuid,
    pub title: String,
    pub symbol: String,
    /// What gets selected when this node is activated.
    pub selection: Selection,
    /// `None` for leaves.
    pub children: Option<Vec<DisplayNode>>,
}

impl DisplayNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Builds one node per main group, in main-group order.
pub fn build_tree(mains: &[MainGroup], groups: &[Group]) -> Vec<DisplayNode> {
    mains
        .iter()
        .map(|main| build_main_node(main, groups))
        .collect()
}

fn build_main_node(main: &MainGroup, groups: &[Group]) -> DisplayNode {
    let children: Vec<DisplayNode> = main
        .group_ids
        .iter()
        .filter_map(|group_id| groups.iter().find(|group| group.id == *group_id))
        .map(group_node)
        .collect();

    let selection = children
        .first()
        .map(|child| child.selection)
        .or_else(|| groups.first().map(|group| Selection::Group(group.id)))
        .unwrap_or(Selection::Profile);

    DisplayNode {
        id: main.id,
        title: main.title.clone(),
        symbol: main.symbol.clone(),
        selection,
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    }
}

fn group_node(group: &Group) -> DisplayNode {
    DisplayNode {
        id: group.id,
        title: group.title.clone(),
        symbol: group.symbol.clone(),
        selection: Selection::Group(group.id),
        children: None,
    }
}
