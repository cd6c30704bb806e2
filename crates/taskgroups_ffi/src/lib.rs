//! Flutter-facing bindings for the TaskGroups core.

pub mod api;
