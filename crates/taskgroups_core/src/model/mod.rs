//! Domain model for the group/item hierarchy.
//!
//! # Responsibility
//! - Define canonical records for items, groups and main groups.
//! - Define the wire shape persisted per workspace scope.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Main groups reference groups by id only; they never own them.

pub mod group;
pub mod item;
pub mod scope;
pub mod selection;
