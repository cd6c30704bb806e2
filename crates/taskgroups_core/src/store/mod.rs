//! In-memory entity storage.
//!
//! # Responsibility
//! - Own the authoritative group and main-group collections of one scope.
//!
//! # Invariants
//! - Pure CRUD: cross-entity policy lives in `service::lifecycle`.

pub mod entity_store;
