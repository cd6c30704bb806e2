//! Core domain logic for TaskGroups.
//! This crate is the single source of truth for hierarchy invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::group::{Collections, Group, GroupId, MainGroup, MainGroupId};
pub use model::item::{Item, ItemId, Priority};
pub use model::scope::{ScopeKey, ScopeKeyError};
pub use model::selection::Selection;
pub use repo::blob_repo::{
    BlobRepository, MemoryBlobRepository, PersistError, PersistResult, SqliteBlobRepository,
};
pub use repo::collections_repo::CollectionsRepository;
pub use service::hierarchy::{build_tree, DisplayNode};
pub use service::lifecycle::{AttachChoice, LifecycleError, LifecycleManager};
pub use service::quota::{can_add_group, can_add_main_group, QuotaKind, Tier};
pub use service::registry::{ScopeManager, SharedScopeManager, WorkspaceRegistry};
pub use service::save_worker::{SaveQueue, SaveWorker, SnapshotSink};
pub use store::entity_store::EntityStore;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
