//! Persistence layer: durable blob storage and collection encoding.
//!
//! # Responsibility
//! - Define the durable key-value contract (`BlobRepository`).
//! - Isolate SQLite and JSON details from service orchestration.
//!
//! # Invariants
//! - Loading never fails; bad records degrade to empty collections.
//! - Saving both records of one scope is atomic.

pub mod blob_repo;
pub mod collections_repo;
