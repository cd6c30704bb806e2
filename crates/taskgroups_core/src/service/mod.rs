//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store mutations, quota checks and saves into commands.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod hierarchy;
pub mod lifecycle;
pub mod quota;
pub mod registry;
pub mod save_worker;
