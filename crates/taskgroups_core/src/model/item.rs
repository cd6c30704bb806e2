//! Task item model.
//!
//! # Responsibility
//! - Define the single task record stored inside a group.
//! - Carry the annotation blob without interpreting it.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `annotation_blob` is stored and transported byte-for-byte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one task item.
pub type ItemId = Uuid;

/// Ordered task priority (`Low < Medium < High`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// One task inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    /// Serialized as RFC 3339.
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    /// Opaque drawing payload owned by the annotation subsystem.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "annotation_base64"
    )]
    pub annotation_blob: Option<Vec<u8>>,
}

impl Item {
    /// Creates an empty, incomplete, medium-priority item stamped with now.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4(), "")
    }

    /// Creates an item with a caller-provided id and title.
    pub fn with_id(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            is_completed: false,
            creation_date: Utc::now(),
            priority: Priority::default(),
            annotation_blob: None,
        }
    }

    /// Returns whether an annotation is attached.
    pub fn has_annotation(&self) -> bool {
        self.annotation_blob.is_some()
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

mod annotation_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|value| STANDARD.decode(value.as_bytes()))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
