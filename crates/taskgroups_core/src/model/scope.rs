//! Workspace scope key.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Partition identifier separating independent workspaces in storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeKey(String);

/// Errors from scope key parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKeyError {
    /// Scope is blank after trim.
    Blank,
}

impl Display for ScopeKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "scope key must not be blank"),
        }
    }
}

impl Error for ScopeKeyError {}

impl ScopeKey {
    /// Parses a scope key, trimming surrounding whitespace.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ScopeKeyError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ScopeKeyError::Blank);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key of the group record for this scope.
    pub fn groups_key(&self) -> String {
        format!("groups:{}", self.0)
    }

    /// Storage key of the main-group record for this scope.
    pub fn mains_key(&self) -> String {
        format!("mains:{}", self.0)
    }
}

impl Display for ScopeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
