//! Process-level configuration resolved from environment variables.
//!
//! # Invariants
//! - Blank variables behave as unset.
//! - `log_dir`, when present, is absolute.

use crate::logging::default_log_level;
use crate::model::scope::{ScopeKey, ScopeKeyError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "TASKGROUPS_DB_PATH";
pub const SCOPE_VAR: &str = "TASKGROUPS_SCOPE";
pub const LOG_LEVEL_VAR: &str = "TASKGROUPS_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "TASKGROUPS_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "taskgroups.sqlite3";
const DEFAULT_SCOPE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidScope(ScopeKeyError),
    RelativeLogDir(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScope(err) => write!(f, "invalid {SCOPE_VAR}: {err}"),
            Self::RelativeLogDir(path) => write!(
                f,
                "{LOG_DIR_VAR} must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidScope(err) => Some(err),
            Self::RelativeLogDir(_) => None,
        }
    }
}

/// Resolved runtime settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub default_scope: ScopeKey,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads the `TASKGROUPS_*` variables of the current process.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves settings through `lookup`, applying defaults for missing
    /// or blank values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(DB_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let default_scope = ScopeKey::parse(read(SCOPE_VAR).as_deref().unwrap_or(DEFAULT_SCOPE))
            .map_err(ConfigError::InvalidScope)?;
        let log_level = read(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = match read(LOG_DIR_VAR).map(PathBuf::from) {
            Some(dir) if !dir.is_absolute() => return Err(ConfigError::RelativeLogDir(dir)),
            other => other,
        };

        Ok(Self {
            db_path,
            default_scope,
            log_level,
            log_dir,
        })
    }
}
