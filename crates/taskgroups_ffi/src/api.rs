//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose workspace commands and read models to Dart via FRB.
//! - Own the process-wide workspace registry and its save worker.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Ids cross the boundary as hyphenated UUID strings.
//! - A blank `scope` argument means the configured default scope.

use log::{error, info};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use taskgroups_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    init_logging_from_config, logging_status, ping as ping_inner, AttachChoice, CoreConfig,
    DisplayNode, LifecycleError, Priority, ScopeKey, ScopeManager, Selection, SqliteBlobRepository,
    Tier, WorkspaceRegistry,
};
use uuid::Uuid;

static CONFIG: OnceCell<CoreConfig> = OnceCell::new();
static REGISTRY: OnceCell<WorkspaceRegistry> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One node of the sidebar tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceNodeItem {
    /// Main-group or group id.
    pub id: String,
    pub title: String,
    pub symbol: String,
    /// Group selected on activation; `None` means the profile page.
    pub selects_group_id: Option<String>,
    /// Empty for leaves.
    pub children: Vec<WorkspaceNodeItem>,
}

/// Tree read envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTreeResponse {
    pub ok: bool,
    pub nodes: Vec<WorkspaceNodeItem>,
    /// Store revision the tree was built from; callers poll it for changes.
    pub revision: u64,
    pub message: String,
}

/// Current selection envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSelectionResponse {
    pub ok: bool,
    /// Selected group, or `None` when the profile page is selected.
    pub group_id: Option<String>,
    pub message: String,
}

/// Generic command envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceActionResponse {
    /// Whether the command was applied.
    pub ok: bool,
    /// Created entity id, when the command creates one.
    pub id: Option<String>,
    /// Machine-readable failure class (`quota_exceeded`, `invalid_title`,
    /// `not_found`, `invalid_argument`, `internal`).
    pub error_code: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl WorkspaceActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            error_code: Some(error_code.to_string()),
            message: message.into(),
        }
    }
}

/// Annotation read envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAnnotationResponse {
    pub ok: bool,
    /// Stored blob; `None` when the item has no annotation.
    pub annotation: Option<Vec<u8>>,
    pub error_code: Option<String>,
    pub message: String,
}

/// Quota pre-flight envelope for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatusResponse {
    pub ok: bool,
    pub premium: bool,
    pub group_count: u32,
    pub main_group_count: u32,
    pub can_add_group: bool,
    pub can_add_main_group: bool,
    pub message: String,
}

/// Builds the display tree of `scope`.
///
/// # FFI contract
/// - Sync call; first access of a scope loads it from disk.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn workspace_tree(scope: String) -> WorkspaceTreeResponse {
    match with_scope(&scope, |m| (m.tree(), m.revision())) {
        Ok((tree, revision)) => WorkspaceTreeResponse {
            ok: true,
            nodes: tree.into_iter().map(to_node_item).collect(),
            revision,
            message: "ok".to_string(),
        },
        Err(err) => WorkspaceTreeResponse {
            ok: false,
            nodes: Vec::new(),
            revision: 0,
            message: format!("workspace_tree failed: {err}"),
        },
    }
}

/// Returns the current selection of `scope`.
#[flutter_rust_bridge::frb(sync)]
pub fn workspace_selection(scope: String) -> WorkspaceSelectionResponse {
    match with_scope(&scope, |m| m.selection()) {
        Ok(selection) => WorkspaceSelectionResponse {
            ok: true,
            group_id: selection
                .and_then(|s| s.group_id())
                .map(|id| id.to_string()),
            message: "ok".to_string(),
        },
        Err(err) => WorkspaceSelectionResponse {
            ok: false,
            group_id: None,
            message: format!("workspace_selection failed: {err}"),
        },
    }
}

/// Creates a group in `scope`.
///
/// Input semantics:
/// - `attach_mode`: `auto`, `existing` (requires `parent_id`) or
///   `new_parent` (requires `parent_title`; `parent_symbol` may be blank).
///
/// # FFI contract
/// - Never panics.
/// - Returns the new group id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn group_add(
    scope: String,
    title: String,
    symbol: String,
    attach_mode: String,
    parent_id: Option<String>,
    parent_title: Option<String>,
    parent_symbol: Option<String>,
) -> WorkspaceActionResponse {
    let attach = match parse_attach(&attach_mode, parent_id, parent_title, parent_symbol) {
        Ok(attach) => attach,
        Err(message) => return WorkspaceActionResponse::failure("invalid_argument", message),
    };
    match with_scope(&scope, |m| m.add_group(&title, &symbol, attach)) {
        Ok(Ok(group_id)) => {
            WorkspaceActionResponse::success("Group created.", Some(group_id.to_string()))
        }
        Ok(Err(err)) => {
            WorkspaceActionResponse::failure(lifecycle_error_code(&err), err.to_string())
        }
        Err(err) => {
            WorkspaceActionResponse::failure("internal", format!("group_add failed: {err}"))
        }
    }
}

/// Deletes a group and unlinks it from every main group.
#[flutter_rust_bridge::frb(sync)]
pub fn group_delete(scope: String, group_id: String) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    applied_response(
        "group_delete",
        with_scope(&scope, |m| m.delete_group(group_id)),
        "Group deleted.",
    )
}

/// Deletes a main group and the groups no other main group references.
#[flutter_rust_bridge::frb(sync)]
pub fn main_group_delete(scope: String, main_group_id: String) -> WorkspaceActionResponse {
    let main_id = match parse_id("main_group_id", &main_group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    applied_response(
        "main_group_delete",
        with_scope(&scope, |m| m.delete_main_group(main_id)),
        "Main group deleted.",
    )
}

/// Appends an empty item to a group; returns the item id.
#[flutter_rust_bridge::frb(sync)]
pub fn item_add(scope: String, group_id: String) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match with_scope(&scope, |m| m.add_item(group_id)) {
        Ok(Some(item_id)) => {
            WorkspaceActionResponse::success("Item added.", Some(item_id.to_string()))
        }
        Ok(None) => WorkspaceActionResponse::failure("not_found", "group not found"),
        Err(err) => WorkspaceActionResponse::failure("internal", format!("item_add failed: {err}")),
    }
}

/// Flips the completion flag of one item.
#[flutter_rust_bridge::frb(sync)]
pub fn item_toggle(scope: String, group_id: String, item_id: String) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let item_id = match parse_id("item_id", &item_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    applied_response(
        "item_toggle",
        with_scope(&scope, |m| m.toggle_item_completed(group_id, item_id)),
        "Item toggled.",
    )
}

/// Renames a group. Blank titles fail with `invalid_title`.
#[flutter_rust_bridge::frb(sync)]
pub fn group_rename(scope: String, group_id: String, title: String) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    checked_response(
        "group_rename",
        with_scope(&scope, |m| m.rename_group(group_id, &title)),
        "Group renamed.",
    )
}

/// Renames a main group. Blank titles fail with `invalid_title`.
#[flutter_rust_bridge::frb(sync)]
pub fn main_group_rename(
    scope: String,
    main_group_id: String,
    title: String,
) -> WorkspaceActionResponse {
    let main_id = match parse_id("main_group_id", &main_group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    checked_response(
        "main_group_rename",
        with_scope(&scope, |m| m.rename_main_group(main_id, &title)),
        "Main group renamed.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn group_set_symbol(scope: String, group_id: String, symbol: String) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    applied_response(
        "group_set_symbol",
        with_scope(&scope, |m| m.set_group_symbol(group_id, &symbol)),
        "Group symbol updated.",
    )
}

/// Reorders a group's items from high to low priority.
#[flutter_rust_bridge::frb(sync)]
pub fn group_sort_by_priority(scope: String, group_id: String) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    applied_response(
        "group_sort_by_priority",
        with_scope(&scope, |m| m.sort_items_by_priority(group_id)),
        "Items sorted.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn item_set_title(
    scope: String,
    group_id: String,
    item_id: String,
    title: String,
) -> WorkspaceActionResponse {
    let (group_id, item_id) = match parse_item_ids(&group_id, &item_id) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    applied_response(
        "item_set_title",
        with_scope(&scope, |m| m.set_item_title(group_id, item_id, &title)),
        "Item title updated.",
    )
}

/// Sets the priority of one item.
///
/// Input semantics:
/// - `priority`: one of `low|medium|high` (case-insensitive).
#[flutter_rust_bridge::frb(sync)]
pub fn item_set_priority(
    scope: String,
    group_id: String,
    item_id: String,
    priority: String,
) -> WorkspaceActionResponse {
    let (group_id, item_id) = match parse_item_ids(&group_id, &item_id) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    let priority = match parse_priority(&priority) {
        Ok(priority) => priority,
        Err(message) => return WorkspaceActionResponse::failure("invalid_argument", message),
    };
    applied_response(
        "item_set_priority",
        with_scope(&scope, |m| m.set_item_priority(group_id, item_id, priority)),
        "Item priority updated.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn item_delete(scope: String, group_id: String, item_id: String) -> WorkspaceActionResponse {
    let (group_id, item_id) = match parse_item_ids(&group_id, &item_id) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    applied_response(
        "item_delete",
        with_scope(&scope, |m| m.delete_item(group_id, item_id)),
        "Item deleted.",
    )
}

/// Moves the item at index `from` to index `to` within one group.
///
/// # FFI contract
/// - Unknown group fails with `not_found`.
/// - An index past the last item fails with `invalid_argument`.
#[flutter_rust_bridge::frb(sync)]
pub fn item_move(scope: String, group_id: String, from: u32, to: u32) -> WorkspaceActionResponse {
    let group_id = match parse_id("group_id", &group_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let (from, to) = (to_index(from), to_index(to));
    let moved = with_scope(&scope, |m| {
        m.store()
            .get_group(group_id)
            .is_some()
            .then(|| m.move_item(group_id, from, to))
    });
    match moved {
        Ok(Some(true)) => WorkspaceActionResponse::success("Item moved.", None),
        Ok(Some(false)) => {
            WorkspaceActionResponse::failure("invalid_argument", "item index out of range")
        }
        Ok(None) => WorkspaceActionResponse::failure("not_found", "item_move: not found"),
        Err(err) => WorkspaceActionResponse::failure("internal", format!("item_move failed: {err}")),
    }
}

/// Reads the annotation blob of one item.
#[flutter_rust_bridge::frb(sync)]
pub fn item_annotation_get(
    scope: String,
    group_id: String,
    item_id: String,
) -> ItemAnnotationResponse {
    let ids = parse_item_ids(&group_id, &item_id);
    let (group_id, item_id) = match ids {
        Ok(ids) => ids,
        Err(response) => {
            return ItemAnnotationResponse {
                ok: false,
                annotation: None,
                error_code: response.error_code,
                message: response.message,
            }
        }
    };
    let found = with_scope(&scope, |m| {
        m.store()
            .get_group(group_id)
            .and_then(|group| group.item(item_id))
            .map(|item| item.annotation_blob.clone())
    });
    match found {
        Ok(Some(annotation)) => ItemAnnotationResponse {
            ok: true,
            annotation,
            error_code: None,
            message: "ok".to_string(),
        },
        Ok(None) => ItemAnnotationResponse {
            ok: false,
            annotation: None,
            error_code: Some("not_found".to_string()),
            message: "item_annotation_get: not found".to_string(),
        },
        Err(err) => ItemAnnotationResponse {
            ok: false,
            annotation: None,
            error_code: Some("internal".to_string()),
            message: format!("item_annotation_get failed: {err}"),
        },
    }
}

/// Replaces the annotation blob of one item; `None` clears it.
#[flutter_rust_bridge::frb(sync)]
pub fn item_annotation_set(
    scope: String,
    group_id: String,
    item_id: String,
    annotation: Option<Vec<u8>>,
) -> WorkspaceActionResponse {
    let (group_id, item_id) = match parse_item_ids(&group_id, &item_id) {
        Ok(ids) => ids,
        Err(response) => return response,
    };
    applied_response(
        "item_annotation_set",
        with_scope(&scope, |m| m.set_item_annotation(group_id, item_id, annotation)),
        "Item annotation updated.",
    )
}

/// Reports counts and pre-flight quota checks of `scope`.
#[flutter_rust_bridge::frb(sync)]
pub fn quota_status(scope: String) -> QuotaStatusResponse {
    let status = with_scope(&scope, |m| {
        (
            m.tier().is_premium(),
            m.store().group_count(),
            m.store().main_group_count(),
            m.can_add_group(),
            m.can_add_main_group(),
        )
    });
    match status {
        Ok((premium, groups, mains, can_add_group, can_add_main_group)) => QuotaStatusResponse {
            ok: true,
            premium,
            group_count: saturating_u32(groups),
            main_group_count: saturating_u32(mains),
            can_add_group,
            can_add_main_group,
            message: "ok".to_string(),
        },
        Err(err) => QuotaStatusResponse {
            ok: false,
            premium: false,
            group_count: 0,
            main_group_count: 0,
            can_add_group: false,
            can_add_main_group: false,
            message: format!("quota_status failed: {err}"),
        },
    }
}

/// Sets the membership tier for all scopes.
///
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn set_premium(premium: bool) -> String {
    match registry().and_then(|r| r.set_tier(Tier::from_premium(premium)).map_err(|e| e.to_string()))
    {
        Ok(()) => String::new(),
        Err(err) => format!("set_premium failed: {err}"),
    }
}

/// Blocks until every queued save is written.
///
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn flush_all() -> String {
    match registry().and_then(|r| r.flush_all().map_err(|e| e.to_string())) {
        Ok(()) => String::new(),
        Err(err) => format!("flush_all failed: {err}"),
    }
}

/// Drains queued saves and stops the save worker. Call on app exit.
///
/// Later commands still apply in memory but report unsaved state in logs.
#[flutter_rust_bridge::frb(sync)]
pub fn shutdown() -> String {
    let Some(registry) = REGISTRY.get() else {
        return String::new();
    };
    match registry.shutdown() {
        Ok(()) => {
            info!("event=app_shutdown module=ffi status=ok");
            String::new()
        }
        Err(err) => {
            error!("event=app_shutdown module=ffi status=error error={err}");
            format!("shutdown failed: {err}")
        }
    }
}

fn config() -> Result<&'static CoreConfig, String> {
    CONFIG
        .get_or_try_init(CoreConfig::from_env)
        .map_err(|err| format!("config invalid: {err}"))
}

fn registry() -> Result<&'static WorkspaceRegistry, String> {
    REGISTRY.get_or_try_init(|| {
        let config = config()?;
        // Host-driven `init_logging` wins; env config only fills the gap.
        if logging_status().is_none() {
            init_logging_from_config(config)?;
        }
        let blobs = SqliteBlobRepository::open(&config.db_path)
            .map_err(|err| format!("blob store open failed: {err}"))?;
        let registry = WorkspaceRegistry::start(Arc::new(blobs))
            .map_err(|err| format!("registry start failed: {err}"))?;
        info!(
            "event=app_start module=ffi status=ok default_scope={}",
            config.default_scope
        );
        Ok(registry)
    })
}

fn resolve_scope(scope: &str) -> Result<ScopeKey, String> {
    if scope.trim().is_empty() {
        return Ok(config()?.default_scope.clone());
    }
    ScopeKey::parse(scope).map_err(|err| err.to_string())
}

fn with_scope<T>(scope: &str, f: impl FnOnce(&mut ScopeManager) -> T) -> Result<T, String> {
    let scope = resolve_scope(scope)?;
    registry()?
        .with_workspace(&scope, f)
        .map_err(|err| err.to_string())
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, WorkspaceActionResponse> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        WorkspaceActionResponse::failure("invalid_argument", format!("{field} is not a valid id"))
    })
}

fn parse_item_ids(group_id: &str, item_id: &str) -> Result<(Uuid, Uuid), WorkspaceActionResponse> {
    Ok((parse_id("group_id", group_id)?, parse_id("item_id", item_id)?))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!(
            "unsupported priority `{other}`; expected low|medium|high"
        )),
    }
}

fn to_index(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn parse_attach(
    mode: &str,
    parent_id: Option<String>,
    parent_title: Option<String>,
    parent_symbol: Option<String>,
) -> Result<AttachChoice, String> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "" | "auto" => Ok(AttachChoice::Auto),
        "existing" => {
            let raw = parent_id.ok_or_else(|| "parent_id is required for existing".to_string())?;
            Uuid::parse_str(raw.trim())
                .map(AttachChoice::Existing)
                .map_err(|_| "parent_id is not a valid id".to_string())
        }
        "new_parent" => Ok(AttachChoice::NewParent {
            title: parent_title.unwrap_or_default(),
            symbol: parent_symbol.unwrap_or_default(),
        }),
        other => Err(format!(
            "unsupported attach_mode `{other}`; expected auto|existing|new_parent"
        )),
    }
}

fn applied_response(
    operation: &str,
    result: Result<bool, String>,
    success_message: &str,
) -> WorkspaceActionResponse {
    match result {
        Ok(true) => WorkspaceActionResponse::success(success_message, None),
        Ok(false) => WorkspaceActionResponse::failure("not_found", format!("{operation}: not found")),
        Err(err) => WorkspaceActionResponse::failure("internal", format!("{operation} failed: {err}")),
    }
}

fn checked_response(
    operation: &str,
    result: Result<Result<bool, LifecycleError>, String>,
    success_message: &str,
) -> WorkspaceActionResponse {
    match result {
        Ok(Ok(applied)) => applied_response(operation, Ok(applied), success_message),
        Ok(Err(err)) => WorkspaceActionResponse::failure(lifecycle_error_code(&err), err.to_string()),
        Err(err) => applied_response(operation, Err(err), success_message),
    }
}

fn lifecycle_error_code(err: &LifecycleError) -> &'static str {
    match err {
        LifecycleError::QuotaExceeded(_) => "quota_exceeded",
        LifecycleError::InvalidTitle => "invalid_title",
        LifecycleError::MainGroupNotFound(_) => "not_found",
    }
}

fn to_node_item(node: DisplayNode) -> WorkspaceNodeItem {
    WorkspaceNodeItem {
        id: node.id.to_string(),
        title: node.title,
        symbol: node.symbol,
        selects_group_id: match node.selection {
            Selection::Group(id) => Some(id.to_string()),
            Selection::Profile => None,
        },
        children: node
            .children
            .unwrap_or_default()
            .into_iter()
            .map(to_node_item)
            .collect(),
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, group_add, group_delete, group_rename, group_set_symbol,
        group_sort_by_priority, init_logging, item_add, item_annotation_get, item_annotation_set,
        item_delete, item_move, item_set_priority, item_set_title, item_toggle, main_group_delete,
        main_group_rename, parse_attach, parse_priority, ping, quota_status, workspace_selection,
        workspace_tree,
    };
    use std::sync::Once;
    use taskgroups_core::{AttachChoice, Priority};
    use uuid::Uuid;

    static TEST_DB: Once = Once::new();

    /// Points the process-wide registry at a per-run database before first use.
    fn isolated_db() {
        TEST_DB.call_once(|| {
            let dir = std::env::temp_dir()
                .join(format!("taskgroups-ffi-test-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            std::env::set_var("TASKGROUPS_DB_PATH", dir.join("taskgroups.sqlite3"));
        });
    }

    fn unique_scope(prefix: &str) -> String {
        isolated_db();
        format!("{prefix}-{}", Uuid::new_v4())
    }

    fn auto_group(scope: &str, title: &str) -> String {
        let created = group_add(
            scope.to_string(),
            title.to_string(),
            "star".to_string(),
            "auto".to_string(),
            None,
            None,
            None,
        );
        assert!(created.ok, "{}", created.message);
        created.id.unwrap()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn parse_attach_maps_modes() {
        assert_eq!(parse_attach("", None, None, None), Ok(AttachChoice::Auto));
        assert!(parse_attach("existing", None, None, None).is_err());
        assert!(parse_attach("sideways", None, None, None).is_err());
        assert_eq!(
            parse_attach(
                "NEW_PARENT",
                None,
                Some("Work".to_string()),
                None
            ),
            Ok(AttachChoice::NewParent {
                title: "Work".to_string(),
                symbol: String::new(),
            })
        );
    }

    #[test]
    fn group_add_auto_shows_up_in_tree_and_selection() {
        let scope = unique_scope("ffi-tree");

        let created = group_add(
            scope.clone(),
            "Work".to_string(),
            "briefcase".to_string(),
            "auto".to_string(),
            None,
            None,
            None,
        );
        assert!(created.ok, "{}", created.message);
        let group_id = created.id.unwrap();

        let tree = workspace_tree(scope.clone());
        assert!(tree.ok, "{}", tree.message);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].title, "My Groups");
        assert_eq!(tree.nodes[0].children[0].id, group_id);
        assert!(tree.revision > 0);

        let selection = workspace_selection(scope);
        assert_eq!(selection.group_id, Some(group_id));
    }

    #[test]
    fn item_commands_round_trip_through_ids() {
        let scope = unique_scope("ffi-items");
        let group_id = group_add(
            scope.clone(),
            "Chores".to_string(),
            "house".to_string(),
            "auto".to_string(),
            None,
            None,
            None,
        )
        .id
        .unwrap();

        let item = item_add(scope.clone(), group_id.clone());
        assert!(item.ok, "{}", item.message);
        let toggled = item_toggle(scope.clone(), group_id, item.id.unwrap());
        assert!(toggled.ok, "{}", toggled.message);

        let missing = item_toggle(
            scope,
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
        );
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
    }

    #[test]
    fn main_group_delete_cascades_and_resets_selection() {
        let scope = unique_scope("ffi-cascade");
        group_add(
            scope.clone(),
            "Solo".to_string(),
            "star".to_string(),
            "auto".to_string(),
            None,
            None,
            None,
        );
        let main_id = workspace_tree(scope.clone()).nodes[0].id.clone();

        let deleted = main_group_delete(scope.clone(), main_id);
        assert!(deleted.ok, "{}", deleted.message);

        assert!(workspace_tree(scope.clone()).nodes.is_empty());
        assert_eq!(workspace_selection(scope.clone()).group_id, None);
        let status = quota_status(scope);
        assert_eq!((status.group_count, status.main_group_count), (0, 0));
    }

    #[test]
    fn invalid_arguments_are_reported_without_panicking() {
        let scope = unique_scope("ffi-invalid");

        let bad_id = group_delete(scope.clone(), "not-a-uuid".to_string());
        assert_eq!(bad_id.error_code.as_deref(), Some("invalid_argument"));

        let blank = group_add(
            scope.clone(),
            "  ".to_string(),
            "star".to_string(),
            "auto".to_string(),
            None,
            None,
            None,
        );
        assert_eq!(blank.error_code.as_deref(), Some("invalid_title"));

        let orphan = group_add(
            scope,
            "Lost".to_string(),
            "star".to_string(),
            "existing".to_string(),
            Some(Uuid::new_v4().to_string()),
            None,
            None,
        );
        assert_eq!(orphan.error_code.as_deref(), Some("not_found"));
    }

    #[test]
    fn parse_priority_accepts_known_levels() {
        assert_eq!(parse_priority(" HIGH "), Ok(Priority::High));
        assert_eq!(parse_priority("low"), Ok(Priority::Low));
        assert!(parse_priority("urgent").is_err());
    }

    #[test]
    fn group_edits_show_up_in_tree() {
        let scope = unique_scope("ffi-group-edit");
        let group_id = auto_group(&scope, "Draft");
        let main_id = workspace_tree(scope.clone()).nodes[0].id.clone();

        let renamed = group_rename(scope.clone(), group_id.clone(), " Final ".to_string());
        assert!(renamed.ok, "{}", renamed.message);
        let symbol = group_set_symbol(scope.clone(), group_id.clone(), "flame".to_string());
        assert!(symbol.ok, "{}", symbol.message);
        let main = main_group_rename(scope.clone(), main_id, "Projects".to_string());
        assert!(main.ok, "{}", main.message);

        let tree = workspace_tree(scope.clone());
        assert_eq!(tree.nodes[0].title, "Projects");
        let child = &tree.nodes[0].children[0];
        assert_eq!((child.title.as_str(), child.symbol.as_str()), ("Final", "flame"));

        let blank = group_rename(scope.clone(), group_id, "   ".to_string());
        assert_eq!(blank.error_code.as_deref(), Some("invalid_title"));
        let missing = main_group_rename(scope, Uuid::new_v4().to_string(), "X".to_string());
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
    }

    #[test]
    fn item_edits_apply_and_report_bad_input() {
        let scope = unique_scope("ffi-item-edit");
        let group_id = auto_group(&scope, "List");
        let first = item_add(scope.clone(), group_id.clone()).id.unwrap();
        let second = item_add(scope.clone(), group_id.clone()).id.unwrap();

        let titled = item_set_title(
            scope.clone(),
            group_id.clone(),
            first.clone(),
            "Dishes".to_string(),
        );
        assert!(titled.ok, "{}", titled.message);
        let prioritized = item_set_priority(
            scope.clone(),
            group_id.clone(),
            second.clone(),
            "high".to_string(),
        );
        assert!(prioritized.ok, "{}", prioritized.message);
        let bad_priority = item_set_priority(
            scope.clone(),
            group_id.clone(),
            second.clone(),
            "urgent".to_string(),
        );
        assert_eq!(bad_priority.error_code.as_deref(), Some("invalid_argument"));

        let sorted = group_sort_by_priority(scope.clone(), group_id.clone());
        assert!(sorted.ok, "{}", sorted.message);
        let moved = item_move(scope.clone(), group_id.clone(), 0, 1);
        assert!(moved.ok, "{}", moved.message);
        let out_of_range = item_move(scope.clone(), group_id.clone(), 0, 5);
        assert_eq!(out_of_range.error_code.as_deref(), Some("invalid_argument"));
        let no_group = item_move(scope.clone(), Uuid::new_v4().to_string(), 0, 1);
        assert_eq!(no_group.error_code.as_deref(), Some("not_found"));

        let deleted = item_delete(scope.clone(), group_id.clone(), first.clone());
        assert!(deleted.ok, "{}", deleted.message);
        let again = item_delete(scope.clone(), group_id.clone(), first);
        assert_eq!(again.error_code.as_deref(), Some("not_found"));
        let remaining = item_toggle(scope, group_id, second);
        assert!(remaining.ok, "{}", remaining.message);
    }

    #[test]
    fn annotation_set_get_and_clear() {
        let scope = unique_scope("ffi-annotation");
        let group_id = auto_group(&scope, "Sketches");
        let item_id = item_add(scope.clone(), group_id.clone()).id.unwrap();

        let empty = item_annotation_get(scope.clone(), group_id.clone(), item_id.clone());
        assert!(empty.ok, "{}", empty.message);
        assert_eq!(empty.annotation, None);

        let stored = item_annotation_set(
            scope.clone(),
            group_id.clone(),
            item_id.clone(),
            Some(vec![7, 0, 255]),
        );
        assert!(stored.ok, "{}", stored.message);
        let read = item_annotation_get(scope.clone(), group_id.clone(), item_id.clone());
        assert_eq!(read.annotation, Some(vec![7, 0, 255]));

        let cleared = item_annotation_set(scope.clone(), group_id.clone(), item_id.clone(), None);
        assert!(cleared.ok, "{}", cleared.message);
        let read = item_annotation_get(scope.clone(), group_id.clone(), item_id);
        assert_eq!(read.annotation, None);

        let missing = item_annotation_get(scope, group_id, Uuid::new_v4().to_string());
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
    }
}
