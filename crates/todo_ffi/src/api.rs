//! FFI use-case API for the mobile/web UI.
//!
//! # Responsibility
//! - Expose the todo backend functions to Dart via FRB.
//! - Keep error semantics simple: envelopes with `ok` + user-facing message.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Ids cross the boundary as UUID strings; dates as `YYYY-MM-DD`.

use log::warn;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use todo_core::db::open_db;
use todo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, parse_due_date,
    ping as ping_inner, CreateTodoRequest, PositionUpdate, SqliteTodoRepository, Todo, TodoAction,
    TodoConfig, TodoId, TodoPatch, TodoService, TodoServiceError,
};
use uuid::Uuid;

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static CONFIG: OnceLock<TodoConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
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
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the database file used by every later call.
///
/// Returns `false` when a path was already pinned (first call wins).
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> bool {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return false;
    }
    DB_PATH.set(PathBuf::from(trimmed)).is_ok()
}

/// Todo as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub due_date: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_id: String,
    pub position: i64,
}

/// One `{id, position}` pair sent by the drag-and-drop list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoPositionInput {
    pub id: String,
    pub position: i64,
}

/// Response envelope for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListResponse {
    pub ok: bool,
    pub items: Vec<TodoItem>,
    pub message: String,
}

/// Response envelope for mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoActionResponse {
    pub ok: bool,
    /// Id of the created or changed todo, when there is exactly one.
    pub todo_id: Option<String>,
    /// Rows affected by bulk operations.
    pub affected: u32,
    /// Alert title on failure; empty on success.
    pub alert_title: String,
    pub message: String,
}

impl TodoActionResponse {
    fn success(message: impl Into<String>, todo_id: Option<String>, affected: u32) -> Self {
        Self {
            ok: true,
            todo_id,
            affected,
            alert_title: String::new(),
            message: message.into(),
        }
    }

    fn failure(action: TodoAction, err: &TodoServiceError) -> Self {
        let alert = err.user_alert(action);
        Self {
            ok: false,
            todo_id: None,
            affected: 0,
            alert_title: alert.title,
            message: alert.message,
        }
    }

    fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            todo_id: None,
            affected: 0,
            alert_title: "Validation Error".to_string(),
            message: message.into(),
        }
    }
}

/// Lists all todos ordered by position.
#[flutter_rust_bridge::frb(sync)]
pub fn get_todos() -> TodoListResponse {
    match with_todo_service(|service| service.list_todos()) {
        Ok(todos) => TodoListResponse {
            ok: true,
            message: format!("Loaded {} task(s).", todos.len()),
            items: todos.into_iter().map(to_todo_item).collect(),
        },
        Err(err) => TodoListResponse {
            ok: false,
            items: Vec::new(),
            message: err.user_alert(TodoAction::Load).message,
        },
    }
}

/// Appends a todo. Blank titles are rejected before touching storage.
#[flutter_rust_bridge::frb(sync)]
pub fn create_todo(
    title: String,
    description: Option<String>,
    due_date: Option<String>,
    user_id: Option<String>,
) -> TodoActionResponse {
    let due_date = match due_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match parse_due_date(raw) {
            Some(date) => Some(date),
            None => {
                return TodoActionResponse::invalid_input(format!(
                    "Invalid due date `{raw}`; expected YYYY-MM-DD."
                ))
            }
        },
    };
    let request = CreateTodoRequest {
        title,
        description,
        due_date,
        user_id,
    };
    match with_todo_service(|service| service.create_todo(request)) {
        Ok(todo) => {
            TodoActionResponse::success("Task added successfully!", Some(todo.id.to_string()), 1)
        }
        Err(err) => TodoActionResponse::failure(TodoAction::Create, &err),
    }
}

/// Replaces title, description and completion of one todo.
#[flutter_rust_bridge::frb(sync)]
pub fn update_todo(
    id: String,
    title: String,
    description: Option<String>,
    completed: bool,
) -> TodoActionResponse {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return TodoActionResponse::invalid_input(message),
    };
    let patch = TodoPatch {
        title: Some(title),
        description: Some(description),
        completed: Some(completed),
        ..TodoPatch::default()
    };
    match with_todo_service(|service| service.update_todo(id, patch)) {
        Ok(todo) => TodoActionResponse::success(
            "Task updated successfully!",
            Some(todo.id.to_string()),
            1,
        ),
        Err(err) => TodoActionResponse::failure(TodoAction::Update, &err),
    }
}

/// Sets one todo's position.
#[flutter_rust_bridge::frb(sync)]
pub fn update_todo_position(id: String, position: i64) -> TodoActionResponse {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return TodoActionResponse::invalid_input(message),
    };
    match with_todo_service(|service| service.update_position(id, position)) {
        Ok(()) => TodoActionResponse::success("Position updated.", Some(id.to_string()), 1),
        Err(err) => TodoActionResponse::failure(TodoAction::Reorder, &err),
    }
}

/// Applies a batch of positions all together.
#[flutter_rust_bridge::frb(sync)]
pub fn reorder_todos(updates: Vec<TodoPositionInput>) -> TodoActionResponse {
    let mut parsed = Vec::with_capacity(updates.len());
    for update in &updates {
        match parse_id(&update.id) {
            Ok(id) => parsed.push(PositionUpdate {
                id,
                position: update.position,
            }),
            Err(message) => return TodoActionResponse::invalid_input(message),
        }
    }
    match with_todo_service(|service| service.apply_positions(&parsed)) {
        Ok(()) => TodoActionResponse::success("Order saved.", None, count(parsed.len())),
        Err(err) => TodoActionResponse::failure(TodoAction::Reorder, &err),
    }
}

/// Deletes one todo.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_todo(id: String) -> TodoActionResponse {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(message) => return TodoActionResponse::invalid_input(message),
    };
    match with_todo_service(|service| service.delete_todo(id)) {
        Ok(()) => TodoActionResponse::success("Task deleted.", Some(id.to_string()), 1),
        Err(err) => TodoActionResponse::failure(TodoAction::Delete, &err),
    }
}

/// Deletes every completed todo.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_completed() -> TodoActionResponse {
    match with_todo_service(|service| service.clear_completed()) {
        Ok(removed) => TodoActionResponse::success(
            format!("Cleared {removed} completed task(s)."),
            None,
            count(removed),
        ),
        Err(err) => TodoActionResponse::failure(TodoAction::ClearCompleted, &err),
    }
}

/// Assigns positions to legacy todos stored without one.
#[flutter_rust_bridge::frb(sync)]
pub fn migrate_todo_positions() -> TodoActionResponse {
    match with_todo_service(|service| service.migrate_positions()) {
        Ok(patched) => TodoActionResponse::success(
            format!("Backfilled {patched} position(s)."),
            None,
            count(patched),
        ),
        Err(err) => TodoActionResponse::failure(TodoAction::Update, &err),
    }
}

/// Process config: defaults plus `TODO_*` environment overrides, read once.
fn bridge_config() -> &'static TodoConfig {
    CONFIG.get_or_init(|| config_from(|key| std::env::var(key).ok()))
}

fn config_from(lookup: impl Fn(&str) -> Option<String>) -> TodoConfig {
    TodoConfig::default()
        .with_overrides(lookup)
        .unwrap_or_else(|err| {
            warn!("event=ffi_config module=ffi status=error fallback=defaults error={err}");
            TodoConfig::default()
        })
}

fn resolve_db_path() -> &'static Path {
    DB_PATH.get_or_init(|| bridge_config().db_path.clone())
}

fn with_todo_service<T>(
    f: impl FnOnce(&TodoService<SqliteTodoRepository<'_>>) -> Result<T, TodoServiceError>,
) -> Result<T, TodoServiceError> {
    with_service_at(resolve_db_path(), bridge_config(), f)
}

fn with_service_at<T>(
    db_path: &Path,
    config: &TodoConfig,
    f: impl FnOnce(&TodoService<SqliteTodoRepository<'_>>) -> Result<T, TodoServiceError>,
) -> Result<T, TodoServiceError> {
    let conn = open_db(db_path).map_err(|err| TodoServiceError::Repo(err.into()))?;
    let repo = SqliteTodoRepository::try_new(&conn)?;
    let service = TodoService::with_config(repo, config);
    f(&service)
}

/// Counts above `u32::MAX` saturate.
fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn parse_id(value: &str) -> Result<TodoId, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("Invalid task id `{value}`."))
}

fn to_todo_item(todo: Todo) -> TodoItem {
    TodoItem {
        due_date: todo.due_date_label(),
        id: todo.id.to_string(),
        title: todo.title,
        description: todo.description,
        completed: todo.completed,
        created_at: todo.created_at,
        updated_at: todo.updated_at,
        user_id: todo.user_id,
        position: todo.position,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        clear_completed, config_from, configure_db_path, core_version, count, create_todo,
        delete_todo, get_todos, init_logging, migrate_todo_positions, ping, reorder_todos,
        update_todo, update_todo_position, with_service_at, TodoItem, TodoPositionInput,
    };
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use todo_core::config::{ENV_LOG_DIR, ENV_USER_ID};
    use todo_core::CreateTodoRequest;

    fn test_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("todo-ffi-test-{}.sqlite3", std::process::id()))
    }

    fn use_test_db() {
        configure_db_path(test_db_path().to_string_lossy().into_owned());
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    fn find(id: &str) -> Option<TodoItem> {
        get_todos().items.into_iter().find(|item| item.id == id)
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
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/todo-logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn create_todo_rejects_blank_title() {
        use_test_db();
        let response = create_todo("   ".to_string(), None, None, None);
        assert!(!response.ok);
        assert_eq!(response.alert_title, "Validation Error");
        assert_eq!(response.message, "Task title is required.");
    }

    #[test]
    fn create_todo_rejects_malformed_due_date() {
        use_test_db();
        let response = create_todo("x".to_string(), None, Some("tomorrow".to_string()), None);
        assert!(!response.ok);
        assert!(response.message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn created_todo_is_listed_with_due_date() {
        use_test_db();
        let title = unique_token("ffi-create");
        let response = create_todo(
            title.clone(),
            Some("notes".to_string()),
            Some("2026-10-31".to_string()),
            None,
        );
        assert!(response.ok, "{}", response.message);
        let id = response.todo_id.expect("create should return todo_id");

        let item = find(&id).expect("created todo should be listed");
        assert_eq!(item.title, title);
        assert_eq!(item.due_date.as_deref(), Some("2026-10-31"));
        assert_eq!(item.user_id, "anonymous");
        assert!(!item.completed);
    }

    #[test]
    fn update_and_delete_roundtrip() {
        use_test_db();
        let created = create_todo(unique_token("ffi-update"), None, None, None);
        let id = created.todo_id.expect("create should return todo_id");

        let updated = update_todo(id.clone(), "renamed".to_string(), None, false);
        assert!(updated.ok, "{}", updated.message);
        assert_eq!(find(&id).unwrap().title, "renamed");

        assert!(delete_todo(id.clone()).ok);
        assert!(find(&id).is_none());

        let again = delete_todo(id);
        assert!(!again.ok);
        assert_eq!(again.message, "Task not found.");
    }

    #[test]
    fn reorder_rejects_malformed_id() {
        use_test_db();
        let response = reorder_todos(vec![TodoPositionInput {
            id: "not-a-uuid".to_string(),
            position: 0,
        }]);
        assert!(!response.ok);
        assert!(response.message.contains("not-a-uuid"));
    }

    #[test]
    fn clear_completed_removes_completed_todo() {
        use_test_db();
        let created = create_todo(unique_token("ffi-clear"), None, None, None);
        let id = created.todo_id.expect("create should return todo_id");
        assert!(update_todo(id.clone(), "done".to_string(), None, true).ok);

        let response = clear_completed();
        assert!(response.ok, "{}", response.message);
        assert!(response.affected >= 1);
        assert!(find(&id).is_none());
    }

    #[test]
    fn configured_owner_reaches_created_todos() {
        use_test_db();
        let config = config_from(|key| (key == ENV_USER_ID).then(|| "bob".to_string()));
        assert_eq!(config.default_user_id, "bob");

        let todo = with_service_at(&test_db_path(), &config, |service| {
            service.create_todo(CreateTodoRequest::titled(unique_token("ffi-owner")))
        })
        .unwrap();
        assert_eq!(todo.user_id, "bob");
        assert_eq!(find(&todo.id.to_string()).unwrap().user_id, "bob");
    }

    #[test]
    fn invalid_environment_falls_back_to_default_config() {
        let config =
            config_from(|key| (key == ENV_LOG_DIR).then(|| "relative/logs".to_string()));
        assert_eq!(config.default_user_id, "anonymous");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn update_todo_position_moves_one_todo() {
        use_test_db();
        let created = create_todo(unique_token("ffi-position"), None, None, None);
        let id = created.todo_id.expect("create should return todo_id");

        let response = update_todo_position(id.clone(), 5_000_000);
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.todo_id.as_deref(), Some(id.as_str()));
        assert_eq!(find(&id).unwrap().position, 5_000_000);

        let missing = update_todo_position(uuid::Uuid::new_v4().to_string(), 1);
        assert!(!missing.ok);
        assert_eq!(missing.message, "Task not found.");

        let malformed = update_todo_position("nope".to_string(), 1);
        assert!(!malformed.ok);
        assert_eq!(malformed.alert_title, "Validation Error");
    }

    #[test]
    fn migrate_positions_is_a_no_op_on_a_migrated_store() {
        use_test_db();
        create_todo(unique_token("ffi-migrate"), None, None, None);

        let response = migrate_todo_positions();
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.affected, 0);
        assert!(get_todos().ok);
    }

    #[test]
    fn counts_saturate_instead_of_wrapping() {
        assert_eq!(count(3), 3);
        assert_eq!(count(usize::MAX), u32::MAX);
    }
}
