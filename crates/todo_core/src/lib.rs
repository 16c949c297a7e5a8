//! Core domain logic for the todo list.
//! This crate is the single source of truth for task invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod view;

pub use config::{ConfigError, TodoConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, LoggingError};
pub use model::todo::{
    parse_due_date, NewTodo, PositionUpdate, Todo, TodoId, TodoPatch, TodoValidationError,
    DEFAULT_USER_ID,
};
pub use repo::todo_repo::{RepoError, RepoResult, SqliteTodoRepository, TodoRepository};
pub use service::todo_service::{
    BatchDeleteOutcome, CreateTodoRequest, EditTodoRequest, ServiceResult, TodoAction,
    TodoService, TodoServiceError, UserAlert,
};
pub use view::filter::{active_count, filter_todos, items_left_label, TodoFilter};
pub use view::list_state::TodoListState;
pub use view::prompt::{completion_intent, CompletionIntent, ConfirmPrompt};
pub use view::selection::SelectionState;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
