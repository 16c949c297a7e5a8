//! Todo use-case service.
//!
//! # Responsibility
//! - Validate user input before any persistence call is made.
//! - Orchestrate repository calls into list/create/edit/toggle/delete/
//!   reorder/clear use-cases.
//! - Map failures to user-facing alerts. There is no automatic retry.
//!
//! # Invariants
//! - A blank title never reaches the repository.
//! - `reorder` always sends positions `0..n-1` in one batch call.

use crate::config::TodoConfig;
use crate::model::todo::{
    NewTodo, PositionUpdate, Todo, TodoId, TodoPatch, TodoValidationError, DEFAULT_USER_ID,
};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for todo use-cases.
#[derive(Debug)]
pub enum TodoServiceError {
    /// Input rejected before submission.
    Validation(TodoValidationError),
    /// Target todo does not exist.
    TodoNotFound(TodoId),
    /// The same id appears twice in one reorder request.
    DuplicateId(TodoId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::DuplicateId(id) => write!(f, "todo {id} appears more than once in reorder"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TodoNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<TodoValidationError> for TodoServiceError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, TodoServiceError>;

/// Use-case that produced a failure, used to word the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoAction {
    Load,
    Create,
    Update,
    Delete,
    Reorder,
    ClearCompleted,
}

/// Title/message pair shown to the user when an action fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAlert {
    pub title: String,
    pub message: String,
}

impl UserAlert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl TodoServiceError {
    /// Maps the error to the alert shown for `action`.
    pub fn user_alert(&self, action: TodoAction) -> UserAlert {
        match self {
            Self::Validation(TodoValidationError::BlankTitle) => {
                UserAlert::new("Validation Error", "Task title is required.")
            }
            Self::Validation(err) => UserAlert::new("Validation Error", err.to_string()),
            Self::TodoNotFound(_) => UserAlert::new("Error", "Task not found."),
            _ => match action {
                TodoAction::Load => UserAlert::new("Error", "Failed to load tasks. Please try again."),
                TodoAction::Create => UserAlert::new("Error", "Failed to add task. Please try again."),
                TodoAction::Update => {
                    UserAlert::new("Error", "Failed to update task. Please try again.")
                }
                TodoAction::Delete => {
                    UserAlert::new("Deletion Error", "Failed to delete task. Please try again.")
                }
                TodoAction::Reorder => {
                    UserAlert::new("Reorder Error", "Failed to save the new order.")
                }
                TodoAction::ClearCompleted => UserAlert::new(
                    "Error",
                    "Failed to clear completed tasks. Please try again.",
                ),
            },
        }
    }
}

/// Input for the add-task flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Falls back to the service default owner.
    pub user_id: Option<String>,
}

impl CreateTodoRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Input for the edit-task flow. Completion is left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Per-id result of a batch delete.
#[derive(Debug, Default)]
pub struct BatchDeleteOutcome {
    pub deleted: Vec<TodoId>,
    pub failed: Vec<(TodoId, TodoServiceError)>,
}

impl BatchDeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// One alert per failed id, worded like the single-delete alert.
    pub fn alerts(&self) -> Vec<UserAlert> {
        self.failed
            .iter()
            .map(|(id, _)| {
                UserAlert::new(
                    "Deletion Error",
                    format!("Failed to delete task {id}. Please try again."),
                )
            })
            .collect()
    }
}

/// Todo service facade over repository implementations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
    default_user_id: String,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service owning todos as `anonymous`.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            default_user_id: DEFAULT_USER_ID.to_string(),
        }
    }

    /// Creates a service using the owner configured in `config`.
    pub fn with_config(repo: R, config: &TodoConfig) -> Self {
        Self {
            repo,
            default_user_id: config.default_user_id.clone(),
        }
    }

    pub fn default_user_id(&self) -> &str {
        &self.default_user_id
    }

    /// Lists all todos in display order.
    pub fn list_todos(&self) -> ServiceResult<Vec<Todo>> {
        Ok(self.repo.list_todos()?)
    }

    pub fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        self.repo.get_todo(id)
    }

    /// Appends a new todo after trimming input.
    ///
    /// A blank title fails with `Validation` without touching the repository.
    pub fn create_todo(&self, request: CreateTodoRequest) -> ServiceResult<Todo> {
        let title = normalize_title(&request.title)?;
        let user_id = request
            .user_id
            .and_then(|value| normalize_optional_text(Some(value)))
            .unwrap_or_else(|| self.default_user_id.clone());
        let new_todo = NewTodo {
            title,
            description: normalize_optional_text(request.description),
            due_date: request.due_date,
            user_id,
        };

        let todo = self.repo.create_todo(&new_todo).inspect_err(|err| {
            warn!("event=todo_create module=service status=error error={err}");
        })?;
        info!(
            "event=todo_create module=service status=ok id={} position={}",
            todo.id, todo.position
        );
        Ok(todo)
    }

    /// Applies a patch after trimming and validating any new title.
    pub fn update_todo(&self, id: TodoId, patch: TodoPatch) -> ServiceResult<Todo> {
        let mut patch = patch;
        if let Some(title) = patch.title.take() {
            patch.title = Some(normalize_title(&title)?);
        }
        if let Some(description) = patch.description.take() {
            patch.description = Some(normalize_optional_text(description));
        }

        let todo = self.repo.update_todo(id, &patch).inspect_err(|err| {
            warn!("event=todo_update module=service status=error id={id} error={err}");
        })?;
        info!("event=todo_update module=service status=ok id={id}");
        Ok(todo)
    }

    /// Replaces title, description and due date of one todo.
    pub fn edit_todo(&self, id: TodoId, request: EditTodoRequest) -> ServiceResult<Todo> {
        let patch = TodoPatch {
            title: Some(request.title),
            description: Some(request.description),
            due_date: Some(request.due_date),
            ..TodoPatch::default()
        };
        self.update_todo(id, patch)
    }

    pub fn set_completed(&self, id: TodoId, completed: bool) -> ServiceResult<Todo> {
        self.update_todo(id, TodoPatch::completed(completed))
    }

    /// Flips the completion flag of one todo.
    pub fn toggle_completed(&self, id: TodoId) -> ServiceResult<Todo> {
        let current = self
            .repo
            .get_todo(id)?
            .ok_or(TodoServiceError::TodoNotFound(id))?;
        self.set_completed(id, !current.completed)
    }

    pub fn delete_todo(&self, id: TodoId) -> ServiceResult<()> {
        self.repo.delete_todo(id).inspect_err(|err| {
            warn!("event=todo_delete module=service status=error id={id} error={err}");
        })?;
        info!("event=todo_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Deletes each id independently; one failure does not stop the rest.
    pub fn delete_many(&self, ids: &[TodoId]) -> BatchDeleteOutcome {
        let mut outcome = BatchDeleteOutcome::default();
        for &id in ids {
            match self.delete_todo(id) {
                Ok(()) => outcome.deleted.push(id),
                Err(err) => outcome.failed.push((id, err)),
            }
        }
        outcome
    }

    /// Removes every completed todo and returns how many were removed.
    pub fn clear_completed(&self) -> ServiceResult<usize> {
        let removed = self.repo.clear_completed().inspect_err(|err| {
            warn!("event=todo_clear_completed module=service status=error error={err}");
        })?;
        info!("event=todo_clear_completed module=service status=ok removed={removed}");
        Ok(removed)
    }

    /// Persists `ordered_ids` as positions `0..n-1` in one batch.
    pub fn reorder(&self, ordered_ids: &[TodoId]) -> ServiceResult<Vec<PositionUpdate>> {
        let updates = sequential_positions(ordered_ids)?;
        self.apply_positions(&updates)?;
        Ok(updates)
    }

    /// Sends a precomputed position batch.
    pub fn apply_positions(&self, updates: &[PositionUpdate]) -> ServiceResult<()> {
        self.repo.reorder_todos(updates).inspect_err(|err| {
            warn!(
                "event=todo_reorder module=service status=error count={} error={err}",
                updates.len()
            );
        })?;
        info!(
            "event=todo_reorder module=service status=ok count={}",
            updates.len()
        );
        Ok(())
    }

    pub fn update_position(&self, id: TodoId, position: i64) -> ServiceResult<()> {
        self.repo.update_todo_position(id, position)?;
        Ok(())
    }

    /// Backfills positions for rows stored without one.
    pub fn migrate_positions(&self) -> ServiceResult<usize> {
        let patched = self.repo.backfill_positions()?;
        info!("event=todo_backfill_positions module=service status=ok patched={patched}");
        Ok(patched)
    }
}

/// Assigns positions `0..n-1` in slice order.
///
/// Fails on the first id that appears twice.
pub fn sequential_positions(ordered_ids: &[TodoId]) -> ServiceResult<Vec<PositionUpdate>> {
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    ordered_ids
        .iter()
        .enumerate()
        .map(|(index, &id)| {
            if !seen.insert(id) {
                return Err(TodoServiceError::DuplicateId(id));
            }
            Ok(PositionUpdate {
                id,
                position: index as i64,
            })
        })
        .collect()
}

fn normalize_title(title: &str) -> Result<String, TodoValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::BlankTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
