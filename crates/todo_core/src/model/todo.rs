//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its mutable-field patch shape.
//! - Validate records before they are persisted or after they are read.
//!
//! # Invariants
//! - `id` is stable and never nil.
//! - `title` is never blank.
//! - `position` defines display order; uniqueness is not enforced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one todo record.
pub type TodoId = Uuid;

/// Owner placeholder used until real accounts exist.
pub const DEFAULT_USER_ID: &str = "anonymous";

/// Calendar format used for `due_date` on the wire and in storage.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation failures for todo records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    NilId,
    BlankTitle,
    BlankUserId,
    InvalidTimestamps { created_at: i64, updated_at: i64 },
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "todo id must not be nil"),
            Self::BlankTitle => write!(f, "todo title must not be blank"),
            Self::BlankUserId => write!(f, "todo user_id must not be blank"),
            Self::InvalidTimestamps {
                created_at,
                updated_at,
            } => write!(
                f,
                "todo updated_at ({updated_at}) is earlier than created_at ({created_at})"
            ),
        }
    }
}

impl Error for TodoValidationError {}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// Calendar date without time zone.
    pub due_date: Option<NaiveDate>,
    /// Epoch milliseconds at whole-second resolution (SQLite
    /// `strftime('%s')` times 1000); todos created within the same second
    /// share a value.
    pub created_at: i64,
    /// Same resolution as `created_at`. Refreshed by every mutation.
    pub updated_at: i64,
    pub user_id: String,
    pub position: i64,
}

impl Todo {
    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.id.is_nil() {
            return Err(TodoValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::BlankTitle);
        }
        if self.user_id.trim().is_empty() {
            return Err(TodoValidationError::BlankUserId);
        }
        if self.updated_at < self.created_at {
            return Err(TodoValidationError::InvalidTimestamps {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Applies a patch in place. Does not touch timestamps.
    pub fn apply_patch(&mut self, patch: &TodoPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
    }

    /// `due_date` rendered as `YYYY-MM-DD`.
    pub fn due_date_label(&self) -> Option<String> {
        self.due_date
            .map(|date| date.format(DUE_DATE_FORMAT).to_string())
    }
}

/// Insert payload. Identity, position and timestamps are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub user_id: String,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::BlankTitle);
        }
        if self.user_id.trim().is_empty() {
            return Err(TodoValidationError::BlankUserId);
        }
        Ok(())
    }
}

/// Partial update of mutable fields.
///
/// `None` leaves a field unchanged. For nullable fields the inner `None`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub position: Option<i64>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One `{id, position}` pair of a batch reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: TodoId,
    pub position: i64,
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DUE_DATE_FORMAT).ok()
}
