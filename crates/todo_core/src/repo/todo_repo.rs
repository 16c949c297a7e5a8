//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide record access over the `todos` table: list, create, patch,
//!   reposition, delete, clear completed and position backfill.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the record before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listing is deterministic: `position ASC, created_at ASC, id ASC`.
//! - Position uniqueness and contiguity are not enforced.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::todo::{
    parse_due_date, NewTodo, PositionUpdate, Todo, TodoId, TodoPatch, TodoValidationError,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    completed,
    due_date,
    user_id,
    position,
    created_at,
    updated_at
FROM todos";

const TODO_ORDER_SQL: &str = "ORDER BY position ASC, created_at ASC, id ASC";

const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for todo persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TodoValidationError),
    Db(DbError),
    NotFound(TodoId),
    InvalidData(String),
    /// The highest stored position leaves no room to append after it.
    PositionOverflow { max_position: i64 },
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::PositionOverflow { max_position } => {
                write!(f, "cannot append after position {max_position}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "todo repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::PositionOverflow { .. } => None,
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record access contract for todos.
pub trait TodoRepository {
    /// Lists every todo in display order.
    fn list_todos(&self) -> RepoResult<Vec<Todo>>;
    /// Loads one todo by id.
    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    /// Appends one todo at `max(position) + 1`.
    fn create_todo(&self, new_todo: &NewTodo) -> RepoResult<Todo>;
    /// Patches a subset of mutable fields and refreshes `updated_at`.
    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo>;
    /// Sets the position of one todo.
    fn update_todo_position(&self, id: TodoId, position: i64) -> RepoResult<()>;
    /// Applies a batch of positions all together.
    fn reorder_todos(&self, updates: &[PositionUpdate]) -> RepoResult<()>;
    /// Removes one todo.
    fn delete_todo(&self, id: TodoId) -> RepoResult<()>;
    /// Removes every completed todo and returns how many were removed.
    fn clear_completed(&self) -> RepoResult<usize>;
    /// Assigns index-order positions to rows without one.
    fn backfill_positions(&self) -> RepoResult<usize>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates a repository from a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} {TODO_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        load_todo(self.conn, id)
    }

    fn create_todo(&self, new_todo: &NewTodo) -> RepoResult<Todo> {
        new_todo.validate()?;

        let id = Uuid::new_v4();
        let position = next_position(self.conn)?;
        self.conn.execute(
            &format!(
                "INSERT INTO todos (
                    id,
                    title,
                    description,
                    completed,
                    due_date,
                    user_id,
                    position,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, {NOW_MS_SQL}, {NOW_MS_SQL});"
            ),
            params![
                id.to_string(),
                new_todo.title.as_str(),
                new_todo.description.as_deref(),
                new_todo.due_date.map(|date| date.to_string()),
                new_todo.user_id.as_str(),
                position,
            ],
        )?;

        load_todo(self.conn, id)?.ok_or(RepoError::NotFound(id))
    }

    fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut todo = load_todo(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        todo.apply_patch(patch);
        todo.validate()?;

        tx.execute(
            &format!(
                "UPDATE todos
                 SET
                    title = ?2,
                    description = ?3,
                    completed = ?4,
                    due_date = ?5,
                    position = ?6,
                    updated_at = MAX({NOW_MS_SQL}, created_at)
                 WHERE id = ?1;"
            ),
            params![
                id.to_string(),
                todo.title.as_str(),
                todo.description.as_deref(),
                bool_to_int(todo.completed),
                todo.due_date.map(|date| date.to_string()),
                todo.position,
            ],
        )?;

        let updated = load_todo(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn update_todo_position(&self, id: TodoId, position: i64) -> RepoResult<()> {
        let changed = set_position(self.conn, id, position)?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn reorder_todos(&self, updates: &[PositionUpdate]) -> RepoResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on an early return rolls the batch back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for update in updates {
            if set_position(&tx, update.id, update.position)? == 0 {
                return Err(RepoError::NotFound(update.id));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn clear_completed(&self) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM todos WHERE completed = 1;", [])?;
        Ok(removed)
    }

    fn backfill_positions(&self) -> RepoResult<usize> {
        let patched = self.conn.execute(
            &format!(
                "UPDATE todos
                 SET
                    position = (
                        SELECT COUNT(*)
                        FROM todos AS prior
                        WHERE prior.created_at < todos.created_at
                           OR (prior.created_at = todos.created_at AND prior.rowid < todos.rowid)
                    ),
                    updated_at = MAX({NOW_MS_SQL}, created_at)
                 WHERE position IS NULL;"
            ),
            [],
        )?;
        Ok(patched)
    }
}

fn load_todo(conn: &Connection, id: TodoId) -> RepoResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }
    Ok(None)
}

fn next_position(conn: &Connection) -> RepoResult<i64> {
    let max: Option<i64> =
        conn.query_row("SELECT MAX(position) FROM todos;", [], |row| row.get(0))?;
    match max {
        None => Ok(0),
        Some(max_position) => max_position
            .checked_add(1)
            .ok_or(RepoError::PositionOverflow { max_position }),
    }
}

fn set_position(conn: &Connection, id: TodoId, position: i64) -> RepoResult<usize> {
    let changed = conn.execute(
        &format!(
            "UPDATE todos
             SET
                position = ?2,
                updated_at = MAX({NOW_MS_SQL}, created_at)
             WHERE id = ?1;"
        ),
        params![id.to_string(), position],
    )?;
    Ok(changed)
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in todos.id")))?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed"
            )));
        }
    };

    let due_date = match row.get::<_, Option<String>>("due_date")? {
        None => None,
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(parse_due_date(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid due date `{value}` in todos.due_date"))
        })?),
    };

    let position = row.get::<_, Option<i64>>("position")?.ok_or_else(|| {
        RepoError::InvalidData(format!(
            "todo {id} has no position; run the position backfill"
        ))
    })?;

    let todo = Todo {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        completed,
        due_date,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        user_id: row.get("user_id")?,
        position,
    };
    todo.validate()?;
    Ok(todo)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
