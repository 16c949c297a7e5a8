//! Completion-status filter for the list view.

use crate::model::todo::Todo;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Which todos the list shows. Display-only; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TodoFilter {
    pub const ALL: [TodoFilter; 3] = [TodoFilter::All, TodoFilter::Active, TodoFilter::Completed];

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl Display for TodoFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!(
                "unsupported filter `{other}`; expected all|active|completed"
            )),
        }
    }
}

/// Todos matching `filter`, preserving input order.
pub fn filter_todos(todos: &[Todo], filter: TodoFilter) -> Vec<&Todo> {
    todos.iter().filter(|todo| filter.matches(todo)).collect()
}

/// Number of todos not yet completed.
pub fn active_count(todos: &[Todo]) -> usize {
    todos.iter().filter(|todo| !todo.completed).count()
}

/// Footer counter text.
pub fn items_left_label(active: usize) -> String {
    format!("{active} items left")
}
