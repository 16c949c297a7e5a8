//! Confirmation prompts for destructive or reversing actions.

use crate::model::todo::Todo;

/// Confirmation dialog content. Cancel is always available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: &'static str,
    pub destructive: bool,
}

impl ConfirmPrompt {
    pub fn delete_task() -> Self {
        Self {
            title: "Delete Task".to_string(),
            message: "Are you sure you want to delete this task?".to_string(),
            confirm_label: "Delete",
            destructive: true,
        }
    }

    pub fn delete_selected(count: usize) -> Self {
        let noun = if count == 1 { "task" } else { "tasks" };
        Self {
            title: "Delete Selected Tasks".to_string(),
            message: format!("Are you sure you want to delete {count} {noun}?"),
            confirm_label: "Delete",
            destructive: true,
        }
    }

    pub fn undo_task() -> Self {
        Self {
            title: "Undo Task".to_string(),
            message: "Are you sure you want to mark this task as undone?".to_string(),
            confirm_label: "Undo",
            destructive: false,
        }
    }
}

/// What pressing Done/Undo on a todo should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionIntent {
    /// Apply `completed` right away.
    Apply { completed: bool },
    /// Ask first; apply `completed` only when confirmed.
    Confirm {
        prompt: ConfirmPrompt,
        completed: bool,
    },
}

/// Marking done is immediate; reopening a completed todo asks first.
pub fn completion_intent(todo: &Todo) -> CompletionIntent {
    if todo.completed {
        CompletionIntent::Confirm {
            prompt: ConfirmPrompt::undo_task(),
            completed: false,
        }
    } else {
        CompletionIntent::Apply { completed: true }
    }
}
