//! Multi-select state for batch actions.
//!
//! # Invariants
//! - Selection mode is on exactly while at least one id is selected.
//! - Batch delete always goes through a `ConfirmPrompt` first.

use crate::model::todo::{Todo, TodoId};
use crate::repo::todo_repo::TodoRepository;
use crate::service::todo_service::{BatchDeleteOutcome, TodoService};
use crate::view::prompt::ConfirmPrompt;
use indexmap::IndexSet;

/// Selected ids in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: IndexSet<TodoId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether batch actions are shown.
    pub fn is_selection_mode(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn is_selected(&self, id: TodoId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> Vec<TodoId> {
        self.selected.iter().copied().collect()
    }

    /// Adds or removes one id. The first selection enters selection mode and
    /// removing the last one exits it.
    pub fn set_selected(&mut self, id: TodoId, selected: bool) {
        if selected {
            self.selected.insert(id);
        } else {
            self.selected.shift_remove(&id);
        }
    }

    pub fn toggle(&mut self, id: TodoId) {
        let selected = !self.is_selected(id);
        self.set_selected(id, selected);
    }

    /// Cancels selection mode.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drops ids that are no longer in `todos`, e.g. after a refresh.
    pub fn retain_existing(&mut self, todos: &[Todo]) {
        self.selected
            .retain(|id| todos.iter().any(|todo| todo.id == *id));
    }

    /// Header text shown while selecting.
    pub fn summary_label(&self) -> String {
        let count = self.len();
        let noun = if count == 1 { "task" } else { "tasks" };
        format!("{count} {noun} selected")
    }

    /// Prompt to show before deleting the selection, or `None` when nothing
    /// is selected.
    pub fn request_batch_delete(&self) -> Option<ConfirmPrompt> {
        if self.selected.is_empty() {
            return None;
        }
        Some(ConfirmPrompt::delete_selected(self.len()))
    }

    /// Deletes every selected id after the user confirmed.
    ///
    /// The selection is cleared whether or not every delete succeeded;
    /// failures are reported through the outcome.
    pub fn confirm_batch_delete<R: TodoRepository>(
        &mut self,
        service: &TodoService<R>,
    ) -> BatchDeleteOutcome {
        let ids = self.ids();
        self.clear();
        service.delete_many(&ids)
    }
}
