//! Optimistic list cache for drag-and-drop reordering.
//!
//! # Responsibility
//! - Hold the client copy of the list keyed by todo id, in display order.
//! - Reindex the visible list on drop and produce one batch of positions.
//!
//! # Invariants
//! - `sync` replaces local state with the authoritative list
//!   (last-write-wins from storage).
//! - A failed reorder is reported but never rolled back locally; the next
//!   `sync` reconciles.
//! - Display order is `position ASC, created_at ASC, id ASC`, same as storage.

use crate::model::todo::{PositionUpdate, Todo, TodoId};
use crate::repo::todo_repo::TodoRepository;
use crate::service::todo_service::{
    sequential_positions, ServiceResult, TodoAction, TodoService, TodoServiceError, UserAlert,
};
use crate::view::filter::TodoFilter;
use indexmap::IndexMap;
use log::warn;

/// Client-side list state.
#[derive(Debug, Clone, Default)]
pub struct TodoListState {
    items: IndexMap<TodoId, Todo>,
    loaded: bool,
    divergent: bool,
    last_alert: Option<UserAlert>,
}

impl TodoListState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` until the first sync; the UI shows a loading placeholder.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether local order may differ from storage after a failed reorder.
    pub fn is_divergent(&self) -> bool {
        self.divergent
    }

    pub fn last_alert(&self) -> Option<&UserAlert> {
        self.last_alert.as_ref()
    }

    pub fn take_alert(&mut self) -> Option<UserAlert> {
        self.last_alert.take()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.items.get(&id)
    }

    /// All cached todos in display order.
    pub fn todos(&self) -> impl Iterator<Item = &Todo> {
        self.items.values()
    }

    /// Cached todos matching `filter`, in display order.
    pub fn visible(&self, filter: TodoFilter) -> Vec<&Todo> {
        self.items
            .values()
            .filter(|todo| filter.matches(todo))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.items.values().filter(|todo| !todo.completed).count()
    }

    /// Replaces local state with an authoritative list.
    pub fn sync(&mut self, todos: Vec<Todo>) {
        let mut todos = todos;
        sort_for_display(&mut todos);
        self.items = todos.into_iter().map(|todo| (todo.id, todo)).collect();
        self.loaded = true;
        self.divergent = false;
    }

    /// Fetches the list through `service` and syncs. Keeps the previous state
    /// and records an alert on failure.
    pub fn refresh<R: TodoRepository>(&mut self, service: &TodoService<R>) -> ServiceResult<()> {
        match service.list_todos() {
            Ok(todos) => {
                self.sync(todos);
                Ok(())
            }
            Err(err) => {
                self.last_alert = Some(err.user_alert(TodoAction::Load));
                Err(err)
            }
        }
    }

    /// Moves the visible item at `from` to index `to` and reindexes the
    /// visible list `0..n-1`.
    ///
    /// Returns the batch to persist, or `None` when the move is a no-op or
    /// out of range. Todos hidden by `filter` keep their positions.
    pub fn move_item(
        &mut self,
        filter: TodoFilter,
        from: usize,
        to: usize,
    ) -> Option<Vec<PositionUpdate>> {
        let mut order: Vec<TodoId> = self.visible(filter).iter().map(|todo| todo.id).collect();
        if from >= order.len() || to >= order.len() || from == to {
            return None;
        }
        let moved = order.remove(from);
        order.insert(to, moved);
        sequential_positions(&order)
            .ok()
            .map(|updates| self.apply_local(updates))
    }

    /// Applies a full target order for the listed ids, reindexed `0..n-1`.
    pub fn move_to_order(&mut self, ordered_ids: &[TodoId]) -> ServiceResult<Vec<PositionUpdate>> {
        if let Some(missing) = ordered_ids.iter().find(|id| !self.items.contains_key(*id)) {
            return Err(TodoServiceError::TodoNotFound(*missing));
        }
        let updates = sequential_positions(ordered_ids)?;
        Ok(self.apply_local(updates))
    }

    /// Records a failed reorder. Local order is kept.
    pub fn reorder_failed(&mut self, err: &TodoServiceError) {
        warn!("event=todo_reorder module=view status=error rollback=false error={err}");
        self.divergent = true;
        self.last_alert = Some(err.user_alert(TodoAction::Reorder));
    }

    /// Drop handler: optimistic local move followed by one batch call.
    ///
    /// Returns `Ok(false)` when nothing moved.
    pub fn drop_item<R: TodoRepository>(
        &mut self,
        service: &TodoService<R>,
        filter: TodoFilter,
        from: usize,
        to: usize,
    ) -> ServiceResult<bool> {
        let Some(updates) = self.move_item(filter, from, to) else {
            return Ok(false);
        };
        if let Err(err) = service.apply_positions(&updates) {
            self.reorder_failed(&err);
            return Err(err);
        }
        Ok(true)
    }

    fn apply_local(&mut self, updates: Vec<PositionUpdate>) -> Vec<PositionUpdate> {
        for update in &updates {
            if let Some(todo) = self.items.get_mut(&update.id) {
                todo.position = update.position;
            }
        }
        self.items
            .sort_by(|_, left, _, right| display_cmp(left, right));
        updates
    }
}

fn sort_for_display(todos: &mut [Todo]) {
    todos.sort_by(display_cmp);
}

fn display_cmp(left: &Todo, right: &Todo) -> std::cmp::Ordering {
    left.position
        .cmp(&right.position)
        .then(left.created_at.cmp(&right.created_at))
        .then(left.id.cmp(&right.id))
}
