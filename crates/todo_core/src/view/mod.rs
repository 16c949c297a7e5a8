//! Client-side list state.
//!
//! # Responsibility
//! - Display filtering by completion status.
//! - Ephemeral multi-select with confirmed batch delete.
//! - Optimistic drag-and-drop reorder over a cache resynced from storage.
//!
//! # Invariants
//! - Nothing in this module mutates persisted state except through
//!   `TodoService`.
//! - Local state is replaced wholesale on every authoritative sync.

pub mod filter;
pub mod list_state;
pub mod prompt;
pub mod selection;
