//! Domain model for todo records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every record is identified by a stable `TodoId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod todo;
