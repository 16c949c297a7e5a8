//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define record-access contracts for todos.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate records before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod todo_repo;
