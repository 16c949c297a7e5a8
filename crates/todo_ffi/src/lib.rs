//! Flutter bridge surface for the todo core.

pub mod api;
