//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use todo_core::TodoFilter;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "A small position-ordered todo list", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides config and TODO_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List todos in display order
    List(ListArgs),
    /// Append a todo
    Add(AddArgs),
    /// Replace title, description and due date
    Edit(EditArgs),
    /// Mark a todo as done
    Done(RefArg),
    /// Mark a completed todo as not done
    Undo(ConfirmRefArg),
    /// Delete one or more todos
    Rm(RmArgs),
    /// Delete all completed todos
    Clear,
    /// Move a todo within the (filtered) list
    Mv(MvArgs),
    /// Set the full order; listed todos get positions 0..n-1
    Reorder(ReorderArgs),
    /// Backfill positions for legacy todos
    Migrate,
    /// Print core version and health check
    Ping,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// all | active | completed
    #[arg(long, short, default_value = "all")]
    pub filter: TodoFilter,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,
    #[arg(long, short)]
    pub description: Option<String>,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
    /// Owner id (defaults to the configured user)
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Todo id or 1-based list number
    pub todo: String,
    #[arg(long, short)]
    pub title: String,
    #[arg(long, short)]
    pub description: Option<String>,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug)]
pub struct RefArg {
    /// Todo id or 1-based list number
    pub todo: String,
}

#[derive(Args, Debug)]
pub struct ConfirmRefArg {
    /// Todo id or 1-based list number
    pub todo: String,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Todo ids or 1-based list numbers
    #[arg(required = true)]
    pub todos: Vec<String>,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct MvArgs {
    /// 1-based number of the todo to move
    pub from: usize,
    /// 1-based target number
    pub to: usize,
    /// List the move applies to
    #[arg(long, short, default_value = "all")]
    pub filter: TodoFilter,
}

#[derive(Args, Debug)]
pub struct ReorderArgs {
    /// Todo ids or 1-based list numbers, in the new order
    #[arg(required = true)]
    pub todos: Vec<String>,
}
