//! Command handlers.
//!
//! Every handler works on one open connection and reports failures with the
//! same alert wording the app shows.

use crate::commands::*;
use chrono::NaiveDate;
use log::info;
use std::error::Error;
use std::io::{self, BufRead, Write};
use todo_core::db::open_db;
use todo_core::{
    completion_intent, init_logging_from_config, items_left_label, parse_due_date,
    CompletionIntent, ConfirmPrompt, CreateTodoRequest, EditTodoRequest, SelectionState,
    SqliteTodoRepository, Todo, TodoAction, TodoConfig, TodoFilter, TodoId, TodoListState,
    TodoService, TodoServiceError,
};
use uuid::Uuid;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;
type Service<'conn> = TodoService<SqliteTodoRepository<'conn>>;

pub fn dispatch(cli: Cli) -> CliResult {
    let config = load_config(&cli)?;
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    if let Commands::Ping = cli.command {
        println!("todo_core ping={}", todo_core::ping());
        println!("todo_core version={}", todo_core::core_version());
        return Ok(());
    }

    let conn = open_db(&config.db_path)?;
    let repo = SqliteTodoRepository::try_new(&conn)?;
    let service = TodoService::with_config(repo, &config);
    let json = cli.json;

    match cli.command {
        Commands::List(args) => cmd_list(&service, args, json),
        Commands::Add(args) => cmd_add(&service, args, json),
        Commands::Edit(args) => cmd_edit(&service, args, json),
        Commands::Done(args) => cmd_set_completed(&service, &args.todo, true, true, json),
        Commands::Undo(args) => cmd_set_completed(&service, &args.todo, false, args.yes, json),
        Commands::Rm(args) => cmd_rm(&service, args),
        Commands::Clear => cmd_clear(&service),
        Commands::Mv(args) => cmd_mv(&service, args, json),
        Commands::Reorder(args) => cmd_reorder(&service, args, json),
        Commands::Migrate => cmd_migrate(&service),
        Commands::Ping => Ok(()),
    }
}

/// Defaults, then the TOML file, then `TODO_*` variables, then `--db`.
fn load_config(cli: &Cli) -> CliResult<TodoConfig> {
    let config = match &cli.config {
        Some(path) => TodoConfig::load(path)?,
        None => TodoConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(config)
}

fn cmd_list(service: &Service<'_>, args: ListArgs, json: bool) -> CliResult {
    let state = load_state(service)?;
    let visible = state.visible(args.filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    if visible.is_empty() {
        println!("No tasks.");
    }
    for (index, todo) in visible.iter().enumerate() {
        println!("{}", render_line(index + 1, todo));
    }
    println!("{}", items_left_label(state.active_count()));
    Ok(())
}

fn cmd_add(service: &Service<'_>, args: AddArgs, json: bool) -> CliResult {
    let request = CreateTodoRequest {
        title: args.title,
        description: args.description,
        due_date: parse_due_arg(args.due.as_deref())?,
        user_id: args.user,
    };
    let todo = service
        .create_todo(request)
        .map_err(|err| alert_error(err, TodoAction::Create))?;
    print_todo("Added", &todo, json)
}

fn cmd_edit(service: &Service<'_>, args: EditArgs, json: bool) -> CliResult {
    let state = load_state(service)?;
    let id = resolve_ref(&args.todo, &state)?;
    let request = EditTodoRequest {
        title: args.title,
        description: args.description,
        due_date: parse_due_arg(args.due.as_deref())?,
    };
    let todo = service
        .edit_todo(id, request)
        .map_err(|err| alert_error(err, TodoAction::Update))?;
    print_todo("Updated", &todo, json)
}

/// Done applies immediately; reopening a completed todo asks first.
fn cmd_set_completed(
    service: &Service<'_>,
    raw: &str,
    completed: bool,
    assume_yes: bool,
    json: bool,
) -> CliResult {
    let state = load_state(service)?;
    let id = resolve_ref(raw, &state)?;
    let todo = state
        .get(id)
        .ok_or_else(|| alert_error(TodoServiceError::TodoNotFound(id), TodoAction::Update))?;

    if todo.completed == completed {
        let status = if completed { "done" } else { "active" };
        println!("Task is already {status}.");
        return Ok(());
    }

    if let CompletionIntent::Confirm { prompt, .. } = completion_intent(todo) {
        if !assume_yes && !confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let todo = service
        .set_completed(id, completed)
        .map_err(|err| alert_error(err, TodoAction::Update))?;
    let verb = if completed { "Completed" } else { "Reopened" };
    print_todo(verb, &todo, json)
}

fn cmd_rm(service: &Service<'_>, args: RmArgs) -> CliResult {
    let state = load_state(service)?;
    let mut selection = select_refs(&args.todos, &state)?;
    let requested = selection.len();

    let prompt = if selection.len() == 1 {
        ConfirmPrompt::delete_task()
    } else {
        match selection.request_batch_delete() {
            Some(prompt) => prompt,
            None => return Ok(()),
        }
    };
    if !args.yes && !confirm(&prompt)? {
        println!("Cancelled.");
        return Ok(());
    }

    let outcome = selection.confirm_batch_delete(service);
    for alert in outcome.alerts() {
        eprintln!("{}: {}", alert.title, alert.message);
    }
    println!("{}", delete_summary(outcome.deleted.len(), requested));
    if outcome.is_complete() {
        Ok(())
    } else {
        Err(format!("{} task(s) could not be deleted", outcome.failed.len()).into())
    }
}

fn cmd_clear(service: &Service<'_>) -> CliResult {
    let removed = service
        .clear_completed()
        .map_err(|err| alert_error(err, TodoAction::ClearCompleted))?;
    println!("Cleared {removed} completed task(s).");
    Ok(())
}

/// Positions are 1-based in the listed (filtered) view.
fn cmd_mv(service: &Service<'_>, args: MvArgs, json: bool) -> CliResult {
    let mut state = load_state(service)?;
    let (Some(from), Some(to)) = (args.from.checked_sub(1), args.to.checked_sub(1)) else {
        return Err("list numbers start at 1".into());
    };

    match state.drop_item(service, args.filter, from, to) {
        Ok(false) => {
            println!("Nothing to move.");
            Ok(())
        }
        Ok(true) => {
            info!("event=cli_move module=cli status=ok filter={}", args.filter);
            cmd_list(service, ListArgs { filter: args.filter }, json)
        }
        Err(err) => match state.take_alert() {
            Some(alert) => Err(format!("{}: {}", alert.title, alert.message).into()),
            None => Err(err.into()),
        },
    }
}

fn cmd_reorder(service: &Service<'_>, args: ReorderArgs, json: bool) -> CliResult {
    let state = load_state(service)?;
    let ids = args
        .todos
        .iter()
        .map(|raw| resolve_ref(raw, &state))
        .collect::<Result<Vec<_>, _>>()?;
    let updates = service
        .reorder(&ids)
        .map_err(|err| alert_error(err, TodoAction::Reorder))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updates)?);
    } else {
        println!("Reordered {} task(s).", updates.len());
    }
    Ok(())
}

fn cmd_migrate(service: &Service<'_>) -> CliResult {
    let updated = service.migrate_positions()?;
    println!("Assigned positions to {updated} task(s).");
    Ok(())
}

fn load_state(service: &Service<'_>) -> CliResult<TodoListState> {
    let mut state = TodoListState::new();
    if let Err(err) = state.refresh(service) {
        return Err(alert_error(err, TodoAction::Load));
    }
    Ok(state)
}

/// Accepts a todo id or a 1-based number in the unfiltered list.
fn resolve_ref(raw: &str, state: &TodoListState) -> CliResult<TodoId> {
    let raw = raw.trim();
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }
    let number: usize = raw
        .parse()
        .map_err(|_| format!("`{raw}` is neither a todo id nor a list number"))?;
    number
        .checked_sub(1)
        .and_then(|index| state.todos().nth(index))
        .map(|todo| todo.id)
        .ok_or_else(|| format!("no task at list number {number}").into())
}

/// Repeated references to the same todo select it once.
fn select_refs(raws: &[String], state: &TodoListState) -> CliResult<SelectionState> {
    let mut selection = SelectionState::new();
    for raw in raws {
        selection.set_selected(resolve_ref(raw, state)?, true);
    }
    Ok(selection)
}

fn delete_summary(deleted: usize, requested: usize) -> String {
    format!("Deleted {deleted} of {requested}.")
}

fn parse_due_arg(raw: Option<&str>) -> CliResult<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_due_date(value)
            .map(Some)
            .ok_or_else(|| format!("invalid due date `{value}`; expected YYYY-MM-DD").into()),
    }
}

fn alert_error(err: TodoServiceError, action: TodoAction) -> Box<dyn Error> {
    let alert = err.user_alert(action);
    format!("{}: {}", alert.title, alert.message).into()
}

fn confirm(prompt: &ConfirmPrompt) -> CliResult<bool> {
    print!(
        "{}\n{} [{}/Cancel] (y/N) ",
        prompt.title, prompt.message, prompt.confirm_label
    );
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_todo(verb: &str, todo: &Todo, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(todo)?);
    } else {
        println!("{verb}: {} ({})", todo.title, todo.id);
    }
    Ok(())
}

fn render_line(number: usize, todo: &Todo) -> String {
    let mark = if todo.completed { "x" } else { " " };
    let mut line = format!("{number:>3}. [{mark}] {}", todo.title);
    if let Some(due) = todo.due_date_label() {
        line.push_str(&format!("  (due {due})"));
    }
    line
}
