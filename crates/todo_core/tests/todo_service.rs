use std::cell::Cell;
use std::rc::Rc;
use todo_core::db::open_db_in_memory;
use todo_core::{
    CreateTodoRequest, EditTodoRequest, NewTodo, PositionUpdate, RepoError, RepoResult,
    SqliteTodoRepository, Todo, TodoAction, TodoConfig, TodoId, TodoPatch, TodoRepository,
    TodoService, TodoServiceError, TodoValidationError,
};
use uuid::Uuid;

/// Repository double that counts calls and fails every one of them.
#[derive(Default)]
struct CountingRepo {
    calls: Rc<Cell<usize>>,
}

impl CountingRepo {
    fn hit<T>(&self) -> RepoResult<T> {
        self.calls.set(self.calls.get() + 1);
        Err(RepoError::InvalidData("backend unavailable".to_string()))
    }
}

impl TodoRepository for CountingRepo {
    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        self.hit()
    }
    fn get_todo(&self, _id: TodoId) -> RepoResult<Option<Todo>> {
        self.hit()
    }
    fn create_todo(&self, _new_todo: &NewTodo) -> RepoResult<Todo> {
        self.hit()
    }
    fn update_todo(&self, _id: TodoId, _patch: &TodoPatch) -> RepoResult<Todo> {
        self.hit()
    }
    fn update_todo_position(&self, _id: TodoId, _position: i64) -> RepoResult<()> {
        self.hit()
    }
    fn reorder_todos(&self, _updates: &[PositionUpdate]) -> RepoResult<()> {
        self.hit()
    }
    fn delete_todo(&self, _id: TodoId) -> RepoResult<()> {
        self.hit()
    }
    fn clear_completed(&self) -> RepoResult<usize> {
        self.hit()
    }
    fn backfill_positions(&self) -> RepoResult<usize> {
        self.hit()
    }
}

#[test]
fn blank_title_is_rejected_without_backend_call() {
    let repo = CountingRepo::default();
    let calls = Rc::clone(&repo.calls);
    let service = TodoService::new(repo);

    for title in ["", "   ", "\t\n"] {
        let err = service
            .create_todo(CreateTodoRequest::titled(title))
            .unwrap_err();
        assert!(matches!(
            err,
            TodoServiceError::Validation(TodoValidationError::BlankTitle)
        ));
        assert_eq!(
            err.user_alert(TodoAction::Create).message,
            "Task title is required."
        );
    }

    let err = service
        .edit_todo(
            Uuid::new_v4(),
            EditTodoRequest {
                title: "  ".to_string(),
                ..EditTodoRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, TodoServiceError::Validation(_)));
    assert_eq!(calls.get(), 0);
}

#[test]
fn backend_failure_maps_to_action_alert() {
    let repo = CountingRepo::default();
    let calls = Rc::clone(&repo.calls);
    let service = TodoService::new(repo);

    let err = service
        .create_todo(CreateTodoRequest::titled("valid"))
        .unwrap_err();
    assert!(matches!(err, TodoServiceError::Repo(_)));
    let alert = err.user_alert(TodoAction::Create);
    assert_eq!(alert.title, "Error");
    assert_eq!(alert.message, "Failed to add task. Please try again.");

    let err = service.delete_todo(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.user_alert(TodoAction::Delete).title, "Deletion Error");
    assert_eq!(calls.get(), 2);
}

#[test]
fn create_trims_input_and_uses_configured_owner() {
    let conn = open_db_in_memory().unwrap();
    let config = TodoConfig {
        default_user_id: "alice".to_string(),
        ..TodoConfig::default()
    };
    let service = TodoService::with_config(SqliteTodoRepository::try_new(&conn).unwrap(), &config);

    let todo = service
        .create_todo(CreateTodoRequest {
            title: "  water plants  ".to_string(),
            description: Some("   ".to_string()),
            due_date: None,
            user_id: None,
        })
        .unwrap();
    assert_eq!(todo.title, "water plants");
    assert_eq!(todo.description, None);
    assert_eq!(todo.user_id, "alice");

    let explicit = service
        .create_todo(CreateTodoRequest {
            user_id: Some("bob".to_string()),
            ..CreateTodoRequest::titled("other")
        })
        .unwrap();
    assert_eq!(explicit.user_id, "bob");
}

#[test]
fn toggle_twice_restores_completion() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let todo = service
        .create_todo(CreateTodoRequest::titled("toggle me"))
        .unwrap();

    assert!(service.toggle_completed(todo.id).unwrap().completed);
    let back = service.toggle_completed(todo.id).unwrap();
    assert!(!back.completed);
    assert_eq!(back.title, todo.title);
    assert_eq!(back.position, todo.position);
    assert_eq!(back.created_at, todo.created_at);
}

#[test]
fn edit_keeps_completion_and_reports_missing_task() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let todo = service
        .create_todo(CreateTodoRequest::titled("draft"))
        .unwrap();
    service.set_completed(todo.id, true).unwrap();

    let edited = service
        .edit_todo(
            todo.id,
            EditTodoRequest {
                title: " final ".to_string(),
                description: Some("details".to_string()),
                due_date: todo_core::parse_due_date("2026-12-24"),
            },
        )
        .unwrap();
    assert_eq!(edited.title, "final");
    assert_eq!(edited.description.as_deref(), Some("details"));
    assert!(edited.completed);

    let missing = Uuid::new_v4();
    let err = service
        .edit_todo(missing, EditTodoRequest {
            title: "x".to_string(),
            ..EditTodoRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, TodoServiceError::TodoNotFound(id) if id == missing));
    assert_eq!(err.user_alert(TodoAction::Update).message, "Task not found.");
}

#[test]
fn reorder_assigns_sequential_positions() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let ids: Vec<TodoId> = (0..3)
        .map(|i| {
            service
                .create_todo(CreateTodoRequest::titled(format!("t{i}")))
                .unwrap()
                .id
        })
        .collect();

    let order = vec![ids[1], ids[2], ids[0]];
    let updates = service.reorder(&order).unwrap();
    assert_eq!(
        updates.iter().map(|u| u.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    let listed: Vec<TodoId> = service.list_todos().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(listed, order);

    let err = service.reorder(&[ids[0], ids[0]]).unwrap_err();
    assert!(matches!(err, TodoServiceError::DuplicateId(_)));
}

#[test]
fn clear_completed_leaves_prior_active_count() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    for i in 0..5 {
        let todo = service
            .create_todo(CreateTodoRequest::titled(format!("t{i}")))
            .unwrap();
        if i % 2 == 0 {
            service.set_completed(todo.id, true).unwrap();
        }
    }
    let active_before = todo_core::active_count(&service.list_todos().unwrap());

    assert_eq!(service.clear_completed().unwrap(), 3);
    assert_eq!(service.list_todos().unwrap().len(), active_before);
}

#[test]
fn delete_many_reports_each_failure() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());
    let a = service.create_todo(CreateTodoRequest::titled("a")).unwrap();
    let missing = Uuid::new_v4();

    let outcome = service.delete_many(&[a.id, missing]);
    assert_eq!(outcome.deleted, vec![a.id]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, missing);
    assert!(!outcome.is_complete());
    assert_eq!(outcome.alerts().len(), 1);
}
