use rusqlite::Connection;
use todo_core::db::open_db_in_memory;
use todo_core::{
    parse_due_date, NewTodo, PositionUpdate, RepoError, SqliteTodoRepository, TodoPatch,
    TodoRepository, TodoValidationError,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_and_get_roundtrip() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let mut new_todo = NewTodo::new("buy milk");
    new_todo.description = Some("2 liters".to_string());
    new_todo.due_date = parse_due_date("2026-10-20");
    let created = repo.create_todo(&new_todo).unwrap();

    let loaded = repo.get_todo(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.title, "buy milk");
    assert_eq!(loaded.description.as_deref(), Some("2 liters"));
    assert_eq!(loaded.due_date_label().as_deref(), Some("2026-10-20"));
    assert_eq!(loaded.user_id, "anonymous");
    assert!(!loaded.completed);
    assert!(loaded.created_at > 0);
    assert_eq!(loaded.created_at % 1000, 0, "timestamps are whole seconds in ms");
    assert_eq!(loaded.created_at, loaded.updated_at);
}

#[test]
fn first_todo_starts_at_zero_and_each_create_appends() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let first = repo.create_todo(&NewTodo::new("a")).unwrap();
    assert_eq!(first.position, 0);

    repo.update_todo_position(first.id, 41).unwrap();
    let second = repo.create_todo(&NewTodo::new("b")).unwrap();
    assert_eq!(second.position, 42);

    let third = repo.create_todo(&NewTodo::new("c")).unwrap();
    let max_before = repo
        .list_todos()
        .unwrap()
        .iter()
        .filter(|todo| todo.id != third.id)
        .map(|todo| todo.position)
        .max()
        .unwrap();
    assert!(third.position > max_before);
}

#[test]
fn create_after_maximal_position_reports_overflow_and_keeps_list_readable() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let last = repo.create_todo(&NewTodo::new("pinned last")).unwrap();
    repo.update_todo_position(last.id, i64::MAX).unwrap();

    let err = repo.create_todo(&NewTodo::new("one more")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::PositionOverflow { max_position } if max_position == i64::MAX
    ));

    let todos = repo.list_todos().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].position, i64::MAX);

    repo.update_todo_position(last.id, 7).unwrap();
    let appended = repo.create_todo(&NewTodo::new("one more")).unwrap();
    assert_eq!(appended.position, 8);
}

#[test]
fn create_rejects_blank_title() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let err = repo.create_todo(&NewTodo::new("   ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(TodoValidationError::BlankTitle)
    ));
    assert!(repo.list_todos().unwrap().is_empty());
}

#[test]
fn list_orders_by_position() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let a = repo.create_todo(&NewTodo::new("a")).unwrap();
    let b = repo.create_todo(&NewTodo::new("b")).unwrap();
    let c = repo.create_todo(&NewTodo::new("c")).unwrap();
    repo.update_todo_position(a.id, 10).unwrap();

    let ids: Vec<Uuid> = repo.list_todos().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);
}

#[test]
fn update_patches_only_given_fields() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let mut new_todo = NewTodo::new("draft");
    new_todo.description = Some("keep me".to_string());
    let created = repo.create_todo(&new_todo).unwrap();

    let patch = TodoPatch {
        title: Some("final".to_string()),
        ..TodoPatch::default()
    };
    let updated = repo.update_todo(created.id, &patch).unwrap();
    assert_eq!(updated.title, "final");
    assert_eq!(updated.description.as_deref(), Some("keep me"));
    assert_eq!(updated.position, created.position);
    assert!(updated.updated_at >= created.updated_at);

    let cleared = repo
        .update_todo(
            created.id,
            &TodoPatch {
                description: Some(None),
                ..TodoPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.description, None);
}

#[test]
fn update_with_blank_title_is_rejected_and_leaves_row_unchanged() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let created = repo.create_todo(&NewTodo::new("keep")).unwrap();

    let err = repo
        .update_todo(
            created.id,
            &TodoPatch {
                title: Some(String::new()),
                completed: Some(true),
                ..TodoPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    let loaded = repo.get_todo(created.id).unwrap().unwrap();
    assert_eq!(loaded.title, "keep");
    assert!(!loaded.completed);
}

#[test]
fn toggling_completion_twice_restores_record() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let original = repo.create_todo(&NewTodo::new("flip")).unwrap();

    let done = repo
        .update_todo(original.id, &TodoPatch::completed(true))
        .unwrap();
    assert!(done.completed);
    let undone = repo
        .update_todo(original.id, &TodoPatch::completed(false))
        .unwrap();

    let mut expected = original.clone();
    expected.updated_at = undone.updated_at;
    assert_eq!(undone, expected);
}

#[test]
fn missing_ids_return_not_found() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    assert!(repo.get_todo(missing).unwrap().is_none());
    assert!(matches!(
        repo.update_todo(missing, &TodoPatch::completed(true)),
        Err(RepoError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        repo.update_todo_position(missing, 3),
        Err(RepoError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        repo.delete_todo(missing),
        Err(RepoError::NotFound(id)) if id == missing
    ));
}

#[test]
fn delete_removes_row() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let keep = repo.create_todo(&NewTodo::new("keep")).unwrap();
    let removed = repo.create_todo(&NewTodo::new("drop")).unwrap();

    repo.delete_todo(removed.id).unwrap();

    let remaining = repo.list_todos().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
    assert!(repo.get_todo(removed.id).unwrap().is_none());
}

#[test]
fn reorder_with_permutation_lists_in_that_order() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let ids: Vec<Uuid> = ["a", "b", "c", "d"]
        .iter()
        .map(|title| repo.create_todo(&NewTodo::new(*title)).unwrap().id)
        .collect();

    let permutation = vec![ids[2], ids[0], ids[3], ids[1]];
    let updates: Vec<PositionUpdate> = permutation
        .iter()
        .enumerate()
        .map(|(index, id)| PositionUpdate {
            id: *id,
            position: index as i64,
        })
        .collect();
    repo.reorder_todos(&updates).unwrap();

    let listed: Vec<Uuid> = repo.list_todos().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(listed, permutation);
}

#[test]
fn reorder_with_unknown_id_rolls_back_whole_batch() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let a = repo.create_todo(&NewTodo::new("a")).unwrap();
    let b = repo.create_todo(&NewTodo::new("b")).unwrap();
    let missing = Uuid::new_v4();

    let err = repo
        .reorder_todos(&[
            PositionUpdate {
                id: b.id,
                position: 0,
            },
            PositionUpdate {
                id: missing,
                position: 1,
            },
            PositionUpdate {
                id: a.id,
                position: 2,
            },
        ])
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));

    let positions: Vec<(Uuid, i64)> = repo
        .list_todos()
        .unwrap()
        .iter()
        .map(|t| (t.id, t.position))
        .collect();
    assert_eq!(positions, vec![(a.id, 0), (b.id, 1)]);
}

#[test]
fn empty_reorder_is_a_no_op() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    repo.reorder_todos(&[]).unwrap();
}

#[test]
fn clear_completed_removes_all_and_only_completed() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let mut active_ids = Vec::new();
    for index in 0..6 {
        let todo = repo
            .create_todo(&NewTodo::new(format!("task {index}")))
            .unwrap();
        if index % 3 == 0 {
            repo.update_todo(todo.id, &TodoPatch::completed(true))
                .unwrap();
        } else {
            active_ids.push(todo.id);
        }
    }

    let removed = repo.clear_completed().unwrap();
    assert_eq!(removed, 2);

    let remaining = repo.list_todos().unwrap();
    assert_eq!(remaining.len(), active_ids.len());
    assert!(remaining.iter().all(|todo| !todo.completed));
    assert!(remaining.iter().all(|todo| active_ids.contains(&todo.id)));

    assert_eq!(repo.clear_completed().unwrap(), 0);
}

#[test]
fn backfill_assigns_positions_to_rows_without_one() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    repo.create_todo(&NewTodo::new("kept")).unwrap();

    conn.execute(
        "INSERT INTO todos (id, title, user_id, created_at, updated_at, position)
         VALUES (?1, 'imported', 'anonymous', 1, 1, NULL);",
        [Uuid::new_v4().to_string()],
    )
    .unwrap();
    assert!(matches!(repo.list_todos(), Err(RepoError::InvalidData(_))));

    assert_eq!(repo.backfill_positions().unwrap(), 1);
    assert_eq!(repo.backfill_positions().unwrap(), 0);

    let todos = repo.list_todos().unwrap();
    assert_eq!(todos.len(), 2);
    let imported = todos.iter().find(|t| t.title == "imported").unwrap();
    assert_eq!(imported.position, 0);
}

#[test]
fn read_rejects_corrupted_completed_flag() {
    let conn = setup();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let todo = repo.create_todo(&NewTodo::new("x")).unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "UPDATE todos SET completed = 7 WHERE id = ?1;",
        [todo.id.to_string()],
    )
    .unwrap();

    let err = repo.get_todo(todo.id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("completed")));
}
