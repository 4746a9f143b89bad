use chrono::NaiveDate;
use wellnest_core::db::open_db_in_memory;
use wellnest_core::{
    RepoError, SqliteTodoRepository, Todo, TodoPriority, TodoRepository, TodoService,
    TodoServiceError, TodoSource, UndoToken, VoiceCaptureResult,
};

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let mut todo = Todo::new("buy milk", TodoSource::Manual);
    todo.priority = Some(TodoPriority::Low);
    let id = repo.create_todo(&todo).unwrap();

    let loaded = repo.get_todo(id).unwrap().unwrap();
    assert_eq!(loaded.title, "buy milk");
    assert_eq!(loaded.priority, Some(TodoPriority::Low));
    assert_eq!(loaded.source, TodoSource::Manual);
    assert!(!loaded.completed);
    assert!(loaded.due_date.is_none());
}

#[test]
fn create_rejects_blank_title() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let err = repo
        .create_todo(&Todo::new(" ", TodoSource::Manual))
        .unwrap_err();
    assert!(matches!(err, RepoError::TodoValidation(_)));
}

#[test]
fn capture_creates_voice_todo_with_parsed_fields() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());

    let result = VoiceCaptureResult::from_json_str(
        r#"{"title":"call the dentist","dueDate":"2026-11-02","priority":"High"}"#,
    )
    .unwrap();
    let captured = service.create_from_capture(&result).unwrap();

    assert_eq!(captured.todo.title, "call the dentist");
    assert_eq!(captured.todo.source, TodoSource::Voice);
    assert_eq!(captured.todo.priority, Some(TodoPriority::High));
    assert_eq!(captured.todo.due_date, NaiveDate::from_ymd_opt(2026, 11, 2));
    assert_eq!(captured.undo.todo_id(), captured.todo.id);
}

#[test]
fn undo_removes_exactly_the_captured_todo() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();
    let manual = Todo::new("water plants", TodoSource::Manual);
    repo.create_todo(&manual).unwrap();
    let service = TodoService::new(repo);

    let first = service
        .create_from_capture(&VoiceCaptureResult::from_fields("first", None, None).unwrap())
        .unwrap();
    let second = service
        .create_from_capture(&VoiceCaptureResult::from_fields("second", None, None).unwrap())
        .unwrap();
    let second_id = second.todo.id;

    service.undo(second.undo).unwrap();

    let remaining: Vec<_> = service
        .list_todos()
        .unwrap()
        .into_iter()
        .map(|todo| todo.id)
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&manual.id));
    assert!(remaining.contains(&first.todo.id));
    assert!(!remaining.contains(&second_id));
}

#[test]
fn undo_of_already_removed_todo_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = TodoService::new(SqliteTodoRepository::try_new(&conn).unwrap());

    let captured = service
        .create_from_capture(&VoiceCaptureResult::from_fields("once", None, None).unwrap())
        .unwrap();
    let id = captured.todo.id;
    service.undo(captured.undo).unwrap();

    let err = service.undo(UndoToken::from_todo_id(id)).unwrap_err();
    assert!(matches!(err, TodoServiceError::TodoNotFound(missing) if missing == id));
}
