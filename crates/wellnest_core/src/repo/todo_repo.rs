//! Todo repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `delete_todo` removes exactly the row with the given id.
//! - Write paths call `Todo::validate()` before SQL mutations.

use crate::model::todo::{Todo, TodoId, TodoPriority, TodoSource};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_date, parse_uuid, RepoError, RepoResult,
    DATE_FORMAT,
};
use rusqlite::{params, Connection, Row};

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    due_date,
    priority,
    completed,
    source,
    created_at
FROM todos";

/// Repository interface for todo persistence.
pub trait TodoRepository {
    fn create_todo(&self, todo: &Todo) -> RepoResult<TodoId>;
    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    /// Lists todos, newest first.
    fn list_todos(&self) -> RepoResult<Vec<Todo>>;
    fn delete_todo(&self, id: TodoId) -> RepoResult<()>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn create_todo(&self, todo: &Todo) -> RepoResult<TodoId> {
        todo.validate()?;

        self.conn.execute(
            "INSERT INTO todos (
                id,
                title,
                due_date,
                priority,
                completed,
                source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                todo.id.to_string(),
                todo.title.as_str(),
                todo.due_date
                    .map(|date| date.format(DATE_FORMAT).to_string()),
                todo.priority.map(TodoPriority::as_str),
                bool_to_int(todo.completed),
                todo.source.as_str(),
            ],
        )?;

        Ok(todo.id)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }
        Ok(None)
    }

    fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} ORDER BY created_at DESC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "todos.id")?;

    let priority = match row.get::<_, Option<String>>("priority")? {
        Some(value) => Some(TodoPriority::parse_loose(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid priority `{value}` in todos.priority"))
        })?),
        None => None,
    };

    let source_text: String = row.get("source")?;
    let source = TodoSource::parse(&source_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid source `{source_text}` in todos.source"))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed"
            )));
        }
    };

    let todo = Todo {
        id,
        title: row.get("title")?,
        due_date: parse_date(row.get("due_date")?, "todos.due_date")?,
        priority,
        completed,
        source,
        created_at: row.get("created_at")?,
    };
    todo.validate()?;
    Ok(todo)
}
