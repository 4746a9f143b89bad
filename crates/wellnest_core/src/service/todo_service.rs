//! Todo use-case service for quick capture.
//!
//! # Responsibility
//! - Turn a voice capture result into a persisted todo.
//! - Undo exactly the todo a capture created.
//!
//! # Invariants
//! - An `UndoToken` is consumed on use, so one capture undoes at most once.

use crate::model::todo::{Todo, TodoId, TodoSource, TodoValidationError};
use crate::repo::todo_repo::TodoRepository;
use crate::repo::{RepoError, RepoResult};
use crate::voice::capture::VoiceCaptureResult;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum TodoServiceError {
    Validation(TodoValidationError),
    TodoNotFound(TodoId),
    Repo(RepoError),
    /// The todo just written could not be read back.
    InconsistentState(&'static str),
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TodoNotFound(id) => write!(f, "todo not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent todo state: {details}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TodoNotFound(id),
            RepoError::TodoValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Handle for the undo action offered after a capture.
#[derive(Debug, PartialEq, Eq)]
pub struct UndoToken(TodoId);

impl UndoToken {
    pub fn todo_id(&self) -> TodoId {
        self.0
    }

    /// Rebuilds a token from an id that crossed an FFI boundary.
    pub fn from_todo_id(id: TodoId) -> Self {
        Self(id)
    }
}

/// A todo created from voice plus its undo handle.
#[derive(Debug, PartialEq, Eq)]
pub struct CapturedTodo {
    pub todo: Todo,
    pub undo: UndoToken,
}

/// Todo service facade over repository implementations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a todo built from one capture result.
    pub fn create_from_capture(
        &self,
        result: &VoiceCaptureResult,
    ) -> Result<CapturedTodo, TodoServiceError> {
        let mut todo = Todo::new(result.title.clone(), TodoSource::Voice);
        todo.due_date = result.due_date;
        todo.priority = result.priority;
        let id = self.repo.create_todo(&todo)?;
        let todo = self.read_back(id, "captured todo not found in read-back")?;
        info!("event=todo_create module=todo status=ok source=voice");
        Ok(CapturedTodo {
            todo,
            undo: UndoToken(id),
        })
    }

    /// Deletes the todo behind `token` and nothing else.
    pub fn undo(&self, token: UndoToken) -> Result<(), TodoServiceError> {
        self.repo.delete_todo(token.0)?;
        info!("event=todo_undo module=todo status=ok");
        Ok(())
    }

    pub fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        self.repo.get_todo(id)
    }

    pub fn list_todos(&self) -> RepoResult<Vec<Todo>> {
        self.repo.list_todos()
    }

    fn read_back(&self, id: TodoId, details: &'static str) -> Result<Todo, TodoServiceError> {
        self.repo
            .get_todo(id)?
            .ok_or(TodoServiceError::InconsistentState(details))
    }
}
