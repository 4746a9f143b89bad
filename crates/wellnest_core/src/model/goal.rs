//! Goal domain model.
//!
//! # Responsibility
//! - Define the canonical goal record used by the capacity policy.
//! - Provide lifecycle helpers for completion and progress updates.
//!
//! # Invariants
//! - `id` is stable and never reused for another goal.
//! - `title` and `category` are never blank.
//! - `progress` stays within `0..=100`.
//! - A completed goal always reports `progress == 100`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for goals.
pub type GoalId = Uuid;

/// Upper bound for goal progress percentage.
pub const GOAL_PROGRESS_MAX: u8 = 100;

/// Goal lifecycle status.
///
/// Only `Active` goals count against the active-goal capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Currently being worked on.
    Active,
    /// Parked until a focus slot frees up.
    Backlog,
    /// Done.
    Completed,
}

impl GoalStatus {
    /// Stable string id used by storage and FFI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Backlog => "backlog",
            Self::Completed => "completed",
        }
    }

    /// Parses a stable string id. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "backlog" => Some(Self::Backlog),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// All statuses in status-picker display order.
    pub fn all() -> [GoalStatus; 3] {
        [Self::Active, Self::Backlog, Self::Completed]
    }
}

/// Validation failures for goal records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValidationError {
    NilId,
    EmptyTitle,
    EmptyCategory,
    ProgressOutOfRange(u8),
    CompletedWithoutFullProgress(u8),
}

impl Display for GoalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "goal id must not be nil"),
            Self::EmptyTitle => write!(f, "goal title must not be empty"),
            Self::EmptyCategory => write!(f, "goal category must not be empty"),
            Self::ProgressOutOfRange(value) => {
                write!(f, "goal progress {value} exceeds {GOAL_PROGRESS_MAX}")
            }
            Self::CompletedWithoutFullProgress(value) => {
                write!(f, "completed goal must have progress 100, got {value}")
            }
        }
    }
}

impl Error for GoalValidationError {}

/// Canonical goal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    pub status: GoalStatus,
    /// Free-form grouping label (`health`, `career`, ...).
    pub category: String,
    pub target_date: Option<NaiveDate>,
    /// Percentage in `0..=100`.
    pub progress: u8,
    /// Epoch milliseconds, maintained by storage.
    pub created_at: i64,
    /// Epoch milliseconds, maintained by storage.
    pub updated_at: i64,
}

impl Goal {
    /// Creates a goal with a generated id, zero progress and unset timestamps.
    pub fn new(title: impl Into<String>, category: impl Into<String>, status: GoalStatus) -> Self {
        Self::with_id(Uuid::new_v4(), title, category, status)
    }

    /// Creates a goal with a caller-provided id.
    ///
    /// Used by edit flows where identity already exists.
    pub fn with_id(
        id: GoalId,
        title: impl Into<String>,
        category: impl Into<String>,
        status: GoalStatus,
    ) -> Self {
        let progress = if status == GoalStatus::Completed {
            GOAL_PROGRESS_MAX
        } else {
            0
        };
        Self {
            id,
            title: title.into(),
            status,
            category: category.into(),
            target_date: None,
            progress,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Validates record invariants before persistence.
    pub fn validate(&self) -> Result<(), GoalValidationError> {
        if self.id.is_nil() {
            return Err(GoalValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(GoalValidationError::EmptyTitle);
        }
        if self.category.trim().is_empty() {
            return Err(GoalValidationError::EmptyCategory);
        }
        if self.progress > GOAL_PROGRESS_MAX {
            return Err(GoalValidationError::ProgressOutOfRange(self.progress));
        }
        if self.status == GoalStatus::Completed && self.progress != GOAL_PROGRESS_MAX {
            return Err(GoalValidationError::CompletedWithoutFullProgress(
                self.progress,
            ));
        }
        Ok(())
    }

    /// Whether this goal occupies an active focus slot.
    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }

    /// Marks the goal completed with full progress.
    pub fn complete(&mut self) {
        self.status = GoalStatus::Completed;
        self.progress = GOAL_PROGRESS_MAX;
    }

    /// Sets progress; reaching 100 completes the goal.
    pub fn set_progress(&mut self, progress: u8) -> Result<(), GoalValidationError> {
        if progress > GOAL_PROGRESS_MAX {
            return Err(GoalValidationError::ProgressOutOfRange(progress));
        }
        if progress == GOAL_PROGRESS_MAX {
            self.complete();
        } else {
            self.progress = progress;
            // Pulling progress back reopens a completed goal into the backlog,
            // never straight into an active slot.
            if self.status == GoalStatus::Completed {
                self.status = GoalStatus::Backlog;
            }
        }
        Ok(())
    }
}
