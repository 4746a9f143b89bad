//! Core domain logic for WellNest.
//! This crate is the single source of truth for goal capacity rules and the
//! voice capture lifecycle.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;
pub mod voice;

pub use config::{ConfigError, CoreConfig, GoalConfig, VoiceConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::goal::{Goal, GoalId, GoalStatus, GoalValidationError};
pub use model::todo::{Todo, TodoId, TodoPriority, TodoSource};
pub use policy::capacity::{
    CapacityAssessment, CapacityPolicy, ConfirmationPrompt, GoalEnforcement,
    OverLimitConfirmation, PresetAnswer,
};
pub use repo::goal_repo::{GoalListQuery, GoalRepository, SqliteGoalRepository};
pub use repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
pub use repo::todo_repo::{SqliteTodoRepository, TodoRepository};
pub use repo::{RepoError, RepoResult};
pub use service::goal_service::{GoalDraft, GoalService, GoalServiceError, SaveOutcome};
pub use service::todo_service::{CapturedTodo, TodoService, TodoServiceError, UndoToken};
pub use voice::capture::{CaptureParseError, VoiceCaptureResult};
pub use voice::engine::{EngineFailure, SessionTicket, SpeechEngine};
pub use voice::session::{ActivationOutcome, VoiceSession};
pub use voice::state::{VoiceActivationState, VoiceNotice};
pub use voice::surface::{SurfaceKind, VoiceSurface};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
