//! Goal use-case service.
//!
//! # Responsibility
//! - Drive the add/edit goal dialogs: render-time status picker and
//!   commit-time save under the active-goal capacity policy.
//! - Provide completion, progress, delete and list entry points.
//!
//! # Invariants
//! - Every status write goes through `save_goal`, so the policy cannot be
//!   bypassed by edit flows.
//! - `save_goal` re-reads the active count at commit; the count shown at
//!   render time is never reused for the decision.
//! - A cancelled over-limit confirmation leaves storage untouched.

use crate::model::goal::{Goal, GoalId, GoalStatus, GoalValidationError};
use crate::policy::capacity::{
    CapacityPolicy, CaptionTone, ConfirmationPrompt, DraftOrigin, GoalEnforcement,
};
use crate::repo::goal_repo::{GoalListQuery, GoalRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum GoalServiceError {
    Validation(GoalValidationError),
    GoalNotFound(GoalId),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for GoalServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::GoalNotFound(id) => write!(f, "goal not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent goal state: {details}"),
        }
    }
}

impl Error for GoalServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GoalServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::GoalNotFound(id),
            RepoError::GoalValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<GoalValidationError> for GoalServiceError {
    fn from(value: GoalValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Dialog input for creating or editing a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDraft {
    /// `None` for the add dialog, `Some(id)` for the edit dialog.
    pub id: Option<GoalId>,
    pub title: String,
    pub category: String,
    pub target_date: Option<NaiveDate>,
    /// Status picked by the user.
    pub status: GoalStatus,
}

impl GoalDraft {
    pub fn new(title: impl Into<String>, category: impl Into<String>, status: GoalStatus) -> Self {
        Self {
            id: None,
            title: title.into(),
            category: category.into(),
            target_date: None,
            status,
        }
    }
}

/// One entry in the status selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOption {
    pub status: GoalStatus,
    pub enabled: bool,
}

/// Render-time view model for the status selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPicker {
    pub options: Vec<StatusOption>,
    /// Selection the picker should display after policy coercion.
    pub selected: GoalStatus,
    pub caption: String,
    pub tone: CaptionTone,
    pub active_count: u32,
    pub limit: u32,
}

/// Result of a save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Goal),
    /// The user declined the over-limit confirmation; nothing was written.
    Cancelled,
}

/// Goal service facade over repository implementations.
pub struct GoalService<R: GoalRepository> {
    repo: R,
    policy: CapacityPolicy,
}

impl<R: GoalRepository> GoalService<R> {
    pub fn new(repo: R, policy: CapacityPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    /// Builds the status selector for the dialog being rendered.
    ///
    /// `editing` is the stored goal id for the edit dialog.
    pub fn status_picker(
        &self,
        editing: Option<GoalId>,
        selection: GoalStatus,
    ) -> Result<StatusPicker, GoalServiceError> {
        let origin = self.draft_origin(editing)?;
        let active_count = self.repo.count_active()?;
        let assessment = self.policy.assess(active_count, selection, origin);

        let options = GoalStatus::all()
            .into_iter()
            .map(|status| StatusOption {
                status,
                enabled: status != GoalStatus::Active || assessment.active_selectable,
            })
            .collect();

        let selected = match self.policy.enforcement() {
            GoalEnforcement::Hard if !assessment.active_selectable => {
                assessment.effective_status
            }
            _ => selection,
        };

        Ok(StatusPicker {
            options,
            selected,
            caption: assessment.caption,
            tone: assessment.tone,
            active_count: assessment.active_count,
            limit: assessment.limit,
        })
    }

    /// Commits a draft under the capacity policy.
    ///
    /// # Contract
    /// - Reads the active count at call time.
    /// - `Hard`: stores the coerced status, never prompts.
    /// - `Soft`: prompts when saving `active` at or over the limit; a `false`
    ///   answer returns `SaveOutcome::Cancelled` without writing.
    pub fn save_goal(
        &self,
        draft: &GoalDraft,
        prompt: &mut impl ConfirmationPrompt,
    ) -> Result<SaveOutcome, GoalServiceError> {
        let existing = match draft.id {
            Some(id) => Some(
                self.repo
                    .get_goal(id)?
                    .ok_or(GoalServiceError::GoalNotFound(id))?,
            ),
            None => None,
        };
        let origin = existing
            .as_ref()
            .map_or(DraftOrigin::New, |goal| DraftOrigin::Existing(goal.status));

        let active_count = self.repo.count_active()?;
        let assessment = self.policy.assess(active_count, draft.status, origin);

        if assessment.requires_confirmation {
            let confirmation = self.policy.confirmation_for(&assessment);
            if !prompt.confirm_over_limit(&confirmation) {
                info!(
                    "event=goal_capacity module=goal status=cancelled enforcement={} active_count={} limit={}",
                    self.policy.enforcement().as_str(),
                    assessment.active_count,
                    assessment.limit
                );
                return Ok(SaveOutcome::Cancelled);
            }
            warn!(
                "event=goal_capacity module=goal status=override enforcement={} active_count={} limit={}",
                self.policy.enforcement().as_str(),
                assessment.active_count,
                assessment.limit
            );
        } else if assessment.effective_status != draft.status {
            info!(
                "event=goal_capacity module=goal status=coerced requested={} stored={} active_count={} limit={}",
                draft.status.as_str(),
                assessment.effective_status.as_str(),
                assessment.active_count,
                assessment.limit
            );
        }

        let goal_id = match existing {
            Some(mut goal) => {
                goal.title = draft.title.clone();
                goal.category = draft.category.clone();
                goal.target_date = draft.target_date;
                apply_status(&mut goal, assessment.effective_status);
                goal.validate()?;
                self.repo.update_goal(&goal)?;
                goal.id
            }
            None => {
                let mut goal = Goal::new(
                    draft.title.clone(),
                    draft.category.clone(),
                    assessment.effective_status,
                );
                goal.target_date = draft.target_date;
                self.repo.create_goal(&goal)?
            }
        };

        let saved = self.read_back(goal_id, "saved goal not found in read-back")?;
        info!(
            "event=goal_save module=goal status=ok mode={} stored={}",
            if draft.id.is_some() { "update" } else { "create" },
            saved.status.as_str()
        );
        Ok(SaveOutcome::Saved(saved))
    }

    /// Marks a goal completed with full progress.
    pub fn complete_goal(&self, id: GoalId) -> Result<Goal, GoalServiceError> {
        let mut goal = self.require_goal(id)?;
        goal.complete();
        self.repo.update_goal(&goal)?;
        self.read_back(id, "completed goal not found in read-back")
    }

    /// Updates progress; 100 completes the goal.
    pub fn update_progress(&self, id: GoalId, progress: u8) -> Result<Goal, GoalServiceError> {
        let mut goal = self.require_goal(id)?;
        goal.set_progress(progress)?;
        self.repo.update_goal(&goal)?;
        self.read_back(id, "updated goal not found in read-back")
    }

    /// Deletes a goal. Callers have already confirmed with the user.
    pub fn delete_goal(&self, id: GoalId) -> Result<(), GoalServiceError> {
        self.repo.delete_goal(id)?;
        info!("event=goal_delete module=goal status=ok");
        Ok(())
    }

    pub fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>> {
        self.repo.get_goal(id)
    }

    pub fn list_goals(&self, query: &GoalListQuery) -> RepoResult<Vec<Goal>> {
        self.repo.list_goals(query)
    }

    pub fn count_active(&self) -> RepoResult<u32> {
        self.repo.count_active()
    }

    fn draft_origin(&self, editing: Option<GoalId>) -> Result<DraftOrigin, GoalServiceError> {
        match editing {
            Some(id) => Ok(DraftOrigin::Existing(self.require_goal(id)?.status)),
            None => Ok(DraftOrigin::New),
        }
    }

    fn require_goal(&self, id: GoalId) -> Result<Goal, GoalServiceError> {
        self.repo
            .get_goal(id)?
            .ok_or(GoalServiceError::GoalNotFound(id))
    }

    fn read_back(&self, id: GoalId, details: &'static str) -> Result<Goal, GoalServiceError> {
        self.repo
            .get_goal(id)?
            .ok_or(GoalServiceError::InconsistentState(details))
    }
}

fn apply_status(goal: &mut Goal, status: GoalStatus) {
    if status == GoalStatus::Completed {
        goal.complete();
        return;
    }
    goal.status = status;
}

#[cfg(test)]
mod tests {
    use super::{GoalDraft, GoalService, GoalServiceError, SaveOutcome};
    use crate::db::open_db_in_memory;
    use crate::model::goal::GoalStatus;
    use crate::policy::capacity::{CapacityPolicy, GoalEnforcement, PresetAnswer};
    use crate::repo::goal_repo::SqliteGoalRepository;
    use uuid::Uuid;

    #[test]
    fn save_goal_rejects_unknown_edit_target() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteGoalRepository::try_new(&conn).expect("repo");
        let service = GoalService::new(
            repo,
            CapacityPolicy::new(2, GoalEnforcement::Hard).expect("policy"),
        );

        let mut draft = GoalDraft::new("Swim", "health", GoalStatus::Backlog);
        let missing = Uuid::new_v4();
        draft.id = Some(missing);
        let err = service
            .save_goal(&draft, &mut PresetAnswer(true))
            .expect_err("missing goal must fail");
        assert!(matches!(err, GoalServiceError::GoalNotFound(id) if id == missing));
    }

    #[test]
    fn save_goal_surfaces_validation_errors() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteGoalRepository::try_new(&conn).expect("repo");
        let service = GoalService::new(repo, CapacityPolicy::default());

        let draft = GoalDraft::new("  ", "health", GoalStatus::Backlog);
        let err = service
            .save_goal(&draft, &mut PresetAnswer(true))
            .expect_err("blank title must fail");
        assert!(matches!(err, GoalServiceError::Validation(_)));
    }

    #[test]
    fn completing_through_save_sets_full_progress() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteGoalRepository::try_new(&conn).expect("repo");
        let service = GoalService::new(repo, CapacityPolicy::default());

        let created = match service
            .save_goal(
                &GoalDraft::new("Journal daily", "mind", GoalStatus::Backlog),
                &mut PresetAnswer(true),
            )
            .expect("create")
        {
            SaveOutcome::Saved(goal) => goal,
            SaveOutcome::Cancelled => panic!("backlog save never prompts"),
        };

        let mut draft = GoalDraft::new("Journal daily", "mind", GoalStatus::Completed);
        draft.id = Some(created.id);
        match service
            .save_goal(&draft, &mut PresetAnswer(true))
            .expect("update")
        {
            SaveOutcome::Saved(goal) => {
                assert_eq!(goal.status, GoalStatus::Completed);
                assert_eq!(goal.progress, 100);
            }
            SaveOutcome::Cancelled => panic!("completion never prompts"),
        }
    }
}
