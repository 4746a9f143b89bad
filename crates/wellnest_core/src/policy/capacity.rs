//! Active-goal capacity policy.
//!
//! # Responsibility
//! - Decide the effective status of a goal draft given the active count.
//! - Produce the status-picker presentation (option availability, caption,
//!   caption tone) for both enforcement modes.
//!
//! # Invariants
//! - `Hard`: the stored status is never `active` while the limit is reached.
//! - `Soft`: an over-limit `active` save requires an explicit confirmation.
//! - A goal that is already active does not count against itself on edit.
//! - Assessment is pure; callers supply a freshly read active count.

use crate::model::goal::GoalStatus;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of simultaneously active goals.
pub const DEFAULT_ACTIVE_GOAL_LIMIT: u32 = 2;

/// How the active-goal limit is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalEnforcement {
    /// The active option is disabled and drafts are coerced to backlog.
    Hard,
    /// The active option stays selectable; saving over the limit asks first.
    Soft,
}

impl GoalEnforcement {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hard" => Some(Self::Hard),
            "soft" => Some(Self::Soft),
            _ => None,
        }
    }
}

/// Caption styling hint for the status picker helper text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionTone {
    Info,
    Warning,
}

/// Whether the draft is a new goal or an edit of a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    New,
    /// Edit of a stored goal whose persisted status is given.
    Existing(GoalStatus),
}

impl DraftOrigin {
    fn occupies_active_slot(self) -> bool {
        matches!(self, Self::Existing(GoalStatus::Active))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityPolicyError {
    ZeroLimit,
}

impl Display for CapacityPolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroLimit => write!(f, "active goal limit must be at least 1"),
        }
    }
}

impl Error for CapacityPolicyError {}

/// Outcome of assessing one draft against the capacity policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityAssessment {
    /// Active goals other than the draft itself.
    pub active_count: u32,
    pub limit: u32,
    pub at_limit: bool,
    /// Whether the `active` option may be picked in the status selector.
    pub active_selectable: bool,
    /// Status that would be written if the save goes through.
    pub effective_status: GoalStatus,
    /// Soft mode only: the save must be confirmed by the user first.
    pub requires_confirmation: bool,
    pub caption: String,
    pub tone: CaptionTone,
}

/// Payload shown by the over-limit confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverLimitConfirmation {
    pub active_count: u32,
    pub limit: u32,
    pub message: String,
}

/// Modal yes/no prompt used by the soft enforcement mode.
pub trait ConfirmationPrompt {
    /// Returns `true` when the user confirms; `false` on cancel or dismiss.
    fn confirm_over_limit(&mut self, request: &OverLimitConfirmation) -> bool;
}

impl<F> ConfirmationPrompt for F
where
    F: FnMut(&OverLimitConfirmation) -> bool,
{
    fn confirm_over_limit(&mut self, request: &OverLimitConfirmation) -> bool {
        self(request)
    }
}

/// Prompt with a precomputed answer.
///
/// Used by two-phase callers (FFI) that collect the answer before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetAnswer(pub bool);

impl ConfirmationPrompt for PresetAnswer {
    fn confirm_over_limit(&mut self, _request: &OverLimitConfirmation) -> bool {
        self.0
    }
}

/// Active-goal capacity policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPolicy {
    limit: u32,
    enforcement: GoalEnforcement,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ACTIVE_GOAL_LIMIT,
            enforcement: GoalEnforcement::Soft,
        }
    }
}

impl CapacityPolicy {
    pub fn new(limit: u32, enforcement: GoalEnforcement) -> Result<Self, CapacityPolicyError> {
        if limit == 0 {
            return Err(CapacityPolicyError::ZeroLimit);
        }
        Ok(Self { limit, enforcement })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn enforcement(&self) -> GoalEnforcement {
        self.enforcement
    }

    /// Assesses a draft selection against the stored active count.
    ///
    /// `stored_active_count` is the number of persisted active goals,
    /// including the draft itself when it is an already-active stored goal.
    pub fn assess(
        &self,
        stored_active_count: u32,
        selection: GoalStatus,
        origin: DraftOrigin,
    ) -> CapacityAssessment {
        let active_count = if origin.occupies_active_slot() {
            stored_active_count.saturating_sub(1)
        } else {
            stored_active_count
        };
        let at_limit = active_count >= self.limit;

        match self.enforcement {
            GoalEnforcement::Hard => {
                // New goals at the limit always land in the backlog; edits only
                // lose an `active` selection.
                let effective_status = match (at_limit, origin) {
                    (false, _) => selection,
                    (true, DraftOrigin::New) => GoalStatus::Backlog,
                    (true, DraftOrigin::Existing(_)) if selection == GoalStatus::Active => {
                        GoalStatus::Backlog
                    }
                    (true, DraftOrigin::Existing(_)) => selection,
                };
                let caption = if at_limit {
                    format!(
                        "Active goal limit reached ({active_count}/{}). This goal will be saved to your backlog.",
                        self.limit
                    )
                } else {
                    format!(
                        "You can focus on up to {limit} active goals ({active_count}/{limit}).",
                        limit = self.limit
                    )
                };
                CapacityAssessment {
                    active_count,
                    limit: self.limit,
                    at_limit,
                    active_selectable: !at_limit,
                    effective_status,
                    requires_confirmation: false,
                    caption,
                    tone: if at_limit {
                        CaptionTone::Warning
                    } else {
                        CaptionTone::Info
                    },
                }
            }
            GoalEnforcement::Soft => {
                let warn = at_limit && selection == GoalStatus::Active;
                let caption = if warn {
                    format!(
                        "You already have {active_count} active goals ({active_count}/{}). Consider finishing one first.",
                        self.limit
                    )
                } else {
                    format!(
                        "Focus works best with up to {limit} active goals ({active_count}/{limit}).",
                        limit = self.limit
                    )
                };
                CapacityAssessment {
                    active_count,
                    limit: self.limit,
                    at_limit,
                    active_selectable: true,
                    effective_status: selection,
                    requires_confirmation: warn,
                    caption,
                    tone: if warn {
                        CaptionTone::Warning
                    } else {
                        CaptionTone::Info
                    },
                }
            }
        }
    }

    /// Builds the over-limit confirmation payload for an assessment.
    pub fn confirmation_for(&self, assessment: &CapacityAssessment) -> OverLimitConfirmation {
        OverLimitConfirmation {
            active_count: assessment.active_count,
            limit: assessment.limit,
            message: format!(
                "You already have {} active goals. Adding another may spread your focus thin. Make this goal active anyway?",
                assessment.active_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CapacityPolicy, CapacityPolicyError, CaptionTone, DraftOrigin, GoalEnforcement,
    };
    use crate::model::goal::GoalStatus;

    fn hard() -> CapacityPolicy {
        CapacityPolicy::new(2, GoalEnforcement::Hard).expect("valid policy")
    }

    fn soft() -> CapacityPolicy {
        CapacityPolicy::new(2, GoalEnforcement::Soft).expect("valid policy")
    }

    #[test]
    fn rejects_zero_limit() {
        assert_eq!(
            CapacityPolicy::new(0, GoalEnforcement::Hard),
            Err(CapacityPolicyError::ZeroLimit)
        );
    }

    #[test]
    fn hard_below_limit_keeps_selection() {
        let assessment = hard().assess(1, GoalStatus::Active, DraftOrigin::New);
        assert!(!assessment.at_limit);
        assert!(assessment.active_selectable);
        assert_eq!(assessment.effective_status, GoalStatus::Active);
        assert!(assessment.caption.contains("(1/2)"));
        assert_eq!(assessment.tone, CaptionTone::Info);
    }

    #[test]
    fn hard_at_limit_coerces_every_new_selection_to_backlog() {
        for selection in GoalStatus::all() {
            let assessment = hard().assess(2, selection, DraftOrigin::New);
            assert!(!assessment.active_selectable);
            assert_eq!(assessment.effective_status, GoalStatus::Backlog);
            assert!(!assessment.requires_confirmation);
            assert!(assessment.caption.contains("(2/2)"));
        }
    }

    #[test]
    fn hard_at_limit_edit_keeps_non_active_selection() {
        let assessment = hard().assess(
            2,
            GoalStatus::Completed,
            DraftOrigin::Existing(GoalStatus::Backlog),
        );
        assert_eq!(assessment.effective_status, GoalStatus::Completed);
    }

    #[test]
    fn already_active_goal_does_not_count_against_itself() {
        let assessment = hard().assess(
            2,
            GoalStatus::Active,
            DraftOrigin::Existing(GoalStatus::Active),
        );
        assert_eq!(assessment.active_count, 1);
        assert!(!assessment.at_limit);
        assert_eq!(assessment.effective_status, GoalStatus::Active);
    }

    #[test]
    fn soft_at_limit_requires_confirmation_only_for_active_selection() {
        let active = soft().assess(2, GoalStatus::Active, DraftOrigin::New);
        assert!(active.active_selectable);
        assert!(active.requires_confirmation);
        assert_eq!(active.effective_status, GoalStatus::Active);
        assert_eq!(active.tone, CaptionTone::Warning);

        let backlog = soft().assess(2, GoalStatus::Backlog, DraftOrigin::New);
        assert!(!backlog.requires_confirmation);
        assert_eq!(backlog.tone, CaptionTone::Info);
    }

    #[test]
    fn confirmation_message_mentions_active_count() {
        let policy = soft();
        let assessment = policy.assess(2, GoalStatus::Active, DraftOrigin::New);
        let confirmation = policy.confirmation_for(&assessment);
        assert_eq!(confirmation.active_count, 2);
        assert!(confirmation.message.contains('2'));
    }

    #[test]
    fn enforcement_parses_case_insensitively() {
        assert_eq!(GoalEnforcement::parse("HARD"), Some(GoalEnforcement::Hard));
        assert_eq!(GoalEnforcement::parse(" soft "), Some(GoalEnforcement::Soft));
        assert_eq!(GoalEnforcement::parse("strict"), None);
    }
}
