// Moderation workflow - Pure state transitions, persisted by the experience repository
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

use crate::db::models::ModerationStatus;

/// Admin action on a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

impl ModerationAction {
    /// Status the action moves a record into
    pub fn target(self) -> ModerationStatus {
        match self {
            Self::Approve => ModerationStatus::Approved,
            Self::Reject => ModerationStatus::Rejected,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
        }
    }
}

/// Outcome of a successful transition, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationDecision {
    pub status: ModerationStatus,
    pub notes: Option<String>,
    pub moderator_id: String,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModerationError {
    InvalidTransition {
        from: ModerationStatus,
        action: ModerationAction,
    },
}

impl fmt::Display for ModerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, action } => write!(
                f,
                "Experience is already {} and cannot be {}",
                from,
                action.verb()
            ),
        }
    }
}

impl std::error::Error for ModerationError {}

/// Transition: pending -> approved | rejected.
///
/// Repeating the decision a record already carries is allowed and replaces the notes and
/// moderator. Flipping an approved record to rejected (or back) is refused.
pub fn decide(
    current: ModerationStatus,
    action: ModerationAction,
    notes: Option<String>,
    moderator_id: &str,
    now: DateTime<Utc>,
) -> Result<ModerationDecision, ModerationError> {
    let target = action.target();
    match current {
        ModerationStatus::Pending => {}
        same if same == target => {}
        from => return Err(ModerationError::InvalidTransition { from, action }),
    }

    let notes = notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(ModerationDecision {
        status: target,
        notes,
        moderator_id: moderator_id.to_string(),
        decided_at: now,
    })
}

/// Whether anyone may see a record in public listings and aggregates
pub fn is_public(status: ModerationStatus) -> bool {
    status == ModerationStatus::Approved
}
