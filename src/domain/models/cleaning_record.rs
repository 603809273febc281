//! Cleaning record domain model.
//!
//! A CleaningRecord is one dated occurrence of a [`CleaningTask`]. It starts
//! pending and becomes completed when someone marks the work as done, at
//! which point the compliance judgment and completion date are recorded.
//!
//! [`CleaningTask`]: super::cleaning_task::CleaningTask

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Truncate a timestamp to the microsecond precision the store keeps, so a
/// value read back compares equal to the one that was written.
pub fn stored_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

/// Completion state of a record.
///
/// Compliance only exists once the record is completed, so the two facts are
/// carried together instead of as independent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CompletionState {
    Pending,
    Completed {
        compliant: bool,
        completed_at: DateTime<Utc>,
    },
}

impl CompletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed { compliant: true, .. } => "compliant",
            Self::Completed { compliant: false, .. } => "non_compliant",
        }
    }

    /// French label shown in the task list chips.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::Completed { compliant: true, .. } => "Complété (Conforme)",
            Self::Completed { compliant: false, .. } => "Complété (Non conforme)",
        }
    }

    /// Rebuild the state from the persisted columns.
    ///
    /// Rows written before completion dates were enforced may be completed
    /// without a date; `fallback_completed_at` fills the gap.
    pub fn from_columns(
        is_completed: bool,
        is_compliant: Option<bool>,
        completion_date: Option<DateTime<Utc>>,
        fallback_completed_at: DateTime<Utc>,
    ) -> Self {
        if is_completed {
            Self::Completed {
                compliant: is_compliant.unwrap_or(false),
                completed_at: completion_date.unwrap_or(fallback_completed_at),
            }
        } else {
            Self::Pending
        }
    }
}

/// One dated occurrence of a cleaning task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningRecord {
    pub id: Uuid,
    pub cleaning_task_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub state: CompletionState,
    pub photo_url: Option<String>,
    pub comments: Option<String>,
    /// Bumped on every persisted change; used for compare-and-swap updates.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CleaningRecord {
    /// Create a pending record for a task.
    pub fn new(cleaning_task_id: Uuid, scheduled_date: DateTime<Utc>) -> Self {
        let now = stored_precision(Utc::now());
        Self {
            id: Uuid::new_v4(),
            cleaning_task_id,
            scheduled_date: stored_precision(scheduled_date),
            state: CompletionState::Pending,
            photo_url: None,
            comments: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, CompletionState::Completed { .. })
    }

    /// `None` while pending.
    pub fn is_compliant(&self) -> Option<bool> {
        match self.state {
            CompletionState::Completed { compliant, .. } => Some(compliant),
            CompletionState::Pending => None,
        }
    }

    /// Completed and judged compliant.
    pub fn is_completed_compliant(&self) -> bool {
        matches!(self.state, CompletionState::Completed { compliant: true, .. })
    }

    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        match self.state {
            CompletionState::Completed { completed_at, .. } => Some(completed_at),
            CompletionState::Pending => None,
        }
    }

    /// Pending and scheduled strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.scheduled_date < now
    }
}

/// Requested change to the completion fields of one record.
///
/// Mirrors what the edit form submits: flat optional fields, validated by the
/// compliance evaluator before being folded into a [`CompletionState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUpdate {
    pub is_completed: bool,
    pub is_compliant: Option<bool>,
    pub completion_date: Option<DateTime<Utc>>,
    /// `None` leaves the current photo untouched.
    pub photo_url: Option<PhotoChange>,
    /// `None` leaves the current comments untouched.
    pub comments: Option<Option<String>>,
}

impl CompletionUpdate {
    /// Mark completed with the given compliance judgment.
    pub fn completed(compliant: bool, completed_at: DateTime<Utc>) -> Self {
        Self {
            is_completed: true,
            is_compliant: Some(compliant),
            completion_date: Some(completed_at),
            ..Self::default()
        }
    }

    /// Back to pending.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn with_comments(mut self, comments: Option<String>) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn with_photo(mut self, change: PhotoChange) -> Self {
        self.photo_url = Some(change);
        self
    }
}

/// Change to the photo evidence reference of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoChange {
    Set(String),
    Clear,
}

/// Audit entry written on each completion state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEvent {
    pub id: Uuid,
    pub record_id: Uuid,
    pub from_state: String,
    pub to_state: String,
    pub occurred_at: DateTime<Utc>,
}

impl RecordEvent {
    pub fn transition(
        record_id: Uuid,
        from: &CompletionState,
        to: &CompletionState,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            from_state: from.as_str().to_string(),
            to_state: to.as_str().to_string(),
            occurred_at,
        }
    }
}
