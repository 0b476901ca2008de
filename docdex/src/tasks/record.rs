//! Task status enum and task record type.

use crate::util::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been created but no worker has started it.
    Queued,
    /// A worker is actively executing the task.
    Running,
    /// Task finished successfully.
    Completed,
    /// Task hit an unrecoverable error.
    Failed,
    /// Task observed a cancellation request and stopped.
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl TaskStatus {
    /// Returns true if the status is terminal. Terminal states are absorbing:
    /// no record ever transitions out of one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a transition from `self` to `next` is a legal forward
    /// move in the task state machine.
    ///
    /// Live states may self-transition (a running worker refreshing its
    /// details re-reports `Running`).
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Queued, Self::Running | Self::Cancelled)
                | (Self::Running, Self::Completed | Self::Failed | Self::Cancelled)
        )
    }
}

/// One record per unit of submitted work.
///
/// Records are owned exclusively by the [`TaskStore`](crate::tasks::TaskStore);
/// workers hold only the identifier and mutate state through store operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Free-form human-readable description of current activity.
    pub details: String,
    /// Units of work completed so far; meaningful only while running.
    pub progress_current: Option<u64>,
    /// Total units of work; `0` or absent means indeterminate.
    pub progress_total: Option<u64>,
    /// Set once when cancellation is requested; never unset.
    pub cancel_requested: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Time of the most recent mutation.
    pub updated_at: Timestamp,
}

impl TaskRecord {
    /// Creates a new queued record.
    #[must_use]
    pub fn new(id: impl Into<String>, details: impl Into<String>) -> Self {
        let now = now_utc();
        Self {
            id: id.into(),
            status: TaskStatus::Queued,
            details: details.into(),
            progress_current: None,
            progress_total: None,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `(current, total)` when progress is determinate.
    #[must_use]
    pub fn progress(&self) -> Option<(u64, u64)> {
        match (self.progress_current, self.progress_total) {
            (Some(current), Some(total)) if total > 0 => Some((current, total)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::Queued.to_string(), "queued");
        assert_eq!(TaskStatus::Running.to_string(), "running");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
        assert_eq!(TaskStatus::Failed.to_string(), "failed");
        assert_eq!(TaskStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_legal_forward_transitions() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Cancelled));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Cancelled));
    }

    #[test]
    fn test_live_self_transitions() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Queued));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Running));
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            for next in [
                TaskStatus::Queued,
                TaskStatus::Running,
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Cancelled,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} -> {next} must be rejected"
                );
            }
        }
    }

    #[test]
    fn test_illegal_forward_transitions() {
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Queued));
    }

    #[test]
    fn test_status_serialize_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Running).unwrap();
        assert_eq!(json, r#""running""#);

        let deserialized: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, TaskStatus::Running);
    }

    #[test]
    fn test_new_record_defaults() {
        let record = TaskRecord::new("get-llms-full-1", "queued for ingest");
        assert_eq!(record.status, TaskStatus::Queued);
        assert_eq!(record.details, "queued for ingest");
        assert!(!record.cancel_requested);
        assert!(record.progress().is_none());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_progress_indeterminate_when_total_zero() {
        let mut record = TaskRecord::new("t", "");
        record.progress_current = Some(3);
        record.progress_total = Some(0);
        assert!(record.progress().is_none());

        record.progress_total = Some(10);
        assert_eq!(record.progress(), Some((3, 10)));
    }
}
