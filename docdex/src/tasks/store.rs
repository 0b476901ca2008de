//! Process-wide task registry: the state machine authority.

use crate::errors::{DocdexError, Result};
use crate::tasks::cancel::CancellationRegistry;
use crate::tasks::record::{TaskRecord, TaskStatus};
use crate::util::now_utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Single source of truth for all task records.
///
/// Every operation is a short, non-suspending critical section; the store
/// never performs I/O under its lock. Records handed out are cloned
/// snapshots, never live references.
///
/// The store is explicitly owned and injectable: create one per process (or
/// per test) and share it behind an [`Arc`].
#[derive(Debug, Default)]
pub struct TaskStore {
    records: RwLock<HashMap<String, TaskRecord>>,
    cancellations: Arc<CancellationRegistry>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the cancellation registry, for retry loops that
    /// check flags without touching the record map.
    #[must_use]
    pub fn cancellations(&self) -> Arc<CancellationRegistry> {
        Arc::clone(&self.cancellations)
    }

    /// Inserts a new queued record.
    ///
    /// # Errors
    ///
    /// Returns [`DocdexError::DuplicateTask`] if `id` is already present.
    pub fn create(&self, id: &str, initial_details: &str) -> Result<TaskRecord> {
        let mut records = self.records.write();
        if records.contains_key(id) {
            return Err(DocdexError::duplicate_task(id));
        }
        let record = TaskRecord::new(id, initial_details);
        records.insert(id.to_string(), record.clone());
        debug!(task_id = %id, "task created");
        Ok(record)
    }

    /// Applies a status transition, optionally refreshing the details string.
    ///
    /// Illegal moves (anything out of a terminal state, or a non-forward
    /// move) are ignored with a warning rather than surfaced: status races
    /// between a worker and a concurrent cancellation are expected.
    ///
    /// # Errors
    ///
    /// Returns [`DocdexError::UnknownTask`] if `id` was never created.
    pub fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
        details: Option<&str>,
    ) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| DocdexError::unknown_task(id))?;

        if !record.status.can_transition_to(status) {
            warn!(
                task_id = %id,
                from = %record.status,
                to = %status,
                "ignoring illegal status transition"
            );
            return Ok(());
        }

        record.status = status;
        if status == TaskStatus::Cancelled {
            record.cancel_requested = true;
        }
        if let Some(details) = details {
            record.details = details.to_string();
        }
        record.updated_at = now_utc();
        Ok(())
    }

    /// Sets the progress counters. Silently ignored when the task is unknown
    /// or already terminal.
    pub fn update_progress(&self, id: &str, current: u64, total: u64) {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        record.progress_current = Some(current);
        record.progress_total = Some(total);
        record.updated_at = now_utc();
    }

    /// Requests cancellation for `id`. Idempotent; silent on unknown
    /// identifiers (the caller likely raced a cleanup).
    ///
    /// A `Queued` record is transitioned straight to `Cancelled` here, under
    /// the same write lock every status update takes: no worker owns it yet,
    /// and the lock is the tie-break against a concurrent `queued -> running`
    /// transition.
    pub fn request_cancellation(&self, id: &str) {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(id) else {
            debug!(task_id = %id, "cancellation requested for unknown task; ignoring");
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        record.cancel_requested = true;
        self.cancellations.request_cancel(id);
        if record.status == TaskStatus::Queued {
            record.status = TaskStatus::Cancelled;
        }
        record.updated_at = now_utc();
    }

    /// Returns a cloned snapshot of the record, if present.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.records.read().get(id).cloned()
    }

    /// Returns a snapshot of every record. Order is unspecified and the
    /// returned records do not track later mutations.
    #[must_use]
    pub fn list(&self) -> Vec<TaskRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Returns the number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no task is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Removes records and their cancellation flags.
    ///
    /// With `ids`, removes exactly the identifiers that exist; unknown ones
    /// are silently skipped so that partial or repeated cleanup requests are
    /// idempotent. Without `ids`, removes every terminal record and never
    /// touches queued or running work.
    ///
    /// Returns the number of records removed.
    pub fn cleanup(&self, ids: Option<&[String]>) -> usize {
        let mut records = self.records.write();
        let removed: Vec<String> = match ids {
            Some(ids) => ids
                .iter()
                .filter(|id| records.remove(id.as_str()).is_some())
                .cloned()
                .collect(),
            None => {
                let terminal: Vec<String> = records
                    .iter()
                    .filter(|(_, record)| record.status.is_terminal())
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in &terminal {
                    records.remove(id);
                }
                terminal
            }
        };
        for id in &removed {
            self.cancellations.clear(id);
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), "tasks cleaned up");
        }
        removed.len()
    }
}
