//! Progress aggregation and digest rendering.
//!
//! Builds a deterministic summary of a [`TaskStore`] snapshot, grouped by
//! task type. Stage inference is a presentation heuristic over the free-form
//! details string and never feeds back into the state machine.

use crate::tasks::record::{TaskRecord, TaskStatus};
use crate::tasks::store::TaskStore;
use crate::util::LLMS_FULL_TASK_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline stage a running ingest task appears to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Fetching source pages.
    Crawl,
    /// Merging fetched pages into a digest.
    Synthesize,
    /// Embedding chunks and writing them to the vector store.
    Embed,
    /// Details did not match any known marker.
    Unknown,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawl => write!(f, "Crawl"),
            Self::Synthesize => write!(f, "Synthesize"),
            Self::Embed => write!(f, "Embed"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Ordered marker table for stage inference. First match wins.
const STAGE_MARKERS: &[(&str, PipelineStage)] = &[
    ("crawl", PipelineStage::Crawl),
    ("fetch", PipelineStage::Crawl),
    ("synthesiz", PipelineStage::Synthesize),
    ("summar", PipelineStage::Synthesize),
    ("merg", PipelineStage::Synthesize),
    ("embed", PipelineStage::Embed),
    ("upsert", PipelineStage::Embed),
    ("vector", PipelineStage::Embed),
];

/// Infers the pipeline stage from a details string.
///
/// Pure function: case-insensitive substring match against a fixed ordered
/// marker table. Absent or unrecognized details degrade to
/// [`PipelineStage::Unknown`].
#[must_use]
pub fn stage_for_details(details: &str) -> PipelineStage {
    let lower = details.to_lowercase();
    STAGE_MARKERS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
        .map_or(PipelineStage::Unknown, |(_, stage)| *stage)
}

/// The currently running member of the distinguished bucket.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTask {
    /// Task identifier.
    pub id: String,
    /// Inferred pipeline stage.
    pub stage: PipelineStage,
    /// Units completed, when determinate.
    pub current: Option<u64>,
    /// Total units, when determinate.
    pub total: Option<u64>,
    /// The raw details string the stage was inferred from.
    pub details: String,
}

impl ActiveTask {
    fn from_record(record: &TaskRecord) -> Self {
        let (current, total) = match record.progress() {
            Some((current, total)) => (Some(current), Some(total)),
            None => (None, None),
        };
        Self {
            id: record.id.clone(),
            stage: stage_for_details(&record.details),
            current,
            total,
            details: record.details.clone(),
        }
    }
}

/// Per-type status tallies.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    /// Bucket name (task type).
    pub name: String,
    /// Total members.
    pub total: usize,
    /// Completed members.
    pub completed: usize,
    /// Running members.
    pub running: usize,
    /// Queued members.
    pub queued: usize,
    /// Failed members.
    pub failed: usize,
    /// Cancelled members.
    pub cancelled: usize,
    /// Running member detail, surfaced for the distinguished bucket only.
    pub active: Option<ActiveTask>,
}

impl BucketSummary {
    fn from_records(name: &str, records: &[&TaskRecord], with_active: bool) -> Self {
        let mut summary = Self {
            name: name.to_string(),
            total: records.len(),
            completed: 0,
            running: 0,
            queued: 0,
            failed: 0,
            cancelled: 0,
            active: None,
        };
        for record in records {
            match record.status {
                TaskStatus::Queued => summary.queued += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Cancelled => summary.cancelled += 1,
            }
        }
        if with_active {
            // Deterministic pick: oldest running member, id as tie-break.
            summary.active = records
                .iter()
                .filter(|record| record.status == TaskStatus::Running)
                .min_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.id.cmp(&b.id))
                })
                .map(|record| ActiveTask::from_record(record));
        }
        summary
    }
}

/// Structured digest of the registry's current state.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSummary {
    /// Non-empty buckets in deterministic order: the distinguished ingest
    /// bucket first, then everything else under `unknown`.
    pub buckets: Vec<BucketSummary>,
}

/// Name of the distinguished ingest bucket.
fn llms_full_bucket_name() -> &'static str {
    LLMS_FULL_TASK_PREFIX.trim_end_matches('-')
}

impl ProgressSummary {
    /// Builds a summary from a snapshot of task records.
    #[must_use]
    pub fn from_records(records: &[TaskRecord]) -> Self {
        let (llms_full, unknown): (Vec<&TaskRecord>, Vec<&TaskRecord>) = records
            .iter()
            .partition(|record| record.id.starts_with(LLMS_FULL_TASK_PREFIX));

        let mut buckets = Vec::new();
        if !llms_full.is_empty() {
            buckets.push(BucketSummary::from_records(
                llms_full_bucket_name(),
                &llms_full,
                true,
            ));
        }
        if !unknown.is_empty() {
            buckets.push(BucketSummary::from_records("unknown", &unknown, false));
        }
        Self { buckets }
    }

    /// Captures a summary from the store's current state.
    #[must_use]
    pub fn capture(store: &TaskStore) -> Self {
        Self::from_records(&store.list())
    }

    /// Renders the digest as human-readable text.
    ///
    /// Output is reproducible for a fixed snapshot: bucket order, field
    /// order, and the active-task pick are all deterministic.
    #[must_use]
    pub fn render(&self) -> String {
        if self.buckets.is_empty() {
            return "No tasks registered.".to_string();
        }

        let mut out = String::from("Task summary:");
        for bucket in &self.buckets {
            out.push_str(&format!(
                "\n  {}: total={} completed={} running={} queued={}",
                bucket.name, bucket.total, bucket.completed, bucket.running, bucket.queued
            ));
            if bucket.failed > 0 {
                out.push_str(&format!(" failed={}", bucket.failed));
            }
            if bucket.cancelled > 0 {
                out.push_str(&format!(" cancelled={}", bucket.cancelled));
            }
            if let Some(active) = &bucket.active {
                out.push_str(&format!("\n    active: {} stage={}", active.id, active.stage));
                if let (Some(current), Some(total)) = (active.current, active.total) {
                    out.push_str(&format!(" [{current}/{total}]"));
                }
                if !active.details.is_empty() {
                    out.push_str(&format!(" ({})", active.details));
                }
            }
        }
        out
    }
}
