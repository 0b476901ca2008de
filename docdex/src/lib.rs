//! # Docdex
//!
//! The in-process core of a documentation-ingest service. Long-running
//! crawl/synthesize/embed pipelines are exposed to a stateless
//! request/response protocol, so the crate keeps durable in-memory
//! bookkeeping of every in-flight and recently finished unit of work:
//!
//! - **Task registry**: creation, status transitions, progress updates,
//!   cancellation flags, cleanup ([`tasks`])
//! - **Retry coordination**: bounded exponential backoff with jitter that
//!   honors cooperative cancellation ([`retry`])
//! - **Progress reporting**: a deterministic digest of the registry grouped
//!   by task type and pipeline stage ([`tasks::ProgressSummary`])
//! - **Collaborator seams**: narrow traits for the vector store, embedder,
//!   and page fetcher ([`vector`], [`pipeline`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docdex::prelude::*;
//!
//! let store = Arc::new(TaskStore::new());
//! let service = DocdexService::new(store, vectors, embedder, fetcher, config);
//!
//! let task_id = service.submit_llms_full(sources)?;
//! println!("{}", service.render_progress_summary());
//! service.request_cancellation(&task_id);
//! ```
//!
//! State is process-local and volatile: the registry is rebuilt empty on
//! restart, and tasks are never shared across processes.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod pipeline;
pub mod retry;
pub mod service;
pub mod tasks;
pub mod telemetry;
pub mod util;
pub mod vector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DocdexConfig, PipelineConfig, VectorConfig};
    pub use crate::errors::{DocdexError, Result, RetryClass};
    pub use crate::pipeline::{DocChunk, FetchedPage, LlmsFullPipeline, PageFetcher};
    pub use crate::retry::{compute_delay, run_with_retry, RetryConfig};
    pub use crate::service::DocdexService;
    pub use crate::tasks::{
        stage_for_details, CancellationRegistry, PipelineStage, ProgressSummary, TaskRecord,
        TaskStatus, TaskStore,
    };
    pub use crate::util::{iso_timestamp, llms_full_task_id, Timestamp};
    pub use crate::vector::{Embedder, Filter, Point, ScoredPoint, ScrollPage, VectorStore};
}
