//! The get-llms-full ingest pipeline driver.
//!
//! Crawl, synthesis, and embedding business logic live behind the
//! [`PageFetcher`], [`Embedder`], and [`VectorStore`] seams. The driver owns
//! what the registry cares about: it creates the task record, reports
//! details and progress as it moves through the stages, polls cancellation
//! between units of work, wraps every remote call in the retry executor,
//! and lands the task in exactly one terminal state.

mod chunk;

pub use chunk::{chunk_text, DocChunk};

use crate::config::DocdexConfig;
use crate::errors::{DocdexError, Result};
use crate::retry::run_with_retry;
use crate::tasks::{TaskStatus, TaskStore};
use crate::util::llms_full_task_id;
use crate::vector::{Embedder, Point, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// A fetched source page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL the page was fetched from.
    pub url: String,
    /// Page title, when the fetcher could extract one.
    pub title: Option<String>,
    /// Extracted text content.
    pub content: String,
}

/// Capability interface for crawling source pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches and extracts one page.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Driver for the distinguished ingest pipeline.
pub struct LlmsFullPipeline {
    store: Arc<TaskStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    fetcher: Arc<dyn PageFetcher>,
    config: DocdexConfig,
}

impl LlmsFullPipeline {
    /// Creates a driver over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<TaskStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        fetcher: Arc<dyn PageFetcher>,
        config: DocdexConfig,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            fetcher,
            config,
        }
    }

    /// Validates `sources`, registers a queued task, and spawns the ingest
    /// in the background. Returns the new task identifier immediately.
    ///
    /// # Errors
    ///
    /// Returns [`DocdexError::InvalidParams`] for an empty or oversized
    /// source list or a non-HTTP URL, and [`DocdexError::DuplicateTask`] if
    /// the generated identifier collides (practically unreachable).
    pub fn spawn(self: Arc<Self>, sources: Vec<String>) -> Result<String> {
        if sources.is_empty() {
            return Err(DocdexError::invalid_params("at least one source URL required"));
        }
        if sources.len() > self.config.pipeline.max_pages {
            return Err(DocdexError::invalid_params(format!(
                "too many sources: {} exceeds limit {}",
                sources.len(),
                self.config.pipeline.max_pages
            )));
        }
        for url in &sources {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(DocdexError::invalid_params(format!(
                    "source is not an HTTP(S) URL: {url}"
                )));
            }
        }

        let task_id = llms_full_task_id();
        self.store.create(&task_id, "queued for ingest")?;
        info!(task_id = %task_id, sources = sources.len(), "ingest task submitted");

        let id = task_id.clone();
        tokio::spawn(async move {
            self.run(&id, &sources).await;
        });
        Ok(task_id)
    }

    /// Runs the ingest and records the terminal status.
    async fn run(&self, task_id: &str, sources: &[String]) {
        let outcome = self.execute(task_id, sources).await;
        let recorded = match outcome {
            Ok(chunks) => self.store.update_status(
                task_id,
                TaskStatus::Completed,
                Some(&format!(
                    "ingested {chunks} chunks from {} pages",
                    sources.len()
                )),
            ),
            Err(err) if err.is_cancelled() => {
                self.store
                    .update_status(task_id, TaskStatus::Cancelled, Some("cancelled by request"))
            }
            Err(err) => {
                self.store
                    .update_status(task_id, TaskStatus::Failed, Some(&err.to_string()))
            }
        };
        if let Err(err) = recorded {
            warn!(task_id = %task_id, error = %err, "could not record terminal status");
        }
    }

    async fn execute(&self, task_id: &str, sources: &[String]) -> Result<usize> {
        let cancellations = self.store.cancellations();
        let retry = &self.config.retry;

        // Crawl
        let total_pages = sources.len() as u64;
        let mut pages = Vec::with_capacity(sources.len());
        for (index, url) in sources.iter().enumerate() {
            self.checkpoint(task_id)?;
            self.store
                .update_status(task_id, TaskStatus::Running, Some(&format!("Crawling {url}")))?;
            self.store
                .update_progress(task_id, index as u64, total_pages);
            let page = run_with_retry(&cancellations, retry, Some(task_id), || {
                self.fetcher.fetch(url)
            })
            .await?;
            pages.push(page);
        }
        self.store
            .update_progress(task_id, total_pages, total_pages);

        // Synthesize
        self.checkpoint(task_id)?;
        self.store
            .update_status(task_id, TaskStatus::Running, Some("Synthesizing digest"))?;
        let digest = synthesize(&pages);
        let chunks = chunk_text("llms-full", &digest, &self.config.pipeline);

        // Embed + upsert
        let batch_size = self.config.pipeline.embed_batch_size.max(1);
        let batches: Vec<&[DocChunk]> = chunks.chunks(batch_size).collect();
        let total_batches = batches.len() as u64;
        for (index, batch) in batches.iter().enumerate() {
            self.checkpoint(task_id)?;
            self.store.update_status(
                task_id,
                TaskStatus::Running,
                Some(&format!("Embedding batch {}/{total_batches}", index + 1)),
            )?;
            self.store
                .update_progress(task_id, index as u64, total_batches);

            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = run_with_retry(&cancellations, retry, Some(task_id), || {
                self.embedder.embed_batch(&texts)
            })
            .await?;

            let points: Vec<Point> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| Point {
                    id: chunk.id.clone(),
                    vector,
                    payload: chunk.payload(),
                })
                .collect();
            run_with_retry(&cancellations, retry, Some(task_id), || {
                self.vectors
                    .upsert(&self.config.vector.collection, points.clone())
            })
            .await?;
            self.store
                .update_progress(task_id, index as u64 + 1, total_batches);
        }

        Ok(chunks.len())
    }

    fn checkpoint(&self, task_id: &str) -> Result<()> {
        if self.store.cancellations().is_cancelled(task_id) {
            return Err(DocdexError::cancelled(task_id));
        }
        Ok(())
    }
}

/// Merges fetched pages into one digest document.
fn synthesize(pages: &[FetchedPage]) -> String {
    let mut digest = String::new();
    for page in pages {
        let heading = page.title.as_deref().unwrap_or(&page.url);
        digest.push_str(&format!("# {heading}\n\n{}\n\n", page.content.trim()));
    }
    digest
}
