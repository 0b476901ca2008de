//! Boundary operations consumed by the protocol layer.
//!
//! The transport hands this service already-framed calls; everything here is
//! either a pass-through to the task registry or a parameter-validated
//! pass-through to the vector store. Validation failures are
//! [`DocdexError::InvalidParams`] and never reach a remote call.

use crate::config::DocdexConfig;
use crate::errors::{DocdexError, Result};
use crate::pipeline::{LlmsFullPipeline, PageFetcher};
use crate::retry::run_with_retry;
use crate::tasks::{ProgressSummary, TaskRecord, TaskStatus, TaskStore};
use crate::vector::{Embedder, Filter, ScoredPoint, ScrollPage, VectorStore};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Upper bound on search/scroll page sizes.
const MAX_PAGE_LIMIT: usize = 100;

fn collection_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").expect("collection pattern is valid")
    })
}

fn validate_collection(name: &str) -> Result<()> {
    if collection_pattern().is_match(name) {
        Ok(())
    } else {
        Err(DocdexError::invalid_params(format!(
            "invalid collection name: {name:?}"
        )))
    }
}

fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(DocdexError::invalid_params(format!(
            "limit must be in 1..={MAX_PAGE_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

/// The service facade over the task registry, retry executor, and external
/// collaborators.
pub struct DocdexService {
    store: Arc<TaskStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    pipeline: Arc<LlmsFullPipeline>,
    config: DocdexConfig,
}

impl DocdexService {
    /// Wires the service together from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<TaskStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        fetcher: Arc<dyn PageFetcher>,
        config: DocdexConfig,
    ) -> Self {
        let pipeline = Arc::new(LlmsFullPipeline::new(
            Arc::clone(&store),
            Arc::clone(&vectors),
            Arc::clone(&embedder),
            fetcher,
            config.clone(),
        ));
        Self {
            store,
            vectors,
            embedder,
            pipeline,
            config,
        }
    }

    // --- task registry pass-throughs -----------------------------------

    /// Creates a task record.
    ///
    /// # Errors
    ///
    /// [`DocdexError::DuplicateTask`] if the identifier exists.
    pub fn create_task(&self, id: &str, initial_details: &str) -> Result<TaskRecord> {
        if id.trim().is_empty() {
            return Err(DocdexError::invalid_params("task id must not be empty"));
        }
        self.store.create(id, initial_details)
    }

    /// Applies a status transition.
    ///
    /// # Errors
    ///
    /// [`DocdexError::UnknownTask`] if the identifier was never created.
    pub fn set_status(&self, id: &str, status: TaskStatus, details: Option<&str>) -> Result<()> {
        self.store.update_status(id, status, details)
    }

    /// Updates progress counters; silently ignored for unknown or terminal
    /// tasks.
    pub fn set_progress(&self, id: &str, current: u64, total: u64) {
        self.store.update_progress(id, current, total);
    }

    /// Requests cancellation; idempotent and silent on unknown identifiers.
    pub fn request_cancellation(&self, id: &str) {
        self.store.request_cancellation(id);
    }

    /// Returns a snapshot of one task.
    #[must_use]
    pub fn get_task(&self, id: &str) -> Option<TaskRecord> {
        self.store.get(id)
    }

    /// Returns a snapshot of all tasks.
    #[must_use]
    pub fn list_tasks(&self) -> Vec<TaskRecord> {
        self.store.list()
    }

    /// Removes the named tasks, or every terminal task when `ids` is `None`.
    /// Returns the number removed.
    pub fn cleanup(&self, ids: Option<&[String]>) -> usize {
        self.store.cleanup(ids)
    }

    /// Captures the structured progress digest.
    #[must_use]
    pub fn progress_summary(&self) -> ProgressSummary {
        ProgressSummary::capture(&self.store)
    }

    /// Renders the progress digest as text.
    #[must_use]
    pub fn render_progress_summary(&self) -> String {
        self.progress_summary().render()
    }

    // --- ingest ---------------------------------------------------------

    /// Submits a get-llms-full ingest over `sources` and returns its task id.
    ///
    /// # Errors
    ///
    /// [`DocdexError::InvalidParams`] for an empty/oversized source list or
    /// non-HTTP URLs.
    pub fn submit_llms_full(&self, sources: Vec<String>) -> Result<String> {
        Arc::clone(&self.pipeline).spawn(sources)
    }

    // --- validated vector store pass-throughs ---------------------------

    /// Embeds `query` and searches the chunk collection.
    ///
    /// # Errors
    ///
    /// [`DocdexError::InvalidParams`] for an empty query or out-of-range
    /// limit; transient collaborator errors after retries are exhausted.
    pub async fn search_docs(
        &self,
        query: &str,
        limit: usize,
        source: Option<&str>,
    ) -> Result<Vec<ScoredPoint>> {
        if query.trim().is_empty() {
            return Err(DocdexError::invalid_params("query must not be empty"));
        }
        validate_limit(limit)?;
        validate_collection(&self.config.vector.collection)?;

        let cancellations = self.store.cancellations();
        let vector = run_with_retry(&cancellations, &self.config.retry, None, || {
            self.embedder.embed(query)
        })
        .await?;

        let filter = source.map(|source| Filter::field("source", source));
        run_with_retry(&cancellations, &self.config.retry, None, || {
            self.vectors.search(
                &self.config.vector.collection,
                &vector,
                limit,
                filter.as_ref(),
            )
        })
        .await
    }

    /// Deletes every chunk ingested from `source`. Returns the backend's
    /// deletion count.
    ///
    /// # Errors
    ///
    /// [`DocdexError::InvalidParams`] for an empty source; transient
    /// collaborator errors after retries are exhausted.
    pub async fn delete_source(&self, source: &str) -> Result<u64> {
        if source.trim().is_empty() {
            return Err(DocdexError::invalid_params("source must not be empty"));
        }
        validate_collection(&self.config.vector.collection)?;

        let filter = Filter::field("source", source);
        let cancellations = self.store.cancellations();
        run_with_retry(&cancellations, &self.config.retry, None, || {
            self.vectors
                .delete_by_filter(&self.config.vector.collection, &filter)
        })
        .await
    }

    /// Pages through stored chunks, optionally restricted to one source.
    ///
    /// # Errors
    ///
    /// [`DocdexError::InvalidParams`] for an out-of-range limit; transient
    /// collaborator errors after retries are exhausted.
    pub async fn scroll_chunks(
        &self,
        source: Option<&str>,
        offset: Option<&str>,
        limit: usize,
    ) -> Result<ScrollPage> {
        validate_limit(limit)?;
        validate_collection(&self.config.vector.collection)?;

        let filter = source.map(|source| Filter::field("source", source));
        let cancellations = self.store.cancellations();
        run_with_retry(&cancellations, &self.config.retry, None, || {
            self.vectors.scroll(
                &self.config.vector.collection,
                filter.as_ref(),
                offset,
                limit,
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FetchedPage;
    use crate::retry::RetryConfig;
    use crate::vector::{MockEmbedder, MockVectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopFetcher;

    #[async_trait]
    impl PageFetcher for NoopFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            Ok(FetchedPage {
                url: url.to_string(),
                title: None,
                content: String::new(),
            })
        }
    }

    fn service_with(vectors: MockVectorStore, embedder: MockEmbedder) -> DocdexService {
        let mut config = DocdexConfig::default();
        config.retry = RetryConfig::new().with_max_attempts(3).with_initial_delay_ms(1);
        DocdexService::new(
            Arc::new(TaskStore::new()),
            Arc::new(vectors),
            Arc::new(embedder),
            Arc::new(NoopFetcher),
            config,
        )
    }

    #[test]
    fn test_collection_validation() {
        assert!(validate_collection("docdex").is_ok());
        assert!(validate_collection("docs_2024-q1").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("-leading-dash").is_err());
        assert!(validate_collection("has space").is_err());
        assert!(validate_collection(&"x".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query_before_any_remote_call() {
        let mut vectors = MockVectorStore::new();
        vectors.expect_search().times(0);
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().times(0);

        let service = service_with(vectors, embedder);
        let err = service.search_docs("   ", 10, None).await.unwrap_err();
        assert!(matches!(err, DocdexError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_search_rejects_out_of_range_limit() {
        let service = service_with(MockVectorStore::new(), MockEmbedder::new());
        assert!(service.search_docs("q", 0, None).await.is_err());
        assert!(service.search_docs("q", 101, None).await.is_err());
    }

    #[tokio::test]
    async fn test_search_embeds_then_searches() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .times(1)
            .returning(|_| Ok(vec![0.1, 0.2]));

        let mut vectors = MockVectorStore::new();
        vectors
            .expect_search()
            .times(1)
            .withf(|collection, vector, limit, filter| {
                collection == "docdex"
                    && vector == &[0.1, 0.2][..]
                    && *limit == 5
                    && filter.is_none()
            })
            .returning(|_, _, _, _| {
                Ok(vec![ScoredPoint {
                    id: "p1".to_string(),
                    score: 0.9,
                    payload: serde_json::json!({"source": "https://a"}),
                }])
            });

        let service = service_with(vectors, embedder);
        let hits = service.search_docs("how do I configure", 5, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "p1");
    }

    #[tokio::test]
    async fn test_search_passes_source_filter() {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|_| Ok(vec![1.0]));

        let mut vectors = MockVectorStore::new();
        vectors
            .expect_search()
            .times(1)
            .withf(|_, _, _, filter| {
                filter.is_some_and(|f| f.must[0].field == "source" && f.must[0].value == "https://a")
            })
            .returning(|_, _, _, _| Ok(Vec::new()));

        let service = service_with(vectors, embedder);
        service
            .search_docs("q", 10, Some("https://a"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_search_retries_transient_store_failures() {
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|_| Ok(vec![1.0]));

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        let mut vectors = MockVectorStore::new();
        vectors.expect_search().times(2).returning(move |_, _, _, _| {
            if calls_in.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DocdexError::vector_store("connection reset"))
            } else {
                Ok(Vec::new())
            }
        });

        let service = service_with(vectors, embedder);
        assert!(service.search_docs("q", 10, None).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_source_validates_then_deletes() {
        let mut vectors = MockVectorStore::new();
        vectors
            .expect_delete_by_filter()
            .times(1)
            .withf(|_, filter| filter.must[0].value == "https://a")
            .returning(|_, _| Ok(12));

        let service = service_with(vectors, MockEmbedder::new());
        assert!(service.delete_source(" ").await.is_err());
        assert_eq!(service.delete_source("https://a").await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_scroll_chunks_forwards_offset() {
        let mut vectors = MockVectorStore::new();
        vectors
            .expect_scroll()
            .times(1)
            .withf(|_, filter, offset, limit| {
                filter.is_none() && *offset == Some("cursor-1") && *limit == 50
            })
            .returning(|_, _, _, _| Ok(ScrollPage::default()));

        let service = service_with(vectors, MockEmbedder::new());
        let page = service
            .scroll_chunks(None, Some("cursor-1"), 50)
            .await
            .unwrap();
        assert!(page.points.is_empty());
    }

    #[tokio::test]
    async fn test_task_passthroughs_and_summary() {
        let service = service_with(MockVectorStore::new(), MockEmbedder::new());

        service.create_task("get-llms-full-1", "queued").unwrap();
        assert!(matches!(
            service.create_task("", "x").unwrap_err(),
            DocdexError::InvalidParams(_)
        ));

        service
            .set_status("get-llms-full-1", TaskStatus::Running, Some("Embedding batch 1"))
            .unwrap();
        service.set_progress("get-llms-full-1", 1, 4);

        let rendered = service.render_progress_summary();
        assert!(rendered.contains("stage=Embed"));
        assert!(rendered.contains("[1/4]"));

        service.request_cancellation("get-llms-full-1");
        service
            .set_status("get-llms-full-1", TaskStatus::Cancelled, None)
            .unwrap();
        assert_eq!(service.cleanup(None), 1);
        assert!(service.list_tasks().is_empty());
        assert_eq!(service.render_progress_summary(), "No tasks registered.");
    }
}
