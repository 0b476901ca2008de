//! Narrow interfaces to the external vector store and embedder.
//!
//! The wire protocols behind these traits are out of scope; the crate only
//! depends on the capability surface below. Implementations are pluggable:
//! the optional [`http`] module provides a REST-backed store, and tests use
//! generated mocks or in-memory fakes.

#[cfg(feature = "http-vector")]
pub mod http;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single exact-match condition on a payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    /// Payload field name.
    pub field: String,
    /// Value the field must equal.
    pub value: serde_json::Value,
}

/// Conjunction of exact-match conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// All conditions must hold.
    pub must: Vec<FieldMatch>,
}

impl Filter {
    /// Creates a filter with a single field condition.
    #[must_use]
    pub fn field(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            must: vec![FieldMatch {
                field: field.into(),
                value: value.into(),
            }],
        }
    }

    /// Adds another field condition.
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.must.push(FieldMatch {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Returns true if the filter has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }
}

/// A point to store: id, vector, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stable point identifier.
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Arbitrary payload attached to the point.
    pub payload: serde_json::Value,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Point identifier.
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Stored payload.
    pub payload: serde_json::Value,
}

/// One page of a scroll over stored points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPage {
    /// Points in this page.
    pub points: Vec<Point>,
    /// Opaque offset to pass back for the next page; `None` when exhausted.
    pub next_offset: Option<String>,
}

/// Capability interface to the external vector store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Searches `collection` for the nearest neighbors of `vector`.
    async fn search<'a>(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&'a Filter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Deletes every point matching `filter`. Returns the number deleted
    /// when the backend reports it, otherwise 0.
    async fn delete_by_filter(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Pages through points matching `filter`.
    async fn scroll<'a>(
        &self,
        collection: &str,
        filter: Option<&'a Filter>,
        offset: Option<&'a str>,
        limit: usize,
    ) -> Result<ScrollPage>;

    /// Inserts or overwrites `points`.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;
}

/// Capability interface to embedding generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Output vector dimension.
    fn dimension(&self) -> usize;

    /// Embeds one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch of texts. The default implementation embeds each text
    /// concurrently; backends with a real batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        futures::future::try_join_all(texts.iter().map(|text| self.embed(text))).await
    }
}
