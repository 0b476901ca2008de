//! REST-backed [`VectorStore`] implementation.
//!
//! Speaks a Qdrant-style points API. Failures are mapped to the transient
//! `VectorStore` error variant at this boundary; retrying is the call
//! site's job, through the retry executor.

use crate::config::VectorConfig;
use crate::errors::{DocdexError, Result};
use crate::vector::{Filter, Point, ScoredPoint, ScrollPage, VectorStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// HTTP client for a remote vector store.
#[derive(Debug, Clone)]
pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVectorStore {
    /// Builds a client from the vector configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_seconds))
            .build()
            .map_err(|e| DocdexError::vector_store(format!("client construction: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn points_url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collections/{collection}/points{suffix}", self.base_url)
    }

    fn filter_body(filter: &Filter) -> serde_json::Value {
        let must: Vec<serde_json::Value> = filter
            .must
            .iter()
            .map(|m| json!({"key": m.field, "match": {"value": m.value}}))
            .collect();
        json!({ "must": must })
    }

    async fn post_json(
        &self,
        url: &str,
        op: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DocdexError::vector_store(format!("{op}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DocdexError::vector_store(format!(
                "{op}: status {status}: {text}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| DocdexError::vector_store(format!("{op}: decoding response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    score: f32,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ScrollPointBody {
    id: String,
    #[serde(default)]
    vector: Vec<f32>,
    #[serde(default)]
    payload: serde_json::Value,
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn search<'a>(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&'a Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter {
            body["filter"] = Self::filter_body(filter);
        }

        let response = self
            .post_json(&self.points_url(collection, "/search"), "search", &body)
            .await?;
        let hits: Vec<SearchHit> = serde_json::from_value(response["result"].clone())?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let body = json!({ "filter": Self::filter_body(filter) });
        let response = self
            .post_json(&self.points_url(collection, "/delete"), "delete", &body)
            .await?;
        Ok(response["result"]["operation_id"].as_u64().unwrap_or(0))
    }

    async fn scroll<'a>(
        &self,
        collection: &str,
        filter: Option<&'a Filter>,
        offset: Option<&'a str>,
        limit: usize,
    ) -> Result<ScrollPage> {
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": true,
        });
        if let Some(filter) = filter {
            body["filter"] = Self::filter_body(filter);
        }
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let response = self
            .post_json(&self.points_url(collection, "/scroll"), "scroll", &body)
            .await?;
        let points: Vec<ScrollPointBody> =
            serde_json::from_value(response["result"]["points"].clone())?;
        let next_offset = response["result"]["next_page_offset"]
            .as_str()
            .map(ToString::to_string);

        Ok(ScrollPage {
            points: points
                .into_iter()
                .map(|p| Point {
                    id: p.id,
                    vector: p.vector,
                    payload: p.payload,
                })
                .collect(),
            next_offset,
        })
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let body = json!({
            "points": points
                .iter()
                .map(|p| json!({"id": p.id, "vector": p.vector, "payload": p.payload}))
                .collect::<Vec<_>>(),
        });
        self.post_json(&self.points_url(collection, ""), "upsert", &body)
            .await?;
        Ok(())
    }
}
