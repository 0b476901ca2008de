//! Configuration types for the docdex service.

use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the ingest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of source pages per ingest task.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Number of chunks embedded and upserted per batch.
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
}

fn default_max_pages() -> usize {
    64
}

fn default_chunk_chars() -> usize {
    2_000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_embed_batch_size() -> usize {
    16
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            chunk_chars: default_chunk_chars(),
            chunk_overlap: default_chunk_overlap(),
            embed_batch_size: default_embed_batch_size(),
        }
    }
}

/// Configuration for the vector store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Base URL of the vector store REST endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Collection holding document chunks.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
}

fn default_base_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "docdex".to_string()
}

fn default_timeout_seconds() -> f64 {
    30.0
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            collection: default_collection(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocdexConfig {
    /// Retry behavior for remote calls.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Ingest pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Vector store settings.
    #[serde(default)]
    pub vector: VectorConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocdexConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.pipeline.max_pages, 64);
        assert_eq!(config.vector.collection, "docdex");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DocdexConfig = serde_json::from_str(
            r#"{"vector": {"collection": "docs"}, "retry": {"max_attempts": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.vector.collection, "docs");
        assert_eq!(config.vector.base_url, "http://localhost:6333");
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.initial_delay_ms, 500);
        assert_eq!(config.pipeline.chunk_chars, 2_000);
    }

    #[test]
    fn test_round_trip() {
        let config = DocdexConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: DocdexConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pipeline.embed_batch_size, config.pipeline.embed_batch_size);
    }
}
