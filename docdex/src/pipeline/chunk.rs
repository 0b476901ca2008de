//! Digest chunking with stable point identifiers.

use crate::config::PipelineConfig;
use crate::util::content_hash;
use serde_json::json;

/// A chunk of synthesized digest text, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DocChunk {
    /// Stable point identifier, derived from `source` and position so that
    /// re-ingesting overwrites instead of duplicating.
    pub id: String,
    /// Position of the chunk within its source document.
    pub seq: usize,
    /// Source document label.
    pub source: String,
    /// Chunk text.
    pub text: String,
}

impl DocChunk {
    /// Payload stored alongside the chunk's vector.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        json!({
            "source": self.source,
            "seq": self.seq,
            "text": self.text,
            "content_hash": content_hash(&self.text),
        })
    }
}

/// Splits `text` into fixed-size character windows with overlap.
///
/// Windows never split a `char`. An empty input yields no chunks.
#[must_use]
pub fn chunk_text(source: &str, text: &str, config: &PipelineConfig) -> Vec<DocChunk> {
    let chunk_chars = config.chunk_chars.max(1);
    let overlap = config.chunk_overlap.min(chunk_chars - 1);
    let step = chunk_chars - overlap;

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_chars).min(chars.len());
        let seq = chunks.len();
        chunks.push(DocChunk {
            id: content_hash(&format!("{source}#{seq}")),
            seq,
            source: source.to_string(),
            text: chars[start..end].iter().collect(),
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_chars: usize, chunk_overlap: usize) -> PipelineConfig {
        PipelineConfig {
            chunk_chars,
            chunk_overlap,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("src", "", &config(10, 2)).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("src", "hello", &config(10, 2));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].seq, 0);
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunk_text("src", "abcdefghij", &config(4, 2));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn test_ids_stable_across_reingest() {
        let first = chunk_text("src", "abcdefghij", &config(4, 2));
        let second = chunk_text("src", "abcdefghij", &config(4, 2));
        assert_eq!(first, second);

        let other_source = chunk_text("other", "abcdefghij", &config(4, 2));
        assert_ne!(first[0].id, other_source[0].id);
    }

    #[test]
    fn test_multibyte_not_split() {
        let chunks = chunk_text("src", "héllo wörld détente", &config(5, 1));
        let rejoined: String = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| {
                // Drop the overlapping first char of every later window.
                if i == 0 {
                    c.text.clone()
                } else {
                    c.text.chars().skip(1).collect()
                }
            })
            .collect();
        assert_eq!(rejoined, "héllo wörld détente");
    }

    #[test]
    fn test_payload_carries_fingerprint() {
        let chunks = chunk_text("src", "hello", &config(10, 0));
        let payload = chunks[0].payload();
        assert_eq!(payload["source"], "src");
        assert_eq!(payload["seq"], 0);
        assert_eq!(payload["content_hash"], crate::util::content_hash("hello"));
    }
}
