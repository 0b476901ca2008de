//! Timestamp, identifier, and content fingerprint helpers.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Identifier prefix carried by tasks of the distinguished ingest pipeline.
///
/// The prefix is used purely for classification in progress reporting and is
/// never parsed for any other meaning.
pub const LLMS_FULL_TASK_PREFIX: &str = "get-llms-full-";

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the current UTC time as an ISO 8601 formatted string:
/// `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Generates a fresh task identifier for the distinguished ingest pipeline.
#[must_use]
pub fn llms_full_task_id() -> String {
    format!("{LLMS_FULL_TASK_PREFIX}{}", Uuid::new_v4())
}

/// Returns the hex-encoded SHA-256 fingerprint of `text`.
#[must_use]
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
