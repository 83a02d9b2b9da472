//! Search index access: schema creation, document upsert, and query execution.

pub mod elastic;
#[cfg(test)]
pub mod memory;

use std::future::Future;

use serde_json::Value;

use crate::course::CourseDocument;

pub use elastic::{BasicAuth, ElasticIndex};

pub const DEFAULT_INDEX: &str = "course_index";

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("search engine error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("invalid search engine URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("search engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected search engine response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

/// Index operations used by both the importer and the translator.
///
/// Futures are `Send` so implementations can back axum handlers.
pub trait SearchIndex {
    /// Create the index with the course mapping. An existing index is left
    /// untouched and reported as [`EnsureOutcome::AlreadyExists`].
    fn ensure_index(&self) -> impl Future<Output = Result<EnsureOutcome, IndexError>> + Send;

    /// Insert or replace the document stored under `id`.
    fn put_document(
        &self,
        id: &str,
        doc: &CourseDocument,
    ) -> impl Future<Output = Result<(), IndexError>> + Send;

    /// Run a search body and return the `_source` of every hit, in rank order.
    fn search(&self, body: &Value) -> impl Future<Output = Result<Vec<Value>, IndexError>> + Send;
}
