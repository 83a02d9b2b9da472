//! Natural-language question → validated search body → flattened results.
//!
//! A request moves through [`Stage`]s in order. Any step may fail; the error
//! remembers where, and nothing is retried or repaired.

pub mod prompt;
pub mod query;
pub mod view;

use std::fmt;

use tracing::{debug, info, warn};

use crate::index::{IndexError, SearchIndex};
use crate::llm::{CompletionClient, LlmError};

pub use query::{QueryError, StructuredQuery};
pub use view::ResultView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Translating,
    Parsed,
    Executing,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Received => "received",
            Stage::Translating => "translating",
            Stage::Parsed => "parsed",
            Stage::Executing => "executing",
            Stage::Responded => "responded",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("language model error: {0}")]
    TranslationFailed(#[from] LlmError),

    #[error("invalid search query generated: {reason}. Model output: {raw}")]
    MalformedQuery { raw: String, reason: QueryError },

    #[error("search failed: {0}")]
    SearchFailed(#[from] IndexError),
}

impl TranslateError {
    /// Stage the request was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            TranslateError::TranslationFailed(_) => Stage::Translating,
            TranslateError::MalformedQuery { .. } => Stage::Parsed,
            TranslateError::SearchFailed(_) => Stage::Executing,
        }
    }
}

pub struct Translator<C, S> {
    llm: C,
    index: S,
}

impl<C: CompletionClient, S: SearchIndex> Translator<C, S> {
    pub fn new(llm: C, index: S) -> Self {
        Self { llm, index }
    }

    /// Raw model output for `question`.
    pub async fn generate(&self, question: &str) -> Result<String, TranslateError> {
        let raw = self.llm.complete(&prompt::build(question)).await?;
        debug!(generated = %raw, "model output");
        Ok(raw)
    }

    pub async fn translate(&self, question: &str) -> Result<StructuredQuery, TranslateError> {
        let raw = self.generate(question).await?;
        parse_structured_query(&raw)
    }

    pub async fn execute(&self, query: &StructuredQuery) -> Result<Vec<ResultView>, TranslateError> {
        let hits = self.index.search(&query.to_body()).await?;
        Ok(hits.iter().map(ResultView::from_source).collect())
    }

    /// Full round trip for one request.
    pub async fn answer(&self, question: &str) -> Result<Vec<ResultView>, TranslateError> {
        debug!(stage = %Stage::Received, question, "query received");

        let result = async {
            debug!(stage = %Stage::Translating, "requesting completion");
            let query = self.translate(question).await?;
            debug!(stage = %Stage::Executing, "running search");
            self.execute(&query).await
        }
        .await;

        match &result {
            Ok(courses) => info!(stage = %Stage::Responded, courses = courses.len(), "query answered"),
            Err(e) => warn!(stage = %e.stage(), error = %e, "query failed"),
        }
        result
    }
}

/// Strict parse of model output. Fenced or otherwise decorated JSON is
/// rejected, not repaired.
pub fn parse_structured_query(raw: &str) -> Result<StructuredQuery, TranslateError> {
    let query = StructuredQuery::parse(raw).map_err(|reason| TranslateError::MalformedQuery {
        raw: raw.to_string(),
        reason,
    })?;
    debug!(stage = %Stage::Parsed, "generated query accepted");
    Ok(query)
}
