use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::ApiError;
use crate::index::SearchIndex;
use crate::llm::CompletionClient;
use crate::translator::{ResultView, Translator};

pub struct AppState<C, S> {
    pub translator: Arc<Translator<C, S>>,
}

// Derived Clone would require C: Clone and S: Clone.
impl<C, S> Clone for AppState<C, S> {
    fn clone(&self) -> Self {
        Self {
            translator: Arc::clone(&self.translator),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NlpQueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NlpQueryResponse {
    pub courses: Vec<ResultView>,
}

pub async fn nlp_query<C, S>(
    State(state): State<AppState<C, S>>,
    payload: Result<Json<NlpQueryRequest>, JsonRejection>,
) -> Result<Json<NlpQueryResponse>, ApiError>
where
    C: CompletionClient + Send + Sync + 'static,
    S: SearchIndex + Send + Sync + 'static,
{
    let Json(request) = payload?;
    let question = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let courses = state.translator.answer(question).await?;
    Ok(Json(NlpQueryResponse { courses }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
