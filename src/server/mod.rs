//! HTTP surface: `POST /nlp-query` and `GET /health`.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::index::SearchIndex;
use crate::llm::CompletionClient;
use crate::translator::Translator;

use error::ApiError;
pub use handlers::AppState;

/// Requests still running after `request_timeout` get a 408 with the usual
/// `{"error": ...}` body.
pub fn build_router<C, S>(translator: Arc<Translator<C, S>>, request_timeout: Duration) -> Router
where
    C: CompletionClient + Send + Sync + 'static,
    S: SearchIndex + Send + Sync + 'static,
{
    Router::new()
        .route("/nlp-query", post(handlers::nlp_query::<C, S>))
        .route("/health", get(handlers::health))
        .with_state(AppState { translator })
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::map_response(timeout_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// `TimeoutLayer` answers with an empty body; handlers never return 408.
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ApiError::Timeout.into_response();
    }
    response
}

pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
