//! Route handlers and error mapping.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use sumcite_rs::document::FileDocumentSource;
use sumcite_rs::engine::{
    ChartRequest, EngineConfig, FileArtifactSource, MemoryConversationStore, MultiSummaryRequest,
    MultiSummaryResponse, RewriteRequest, SummaryEngine, SummaryRequest, SummaryResponse,
    TransientResponse,
};
use sumcite_rs::{CompletionClient, SumciteError};

/// Shared application state passed to all handlers.
///
/// Generic over the completion capability so the same router serves a live
/// client in production and a scripted one in tests.
pub struct AppState<C> {
    pub client: Arc<C>,
    pub store: Arc<MemoryConversationStore>,
    pub documents: Arc<FileDocumentSource>,
    pub artifacts: Arc<FileArtifactSource>,
    pub config: EngineConfig,
}

// Manual impl: `C` itself doesn't need to be `Clone` behind the `Arc`.
impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
            documents: self.documents.clone(),
            artifacts: self.artifacts.clone(),
            config: self.config.clone(),
        }
    }
}

/// JSON error body returned for every failed request.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Map an engine error to its HTTP status.
fn error_response(err: SumciteError) -> ApiError {
    let status = match &err {
        SumciteError::Validation(_) => StatusCode::BAD_REQUEST,
        SumciteError::UnknownConversation(_)
        | SumciteError::DocumentSource(_)
        | SumciteError::Artifact(_) => StatusCode::NOT_FOUND,
        SumciteError::ModelOutput(_) | SumciteError::Upstream(_) => StatusCode::BAD_GATEWAY,
        SumciteError::Store(_) | SumciteError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("request failed: {err}");
    }
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

/// POST /summaries/generate — one single-document turn.
async fn generate<C: CompletionClient>(
    State(app): State<AppState<C>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let engine = SummaryEngine::new(app.client.as_ref(), app.store.as_ref(), app.config.clone());
    engine
        .generate(app.documents.as_ref(), &request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /summaries/generate-multi — one multi-document turn.
async fn generate_multi<C: CompletionClient>(
    State(app): State<AppState<C>>,
    Json(request): Json<MultiSummaryRequest>,
) -> Result<Json<MultiSummaryResponse>, ApiError> {
    let engine = SummaryEngine::new(app.client.as_ref(), app.store.as_ref(), app.config.clone());
    engine
        .generate_multi(app.artifacts.as_ref(), &request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /rewrite/email — one email-style rewrite turn.
async fn rewrite_email<C: CompletionClient>(
    State(app): State<AppState<C>>,
    Json(request): Json<RewriteRequest>,
) -> Result<Json<TransientResponse>, ApiError> {
    let engine = SummaryEngine::new(app.client.as_ref(), app.store.as_ref(), app.config.clone());
    engine
        .rewrite_email(&request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /charts/explain — one chart-explanation turn.
async fn explain_chart<C: CompletionClient>(
    State(app): State<AppState<C>>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<TransientResponse>, ApiError> {
    let engine = SummaryEngine::new(app.client.as_ref(), app.store.as_ref(), app.config.clone());
    engine
        .explain_chart(&request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Build the full router with permissive CORS.
pub fn build_router<C: CompletionClient + 'static>(state: AppState<C>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/summaries/generate", post(generate::<C>))
        .route("/summaries/generate-multi", post(generate_multi::<C>))
        .route("/rewrite/email", post(rewrite_email::<C>))
        .route("/charts/explain", post(explain_chart::<C>))
        .with_state(state)
        .layer(cors)
}

/// Bind and serve until shutdown.
pub async fn serve<C: CompletionClient + 'static>(
    state: AppState<C>,
    bind_addr: SocketAddr,
) -> Result<(), String> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| format!("failed to bind {bind_addr}: {e}"))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("failed to read bound address: {e}"))?;
    tracing::info!("sumcite-web listening on http://{addr}");
    axum::serve(listener, router)
        .await
        .map_err(|e| format!("server error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumcite_rs::ScriptedClient;

    fn scripted_state(responses: Vec<String>) -> AppState<ScriptedClient> {
        AppState {
            client: Arc::new(ScriptedClient::new(responses)),
            store: Arc::new(MemoryConversationStore::new()),
            documents: Arc::new(FileDocumentSource::new("documents")),
            artifacts: Arc::new(FileArtifactSource::new("artifacts")),
            config: EngineConfig::default(),
        }
    }

    #[test]
    fn error_statuses() {
        let (status, _) = error_response(SumciteError::Validation("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(SumciteError::UnknownConversation("x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(SumciteError::ModelOutput("x".into()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(SumciteError::Upstream("x".into()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(SumciteError::Store("x".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn router_builds_with_scripted_client() {
        // Construction itself exercises the generic handler wiring.
        let _router = build_router(scripted_state(vec![]));
    }

    #[tokio::test]
    async fn rewrite_handler_runs_end_to_end() {
        let state = scripted_state(vec!["Dear team, hello.".to_string()]);
        let response = rewrite_email(
            State(state),
            Json(RewriteRequest {
                conversation_id: None,
                prompt: "say hello".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.content, "Dear team, hello.");
    }

    #[tokio::test]
    async fn unknown_conversation_maps_to_404() {
        let state = scripted_state(vec![]);
        let result = rewrite_email(
            State(state),
            Json(RewriteRequest {
                conversation_id: Some("missing".into()),
                prompt: "hi".into(),
            }),
        )
        .await;
        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
