use crate::completions::Completions;
use crate::error::ApiError;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info};
use tutor_core::wire::{ChatReply, ChatRequest};

#[derive(Clone)]
pub struct AppState {
    pub completions: Arc<dyn Completions>,
}

/// Builds the relay router: the chat endpoint, the browser client, and a 404
/// for everything else.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    // Configure a permissive CORS policy so the client can be served from elsewhere.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/api/chat", post(chat))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .fallback_service(assets)
        .layer(cors)
        .with_state(state)
}

/// Relays one learner message to the completion provider.
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate()?;

    info!(
        native_language = %request.native_language,
        target_language = %request.target_language,
        difficulty = %request.difficulty,
        chars = request.message.chars().count(),
        "Received chat request"
    );

    let message = state
        .completions
        .tutor_reply(&request)
        .await
        .inspect_err(|e| error!("Upstream completion failed: {e}"))?;

    Ok(Json(ChatReply { message }))
}

async fn not_found(uri: Uri) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Not Found: {uri}"))
}
