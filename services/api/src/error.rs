use crate::completions::CompletionError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tutor_core::ValidationError;
use tutor_core::wire::ErrorBody;

/// Everything `POST /api/chat` can fail with. Always rendered as `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Upstream(#[from] CompletionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
