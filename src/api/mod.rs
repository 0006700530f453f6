mod error;
pub mod recovery;

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;

use crate::auth::Auth;

pub use error::{ApiError, Code, ErrorDetail, ErrorResponse};

/// Create the API router. Session authentication is layered on by the caller.
pub fn create_api_router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/me", get(me))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Credentials attached to the current request.
async fn me(Auth(credentials): Auth) -> impl IntoResponse {
    Json(credentials)
}
