pub mod messages;

use crate::db::StoreError;
use crate::services::LoggerService;
use axum::{
    extract::rejection::QueryRejection,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The request could not be completed".to_string(),
            ),
        };
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            timestamp: Local::now().naive_local(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!("API: Storage error: {}", e);
        ApiError::Internal
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Read-only HTTP surface over the message log.
pub fn router(logger: LoggerService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route(
            "/api/messages/channel/{channel_id}",
            get(messages::by_channel),
        )
        .route("/api/messages/author/{author_id}", get(messages::by_author))
        .route("/api/messages/search", get(messages::search))
        .route("/api/messages/recent", get(messages::recent))
        .route(
            "/api/messages/stats/channel/{channel_id}",
            get(messages::channel_stats),
        )
        .route("/api/messages/health", get(messages::health))
        .route("/api/messages/{message_id}", get(messages::by_id))
        .layer(cors)
        .with_state(logger)
}
