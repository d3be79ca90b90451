mod embeds;
mod preview;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use embedkit_fetch::{CacheFront, FetchError};
use embedkit_safety::SafetyValidator;
use embedkit_store::{AssetStore, StoreError};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, RequestId};

/// Default edge length, in pixels, used to pick display images.
pub(crate) const DEFAULT_IMAGE_SIZE: u32 = 300;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheFront>,
    pub validator: Arc<SafetyValidator>,
    pub store: Arc<AssetStore>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "unprocessable" => StatusCode::UNPROCESSABLE_ENTITY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Reads a required, non-blank query parameter.
pub(super) fn required_param(
    request_id: &str,
    name: &str,
    value: Option<&str>,
) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ApiError::new(request_id, "validation_error", format!("{name} is required")))
}

pub(super) fn map_fetch_error(request_id: String, error: &FetchError) -> ApiError {
    match error {
        FetchError::InvalidUrl { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        FetchError::NotFound { .. } => ApiError::new(request_id, "not_found", error.to_string()),
        FetchError::RateLimited { .. } => {
            tracing::warn!(error = %error, "upstream rate limit reached");
            ApiError::new(request_id, "rate_limited", error.to_string())
        }
        FetchError::InvalidAsset { .. } => {
            ApiError::new(request_id, "unprocessable", error.to_string())
        }
        FetchError::Http(_) | FetchError::UnexpectedStatus { .. } | FetchError::Deserialize { .. } => {
            tracing::warn!(error = %error, "embed fetch failed");
            ApiError::new(request_id, "upstream_error", "failed to fetch embed data")
        }
    }
}

pub(super) fn map_store_error(request_id: String, error: &StoreError) -> ApiError {
    match error {
        StoreError::InvalidFolder { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        _ => {
            tracing::error!(error = %error, "asset store failed");
            ApiError::new(request_id, "internal_error", "failed to save embedded asset")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/embeds",
            get(embeds::lookup_embed).post(embeds::save_embed),
        )
        .route("/api/v1/embeds/preview", get(preview::preview_embed))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData { status: "ok" },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
