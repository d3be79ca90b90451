use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use embedkit_core::{display_image_to_size, provider_icon_to_size, EmbeddedAsset, Image};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_fetch_error, map_store_error, required_param, ApiError, ApiResponse, AppState,
    ResponseMeta, DEFAULT_IMAGE_SIZE,
};

#[derive(Debug, Deserialize)]
pub(super) struct LookupQuery {
    pub url: Option<String>,
    pub size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct LookupData {
    asset: EmbeddedAsset,
    safe: bool,
    violations: Vec<String>,
    display_image: Option<Image>,
    provider_icon: Option<Image>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SaveRequest {
    pub url: Option<String>,
    #[serde(default)]
    pub folder: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SavedData {
    folder: String,
    file_name: String,
    title: String,
    url: String,
    safe: bool,
}

pub(super) async fn lookup_embed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ApiResponse<LookupData>>, ApiError> {
    let url = required_param(&req_id.0, "url", query.url.as_deref())?;
    let size = query.size.unwrap_or(DEFAULT_IMAGE_SIZE);

    let asset = state
        .cache
        .get_or_fetch(&url)
        .await
        .map_err(|e| map_fetch_error(req_id.0.clone(), &e))?;

    let report = state.validator.inspect(&asset);
    let data = LookupData {
        safe: report.is_safe(),
        violations: report.violations().iter().map(ToString::to_string).collect(),
        display_image: display_image_to_size(&asset, size).cloned(),
        provider_icon: provider_icon_to_size(&asset, size).cloned(),
        asset: EmbeddedAsset::clone(&asset),
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn save_embed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SaveRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SavedData>>), ApiError> {
    let url = required_param(&req_id.0, "url", body.url.as_deref())?;

    let asset = state
        .cache
        .get_or_fetch(&url)
        .await
        .map_err(|e| map_fetch_error(req_id.0.clone(), &e))?;

    let saved = state
        .store
        .save(&asset, &body.folder)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let data = SavedData {
        folder: saved.folder,
        file_name: saved.file_name,
        title: saved.title,
        url: asset.url().to_string(),
        safe: state.validator.is_embed_safe(&asset),
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
