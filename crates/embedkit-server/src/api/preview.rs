//! Standalone HTML preview of an embed.
//!
//! Provider markup is only written into the page when the safety validator
//! accepts the asset. Anything else is shown as an escaped link card.

use std::fmt::Write as _;
use std::sync::LazyLock;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Extension,
};
use embedkit_core::{display_image_to_size, EmbeddedAsset};
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_fetch_error, required_param, ApiError, AppState, DEFAULT_IMAGE_SIZE};

static CALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
        .expect("valid callback regex")
});

#[derive(Debug, Deserialize)]
pub(super) struct PreviewQuery {
    pub url: Option<String>,
    pub callback: Option<String>,
}

pub(super) async fn preview_embed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let url = required_param(&req_id.0, "url", query.url.as_deref())?;
    let callback = query
        .callback
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if let Some(callback) = callback {
        if !CALLBACK_RE.is_match(callback) {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "callback must be a JavaScript identifier path",
            ));
        }
    }

    let asset = state
        .cache
        .get_or_fetch(&url)
        .await
        .map_err(|e| map_fetch_error(req_id.0.clone(), &e))?;

    let safe = state.validator.is_embed_safe(&asset);
    if !safe && asset.code().is_some() {
        tracing::info!(url = asset.url(), "embed markup withheld from preview");
    }

    let html = render_preview(&asset, safe, callback);
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html))
}

fn render_preview(asset: &EmbeddedAsset, safe: bool, callback: Option<&str>) -> String {
    let title = encode_text(asset.title().unwrap_or_else(|| asset.url()));

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str("</head>\n<body>\n<div class=\"embedded-asset\">\n");

    match asset.code() {
        Some(code) if safe => {
            html.push_str(code.as_str());
            html.push('\n');
        }
        _ => {
            let href = encode_double_quoted_attribute(asset.url());
            let _ = writeln!(html, "<a class=\"embedded-asset-link\" href=\"{href}\">");
            if let Some(image) = display_image_to_size(asset, DEFAULT_IMAGE_SIZE) {
                let _ = writeln!(
                    html,
                    "<img src=\"{}\" alt=\"\">",
                    encode_double_quoted_attribute(&image.url)
                );
            }
            let _ = writeln!(html, "<span>{title}</span>\n</a>");
        }
    }

    html.push_str("</div>\n");
    if let Some(callback) = callback {
        let _ = writeln!(
            html,
            "<script>window.addEventListener(\"load\", function () {{ {callback}(document.body.scrollHeight); }});</script>"
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}
