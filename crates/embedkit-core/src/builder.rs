//! Closed-schema construction of [`EmbeddedAsset`] from untyped fields.
//!
//! Input comes from three places: provider conversion, the legacy adapter,
//! and rehydration of a persisted document. All three go through
//! [`build_asset`], so an unknown key (for instance from a document written by
//! a newer schema) rejects the whole input instead of being dropped.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::asset::{EmbeddedAsset, Image, Markup, ASSET_FIELDS};
use crate::error::BuildError;
use crate::legacy::{convert_legacy, is_legacy};

/// A single untyped input value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    /// Markup already marked as trusted by its producer.
    Markup(Markup),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<Markup> for FieldValue {
    fn from(markup: Markup) -> Self {
        FieldValue::Markup(markup)
    }
}

pub type AssetFields = BTreeMap<String, FieldValue>;

/// Wraps every value of a decoded JSON object as [`FieldValue::Json`].
#[must_use]
pub fn fields_from_json(map: Map<String, Value>) -> AssetFields {
    map.into_iter()
        .map(|(key, value)| (key, FieldValue::Json(value)))
        .collect()
}

/// Builds a validated asset, or rejects the input as a whole.
///
/// # Errors
///
/// - [`BuildError::UnknownField`] if any key is outside the asset schema.
/// - [`BuildError::InvalidField`] if a value has the wrong type or shape.
/// - [`BuildError::Validation`] if the assembled asset fails validation.
pub fn build_asset(fields: AssetFields) -> Result<EmbeddedAsset, BuildError> {
    let mut asset = EmbeddedAsset::empty();

    for (key, value) in fields {
        if !ASSET_FIELDS.contains(&key.as_str()) {
            return Err(BuildError::UnknownField(key));
        }

        let value = match value {
            FieldValue::Markup(markup) => {
                if key != "code" {
                    return Err(BuildError::InvalidField {
                        field: key,
                        reason: "markup is only accepted for code".to_string(),
                    });
                }
                asset.code = Some(markup);
                continue;
            }
            FieldValue::Json(value) => value,
        };

        match key.as_str() {
            "title" => asset.title = opt_string(&key, value)?,
            "description" => asset.description = opt_string(&key, value)?,
            "url" => asset.url = opt_string(&key, value)?.unwrap_or_default(),
            "type" => asset.kind = opt_string(&key, value)?,
            "tags" => asset.tags = string_list(&key, value)?,
            "images" => asset.images = image_list(&key, value)?,
            "image" => asset.image = opt_string(&key, value)?,
            "imageWidth" => asset.image_width = dimension(&key, &value)?,
            "imageHeight" => asset.image_height = dimension(&key, &value)?,
            // Plain strings are coerced to markup; any other type is absent.
            "code" => {
                asset.code = match value {
                    Value::String(raw) => Markup::new(raw),
                    _ => None,
                }
            }
            "width" => asset.width = dimension(&key, &value)?,
            "height" => asset.height = dimension(&key, &value)?,
            "aspectRatio" => asset.aspect_ratio = ratio(&key, &value)?,
            "authorName" => asset.author_name = opt_string(&key, value)?,
            "authorUrl" => asset.author_url = opt_string(&key, value)?,
            "providerName" => asset.provider_name = opt_string(&key, value)?,
            "providerUrl" => asset.provider_url = opt_string(&key, value)?,
            "providerIcon" => asset.provider_icon = opt_string(&key, value)?,
            "providerIcons" => asset.provider_icons = image_list(&key, value)?,
            "publishedTime" => asset.published_time = opt_string(&key, value)?,
            "license" => asset.license = opt_string(&key, value)?,
            "feeds" => asset.feeds = string_list(&key, value)?,
            _ => return Err(BuildError::UnknownField(key)),
        }
    }

    asset.validate().map_err(BuildError::Validation)?;
    Ok(asset)
}

/// Rehydrates an asset from a decoded document, converting legacy documents
/// first.
///
/// # Errors
///
/// Same as [`build_asset`].
pub fn build_from_document(map: Map<String, Value>) -> Result<EmbeddedAsset, BuildError> {
    let fields = if is_legacy(&map) {
        tracing::debug!("converting legacy embedded asset document");
        convert_legacy(&map)
    } else {
        fields_from_json(map)
    };
    build_asset(fields)
}

fn invalid(field: &str, reason: impl Into<String>) -> BuildError {
    BuildError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn opt_string(field: &str, value: Value) -> Result<Option<String>, BuildError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(invalid(field, format!("expected string, got {other}"))),
    }
}

fn string_list(field: &str, value: Value) -> Result<Vec<String>, BuildError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(invalid(field, format!("expected string entry, got {other}"))),
            })
            .collect(),
        other => Err(invalid(field, format!("expected list, got {other}"))),
    }
}

fn non_negative(field: &str, value: &Value) -> Result<u64, BuildError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            match n.as_f64() {
                // Integral-valued floats (e.g. `640.0`) are common in provider output.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                Some(f) if f.is_finite() && f >= 0.0 => Ok(f.trunc() as u64),
                _ => Err(invalid(field, format!("expected non-negative number, got {n}"))),
            }
        }
        other => Err(invalid(field, format!("expected number, got {other}"))),
    }
}

fn dimension(field: &str, value: &Value) -> Result<u32, BuildError> {
    let raw = non_negative(field, value)?;
    u32::try_from(raw).map_err(|_| invalid(field, format!("{raw} is out of range")))
}

fn ratio(field: &str, value: &Value) -> Result<f64, BuildError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(field, format!("expected number, got {n}"))),
        other => Err(invalid(field, format!("expected number, got {other}"))),
    }
}

/// Accepts a list, or an object keyed by position (what a filtered list with
/// gaps looks like after a round trip through some JSON encoders).
fn image_list(field: &str, value: Value) -> Result<Vec<Image>, BuildError> {
    let entries: Vec<Value> = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => return Err(invalid(field, format!("expected list, got {other}"))),
    };

    entries
        .into_iter()
        .map(|entry| parse_image(field, entry))
        .collect()
}

fn parse_image(field: &str, entry: Value) -> Result<Image, BuildError> {
    let Value::Object(mut map) = entry else {
        return Err(invalid(field, "expected image object"));
    };

    let url = match map.remove("url") {
        Some(Value::String(url)) => url,
        _ => return Err(invalid(field, "image entry needs a string url")),
    };
    let width = dimension(field, map.get("width").unwrap_or(&Value::Null))?;
    let height = dimension(field, map.get("height").unwrap_or(&Value::Null))?;
    let size = non_negative(field, map.get("size").unwrap_or(&Value::Null))?;
    let mime = match map.remove("mime") {
        None | Some(Value::Null) => None,
        Some(Value::String(mime)) if mime.is_empty() => None,
        Some(Value::String(mime)) => Some(mime),
        Some(other) => return Err(invalid(field, format!("expected string mime, got {other}"))),
    };

    Ok(Image {
        url,
        width,
        height,
        size,
        mime,
    })
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
