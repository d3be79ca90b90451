//! Conversion of documents written by the older flat schema.
//!
//! Legacy documents carry a `__embeddedasset__` marker key and describe a
//! single thumbnail (`thumbnailUrl`, `thumbnailWidth`, `thumbnailHeight`)
//! plus `html`/`safeHtml` markup. Conversion never fails: anything missing or
//! malformed falls back to a default and the builder fills in the rest.

use serde_json::{json, Map, Value};

use crate::asset::{aspect_ratio, Markup};
use crate::builder::{AssetFields, FieldValue};

/// Marker key identifying a legacy document.
pub const LEGACY_MARKER: &str = "__embeddedasset__";

#[must_use]
pub fn is_legacy(map: &Map<String, Value>) -> bool {
    map.contains_key(LEGACY_MARKER)
}

/// Maps a legacy document onto the current field names.
#[must_use]
pub fn convert_legacy(legacy: &Map<String, Value>) -> AssetFields {
    let width = int_value(legacy.get("width"));
    let height = int_value(legacy.get("height"));
    let image_url = string_value(legacy.get("thumbnailUrl"));
    let image_width = int_value(legacy.get("thumbnailWidth"));
    let image_height = int_value(legacy.get("thumbnailHeight"));

    let images = match &image_url {
        Some(url) => json!([{
            "url": url,
            "width": image_width,
            "height": image_height,
            "size": u64::from(image_width) * u64::from(image_height),
            "mime": null,
        }]),
        None => json!([]),
    };

    // `html` wins over `safeHtml` whenever the key is present, even if empty.
    let code = legacy
        .get("html")
        .filter(|v| !v.is_null())
        .or_else(|| legacy.get("safeHtml").filter(|v| !v.is_null()))
        .and_then(Value::as_str)
        .and_then(Markup::new);

    let mut fields = AssetFields::new();
    let mut put = |key: &str, value: Value| {
        fields.insert(key.to_string(), FieldValue::Json(value));
    };

    put("title", passthrough(legacy, "title"));
    put("description", passthrough(legacy, "description"));
    put("url", passthrough(legacy, "url"));
    put("type", passthrough(legacy, "type"));
    put("images", images);
    put("image", image_url.map_or(Value::Null, Value::String));
    put("imageWidth", json!(image_width));
    put("imageHeight", json!(image_height));
    put("width", json!(width));
    put("height", json!(height));
    put("aspectRatio", json!(aspect_ratio(width, height)));
    put("authorName", passthrough(legacy, "authorName"));
    put("authorUrl", passthrough(legacy, "authorUrl"));
    put("providerName", passthrough(legacy, "providerName"));
    put("providerUrl", passthrough(legacy, "providerUrl"));

    if let Some(code) = code {
        fields.insert("code".to_string(), FieldValue::Markup(code));
    }

    fields
}

fn passthrough(legacy: &Map<String, Value>, key: &str) -> Value {
    legacy.get(key).cloned().unwrap_or(Value::Null)
}

fn string_value(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lenient integer cast: numbers truncate, numeric strings parse, everything
/// else (including negatives) is 0.
fn int_value(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(true)) => Some(1.0),
        _ => None,
    };
    match parsed {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(f) if f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX) => f.trunc() as u32,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_asset;

    fn legacy(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn detects_marker_key() {
        assert!(is_legacy(&legacy(json!({"__embeddedasset__": true}))));
        assert!(!is_legacy(&legacy(json!({"url": "https://x.test"}))));
    }

    #[test]
    fn thumbnail_becomes_single_image_with_area_size() {
        let map = legacy(json!({
            "url": "http://x/page",
            "thumbnailUrl": "http://x/y.png",
            "thumbnailWidth": 10,
            "thumbnailHeight": 20,
            "html": "<b>hi</b>",
        }));
        let asset = build_asset(convert_legacy(&map)).expect("legacy converts");

        assert_eq!(asset.images().len(), 1);
        let image = &asset.images()[0];
        assert_eq!(image.url, "http://x/y.png");
        assert_eq!(image.size, 200);
        assert!(image.mime.is_none());
        assert_eq!(asset.code().map(Markup::as_str), Some("<b>hi</b>"));
        assert!(asset.aspect_ratio().abs() < f64::EPSILON);
        assert_eq!(asset.image(), Some("http://x/y.png"));
        assert_eq!(asset.image_width(), 10);
        assert_eq!(asset.image_height(), 20);
    }

    #[test]
    fn falls_back_to_safe_html() {
        let map = legacy(json!({"url": "http://x", "safeHtml": "<i>ok</i>"}));
        let fields = convert_legacy(&map);
        assert_eq!(
            fields.get("code"),
            Some(&FieldValue::Markup(Markup::new("<i>ok</i>").unwrap()))
        );
    }

    #[test]
    fn empty_markup_is_absent() {
        let map = legacy(json!({"url": "http://x", "html": ""}));
        let fields = convert_legacy(&map);
        assert!(!fields.contains_key("code"));
    }

    #[test]
    fn computes_aspect_ratio_from_string_dimensions() {
        let map = legacy(json!({"url": "http://x", "width": "640", "height": "360"}));
        let asset = build_asset(convert_legacy(&map)).expect("converts");
        assert_eq!(asset.width(), 640);
        assert!((asset.aspect_ratio() - 56.25).abs() < 1e-9);
    }

    #[test]
    fn missing_thumbnail_yields_no_images() {
        let map = legacy(json!({"url": "http://x", "thumbnailWidth": 50}));
        let asset = build_asset(convert_legacy(&map)).expect("converts");
        assert!(asset.images().is_empty());
        assert!(asset.image().is_none());
    }

    #[test]
    fn garbage_integers_default_to_zero() {
        assert_eq!(int_value(Some(&json!("abc"))), 0);
        assert_eq!(int_value(Some(&json!(-5))), 0);
        assert_eq!(int_value(Some(&json!(12.9))), 12);
        assert_eq!(int_value(None), 0);
    }
}
