//! The persisted JSON form of an [`EmbeddedAsset`].

use embedkit_core::{build_from_document, EmbeddedAsset};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::StoreError;

/// Encodes an asset as pretty-printed JSON with four-space indentation.
/// Slashes and non-ASCII characters are written as-is.
///
/// # Errors
///
/// Returns [`StoreError::Encode`] if serialization fails.
pub fn to_document(asset: &EmbeddedAsset) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    asset.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Decodes a document back into an asset.
///
/// Returns `None` for anything that is not an embedded asset: text that is
/// not JSON, JSON that is not an object, or an object the builder rejects
/// (including documents written by a newer schema with extra keys).
#[must_use]
pub fn from_document(text: &str) -> Option<EmbeddedAsset> {
    let map = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::debug!("document is JSON but not an object");
            return None;
        }
        Err(e) => {
            tracing::debug!(error = %e, "document is not JSON");
            return None;
        }
    };

    match build_from_document(map) {
        Ok(asset) => Some(asset),
        Err(e) => {
            tracing::debug!(error = %e, "document is not an embedded asset");
            None
        }
    }
}
