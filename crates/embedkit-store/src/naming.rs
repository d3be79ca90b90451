//! File and display names for stored assets.

use embedkit_core::EmbeddedAsset;

const FALLBACK_FILE_NAME: &str = "embedded-asset";

/// Title for display: the asset title, or its URL when untitled.
fn raw_title(asset: &EmbeddedAsset) -> &str {
    asset.title().unwrap_or_else(|| asset.url())
}

/// Display title truncated to at most `max_len` characters.
#[must_use]
pub fn asset_title(asset: &EmbeddedAsset, max_len: usize) -> String {
    truncate_chars(raw_title(asset), max_len).to_string()
}

/// File name for an asset: its title (or URL) made filesystem-safe, with
/// dots removed, truncated to `max_len` characters and suffixed `.json`.
#[must_use]
pub fn asset_file_name(asset: &EmbeddedAsset, max_len: usize) -> String {
    let name = sanitize_name(raw_title(asset)).replace('.', "");
    let name = if name.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        name
    };
    format!("{}.json", truncate_chars(&name, max_len))
}

/// The `n`-th alternative for a taken file name: `name_n.json`.
pub(crate) fn numbered(file_name: &str, n: u32) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{n}.{ext}"),
        None => format!("{file_name}_{n}"),
    }
}

/// Keeps letters, digits, `-` and `_`; whitespace runs become a single `-`;
/// everything else is dropped.
fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == '.' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            pending_dash = true;
        }
    }
    out
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
