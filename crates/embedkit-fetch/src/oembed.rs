//! oEmbed response shape and discovery-link parsing.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A decoded oEmbed response.
///
/// Providers disagree on number encoding (`640`, `"640"`, `640.0`), so
/// dimensions are read leniently and anything unreadable becomes `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OembedResponse {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub cache_age: Option<u32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub thumbnail_width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub thumbnail_height: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }))
}

/// Extracts JSON oEmbed endpoints from an HTTP `Link` header.
///
/// Entries must be `rel="alternate"` (or carry no `rel`) and may not
/// advertise an XML type. Order is preserved.
#[must_use]
pub fn parse_link_header(header: &str) -> Vec<String> {
    let mut links = Vec::new();

    'links: for link in header.split(',') {
        let mut parts = link.split(';').map(str::trim);

        let url = match parts.next() {
            Some(url) if url.starts_with("<http") && url.ends_with('>') => &url[1..url.len() - 1],
            _ => continue,
        };

        let mut is_oembed = false;
        for part in parts {
            let Some((left, right)) = part.split_once('=') else {
                continue 'links;
            };
            let right = right.trim().trim_matches('"');
            match left.trim() {
                "type" if right.contains("xml") => continue 'links,
                "type" => is_oembed = right.contains("json+oembed"),
                "rel" if right != "alternate" => continue 'links,
                _ => {}
            }
        }

        if is_oembed {
            links.push(url.to_string());
        }
    }

    links
}

/// Appends extra query parameters to an oEmbed endpoint, keeping any it
/// already carries.
#[must_use]
pub fn with_parameters(endpoint: &str, parameters: &[(String, String)]) -> String {
    let Ok(mut url) = reqwest::Url::parse(endpoint) else {
        return endpoint.to_string();
    };
    if !parameters.is_empty() {
        let mut query = url.query_pairs_mut();
        for (param, value) in parameters {
            query.append_pair(param, value);
        }
    }
    url.to_string()
}
