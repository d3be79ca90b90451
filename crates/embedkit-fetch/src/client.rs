use std::time::Duration;

use async_trait::async_trait;
use html_escape::encode_double_quoted_attribute;
use embedkit_core::{aspect_ratio, AppConfig, Image, Settings};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LINK, RETRY_AFTER};
use reqwest::{Client, Url};

use crate::error::FetchError;
use crate::oembed::{parse_link_header, with_parameters, OembedResponse};
use crate::page::{parse_page, PageMetadata};
use crate::provider::ProviderData;
use crate::rate_limit::retry_with_backoff;

pub const IFRAMELY_ENDPOINT: &str = "https://iframe.ly/api/oembed";
pub const EMBEDLY_ENDPOINT: &str = "https://api.embedly.com/1/oembed";

/// Source of raw provider data for a URL.
#[async_trait]
pub trait EmbedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ProviderData, FetchError>;
}

/// Settings for [`OembedClient`].
#[derive(Clone)]
pub struct FetchOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for 429s and network errors.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
    /// Extra query parameters appended to every oEmbed request.
    pub parameters: Vec<(String, String)>,
    pub iframely_key: Option<String>,
    pub embedly_key: Option<String>,
    pub iframely_endpoint: String,
    pub embedly_endpoint: String,
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[redacted]");
        f.debug_struct("FetchOptions")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("parameters", &self.parameters)
            .field("iframely_key", &redact(&self.iframely_key))
            .field("embedly_key", &redact(&self.embedly_key))
            .field("iframely_endpoint", &self.iframely_endpoint)
            .field("embedly_endpoint", &self.embedly_endpoint)
            .finish()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "embedkit/0.1 (+embed-metadata)".to_string(),
            max_retries: 2,
            backoff_base_secs: 1,
            parameters: Vec::new(),
            iframely_key: None,
            embedly_key: None,
            iframely_endpoint: IFRAMELY_ENDPOINT.to_string(),
            embedly_endpoint: EMBEDLY_ENDPOINT.to_string(),
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, settings: &Settings) -> Self {
        Self {
            timeout_secs: config.fetch_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.fetch_max_retries,
            backoff_base_secs: config.fetch_retry_backoff_base_secs,
            parameters: settings
                .parameters
                .iter()
                .map(|p| (p.param.clone(), p.value.clone()))
                .collect(),
            iframely_key: config.provider_keys.iframely.clone(),
            embedly_key: config.provider_keys.embedly.clone(),
            ..Self::default()
        }
    }
}

/// A fetched response body with the headers the client cares about.
struct Fetched {
    final_url: String,
    headers: HeaderMap,
    body: String,
}

/// HTTP fetcher combining page metadata with oEmbed.
///
/// The page itself is always fetched. oEmbed data comes from a discovery link
/// when the page advertises one, and otherwise from Iframely or Embedly when
/// a key is configured. oEmbed failures are logged and the page metadata is
/// used alone; page failures are returned.
pub struct OembedClient {
    client: Client,
    options: FetchOptions,
}

impl OembedClient {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&options.user_agent)
            .build()?;
        Ok(Self { client, options })
    }

    async fn get(&self, url: &str) -> Result<Fetched, FetchError> {
        retry_with_backoff(self.options.max_retries, self.options.backoff_base_secs, || {
            let url = url.to_owned();
            async move {
                let response = self.client.get(&url).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(FetchError::RateLimited {
                        domain: extract_domain(&url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(FetchError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(FetchError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let final_url = response.url().to_string();
                let headers = response.headers().clone();
                let body = if is_image(&headers) {
                    String::new()
                } else {
                    response.text().await?
                };

                Ok(Fetched {
                    final_url,
                    headers,
                    body,
                })
            }
        })
        .await
    }

    async fn get_oembed(&self, endpoint: &str) -> Result<OembedResponse, FetchError> {
        let fetched = self.get(endpoint).await?;
        serde_json::from_str(&fetched.body).map_err(|e| FetchError::Deserialize {
            context: format!("oEmbed response from {}", extract_domain(endpoint)),
            source: e,
        })
    }

    /// Endpoint of the intermediary service to ask when the page advertises
    /// no oEmbed link. Iframely is preferred over Embedly.
    fn intermediary_endpoint(&self, url: &str) -> Option<String> {
        let (base, key_param, key) = if let Some(key) = &self.options.iframely_key {
            (&self.options.iframely_endpoint, "api_key", key)
        } else if let Some(key) = &self.options.embedly_key {
            (&self.options.embedly_endpoint, "key", key)
        } else {
            return None;
        };
        let mut endpoint = Url::parse(base).ok()?;
        endpoint
            .query_pairs_mut()
            .append_pair("url", url)
            .append_pair(key_param, key);
        Some(endpoint.to_string())
    }
}

#[async_trait]
impl EmbedFetcher for OembedClient {
    async fn fetch(&self, url: &str) -> Result<ProviderData, FetchError> {
        let url = validate_url(url)?;
        let fetched = self.get(url.as_str()).await?;

        if is_image(&fetched.headers) {
            tracing::debug!(url = %url, "direct image response");
            let mime = content_type(&fetched.headers);
            return Ok(photo_data(&fetched.final_url, mime));
        }

        let page = parse_page(&fetched.final_url, &fetched.body);
        let discovered = fetched
            .headers
            .get_all(LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_link_header)
            .chain(page.oembed_links.iter().cloned())
            .next();

        let endpoint = match discovered {
            Some(link) => Some(with_parameters(&link, &self.options.parameters)),
            None => self
                .intermediary_endpoint(url.as_str())
                .map(|e| with_parameters(&e, &self.options.parameters)),
        };

        let oembed = match endpoint {
            Some(endpoint) => match self.get_oembed(&endpoint).await {
                Ok(oembed) => Some(oembed),
                Err(err) => {
                    tracing::warn!(
                        url = %url,
                        error = %err,
                        "oEmbed lookup failed, using page metadata only"
                    );
                    None
                }
            },
            None => None,
        };

        tracing::debug!(
            url = %url,
            oembed = oembed.is_some(),
            images = page.images.len(),
            icons = page.icons.len(),
            "provider data collected"
        );

        Ok(merge(&fetched.final_url, page, oembed))
    }
}

fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| FetchError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
}

fn is_image(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|ct| ct.starts_with("image/"))
}

fn photo_data(url: &str, mime: Option<String>) -> ProviderData {
    ProviderData {
        url: url.to_string(),
        kind: Some("photo".to_string()),
        image: Some(url.to_string()),
        images: vec![Image {
            url: url.to_string(),
            width: 0,
            height: 0,
            size: 0,
            mime,
        }],
        code: Some(format!(
            "<img src=\"{}\" alt=\"\">",
            encode_double_quoted_attribute(url)
        )),
        provider_url: origin(url),
        ..ProviderData::default()
    }
}

/// Combines page metadata and an optional oEmbed response. oEmbed values
/// win wherever both sources have one.
fn merge(page_url: &str, page: PageMetadata, oembed: Option<OembedResponse>) -> ProviderData {
    let oembed = oembed.unwrap_or_default();
    let url = page
        .canonical_url
        .filter(|canonical| same_host(canonical, page_url))
        .unwrap_or_else(|| page_url.to_string());
    let kind = oembed.kind.or(page.kind).unwrap_or_else(|| "link".to_string());
    let width = oembed.width.unwrap_or(0);
    let height = oembed.height.unwrap_or(0);
    let title = oembed.title.or(page.title);

    let code = match (oembed.html, kind.as_str(), oembed.url.as_deref()) {
        (Some(html), _, _) if !html.trim().is_empty() => Some(html),
        (_, "photo", Some(src)) => Some(photo_code(src, width, height, title.as_deref())),
        _ => None,
    };

    let mut images = Vec::new();
    if let Some(thumbnail) = oembed.thumbnail_url {
        let (w, h) = (
            oembed.thumbnail_width.unwrap_or(0),
            oembed.thumbnail_height.unwrap_or(0),
        );
        images.push(Image {
            url: thumbnail,
            width: w,
            height: h,
            size: u64::from(w) * u64::from(h),
            mime: None,
        });
    }
    for image in page.images {
        if !images.iter().any(|i| i.url == image.url) {
            images.push(image);
        }
    }

    let mut provider_icons = page.icons;
    if provider_icons.is_empty() {
        if let Some(origin) = origin(&url) {
            provider_icons.push(Image {
                url: format!("{origin}/favicon.ico"),
                width: 0,
                height: 0,
                size: 0,
                mime: None,
            });
        }
    }

    let primary = images.iter().max_by_key(|i| i.size);
    let provider_icon = provider_icons
        .iter()
        .max_by_key(|i| i.size)
        .map(|i| i.url.clone());

    ProviderData {
        title,
        description: oembed.description.or(page.description),
        kind: Some(kind),
        tags: page.tags,
        image: primary.map(|i| i.url.clone()),
        image_width: primary.map_or(0, |i| i.width),
        image_height: primary.map_or(0, |i| i.height),
        code,
        width,
        height,
        aspect_ratio: aspect_ratio(width, height),
        author_name: oembed.author_name.or(page.author_name),
        author_url: oembed.author_url.or(page.author_url),
        provider_name: oembed
            .provider_name
            .or(page.site_name)
            .or_else(|| Url::parse(&url).ok()?.host_str().map(ToString::to_string)),
        provider_url: oembed.provider_url.or_else(|| origin(&url)),
        provider_icon,
        provider_icons,
        published_time: page.published_time,
        license: page.license,
        feeds: page.feeds,
        images,
        url,
    }
}

fn photo_code(src: &str, width: u32, height: u32, alt: Option<&str>) -> String {
    let mut code = format!("<img src=\"{}\"", encode_double_quoted_attribute(src));
    if width > 0 {
        code.push_str(&format!(" width=\"{width}\""));
    }
    if height > 0 {
        code.push_str(&format!(" height=\"{height}\""));
    }
    code.push_str(&format!(
        " alt=\"{}\">",
        encode_double_quoted_attribute(alt.unwrap_or_default())
    ));
    code
}

/// Whether two URLs name the same host. A page may only declare a canonical
/// URL on its own host.
fn same_host(a: &str, b: &str) -> bool {
    let host = |url: &str| {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    };
    matches!((host(a), host(b)), (Some(a), Some(b)) if a == b)
}

/// `scheme://host[:port]` for a URL, or `None` if it does not parse.
fn origin(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .filter(|o| o != "null")
}

fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
        .unwrap_or_else(|| url.to_owned())
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
