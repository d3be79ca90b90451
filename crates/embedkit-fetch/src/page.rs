//! Metadata extraction from an HTML page.

use std::sync::LazyLock;

use embedkit_core::Image;
use regex::Regex;
use scraper::{Html, Selector};

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid meta selector"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[href]").expect("valid link selector"));
static SIZES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*x\s*(\d+)").expect("valid sizes regex"));

/// Everything a page says about itself through `<head>` markup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: Option<String>,
    pub kind: Option<String>,
    pub site_name: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub published_time: Option<String>,
    pub license: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<Image>,
    pub icons: Vec<Image>,
    pub feeds: Vec<String>,
    pub oembed_links: Vec<String>,
}

/// Parses `html` fetched from `base_url`. Relative links are resolved
/// against `base_url`; links that cannot be resolved are dropped.
#[must_use]
pub fn parse_page(base_url: &str, html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let mut page = PageMetadata {
        title: document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty()),
        ..PageMetadata::default()
    };

    let mut og_title = None;
    let mut og_description = None;
    let mut pending_image: Option<Image> = None;

    for meta in document.select(&META_SELECTOR) {
        let element = meta.value();
        let Some(key) = element.attr("property").or_else(|| element.attr("name")) else {
            continue;
        };
        let Some(content) = element.attr("content").map(str::trim).filter(|c| !c.is_empty())
        else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();

        match key.as_str() {
            "og:title" | "twitter:title" => {
                og_title.get_or_insert_with(|| content.to_string());
            }
            "og:description" | "twitter:description" => {
                og_description.get_or_insert_with(|| content.to_string());
            }
            "description" => {
                page.description.get_or_insert_with(|| content.to_string());
            }
            "og:url" => page.canonical_url = absolutize_url(base_url, content),
            "og:type" => page.kind = Some(content.to_string()),
            "og:site_name" => page.site_name = Some(content.to_string()),
            "author" => {
                page.author_name.get_or_insert_with(|| content.to_string());
            }
            "article:author" => {
                if content.starts_with("http") {
                    page.author_url = absolutize_url(base_url, content);
                } else {
                    page.author_name = Some(content.to_string());
                }
            }
            "article:published_time" | "og:published_time" => {
                page.published_time = Some(content.to_string());
            }
            "article:tag" => push_unique(&mut page.tags, content),
            "keywords" => {
                for keyword in content.split(',') {
                    push_unique(&mut page.tags, keyword.trim());
                }
            }
            "og:image" | "og:image:url" | "og:image:secure_url" | "twitter:image"
            | "twitter:image:src" => {
                let Some(url) = absolutize_url(base_url, content) else {
                    continue;
                };
                if page.images.iter().any(|i| i.url == url)
                    || pending_image.as_ref().is_some_and(|i| i.url == url)
                {
                    continue;
                }
                if let Some(done) = pending_image.replace(new_image(url)) {
                    page.images.push(done);
                }
            }
            "og:image:width" => {
                if let (Some(image), Ok(width)) = (pending_image.as_mut(), content.parse()) {
                    image.width = width;
                }
            }
            "og:image:height" => {
                if let (Some(image), Ok(height)) = (pending_image.as_mut(), content.parse()) {
                    image.height = height;
                }
            }
            "og:image:type" => {
                if let Some(image) = pending_image.as_mut() {
                    image.mime = Some(content.to_string());
                }
            }
            _ => {}
        }
    }
    page.images.extend(pending_image);
    for image in &mut page.images {
        image.size = u64::from(image.width) * u64::from(image.height);
    }

    if og_title.is_some() {
        page.title = og_title;
    }
    if og_description.is_some() {
        page.description = og_description;
    }

    for link in document.select(&LINK_SELECTOR) {
        let element = link.value();
        let Some(href) = element.attr("href").and_then(|h| absolutize_url(base_url, h)) else {
            continue;
        };
        let rel = element.attr("rel").unwrap_or_default().to_ascii_lowercase();
        let kind = element.attr("type").unwrap_or_default().to_ascii_lowercase();
        let rels: Vec<&str> = rel.split_whitespace().collect();

        if kind == "application/json+oembed" {
            page.oembed_links.push(href);
        } else if rels.contains(&"alternate")
            && (kind == "application/rss+xml" || kind == "application/atom+xml")
        {
            page.feeds.push(href);
        } else if rels.contains(&"license") {
            page.license.get_or_insert(href);
        } else if rels.contains(&"canonical") {
            page.canonical_url.get_or_insert(href);
        } else if rels.iter().any(|r| *r == "icon" || r.starts_with("apple-touch-icon")) {
            let (width, height) = element
                .attr("sizes")
                .and_then(parse_sizes_attr)
                .unwrap_or((0, 0));
            page.icons.push(Image {
                url: href,
                width,
                height,
                size: u64::from(width) * u64::from(height),
                mime: element.attr("type").map(ToString::to_string),
            });
        }
    }

    page
}

fn new_image(url: String) -> Image {
    Image {
        url,
        width: 0,
        height: 0,
        size: 0,
        mime: None,
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_sizes_attr(value: &str) -> Option<(u32, u32)> {
    let caps = SIZES_RE.captures(value)?;
    let width = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let height = caps.get(2)?.as_str().parse::<u32>().ok()?;
    Some((width, height))
}

pub(crate) fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    let base = reqwest::Url::parse(base_url).ok()?;
    base.join(candidate).ok().map(|u| u.to_string())
}
