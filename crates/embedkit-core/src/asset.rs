//! The normalized embed metadata model.
//!
//! An [`EmbeddedAsset`] is only ever produced by [`crate::builder`], which
//! enforces the closed field schema and runs [`EmbeddedAsset::validate`].
//! Fields are private so a built asset cannot drift out of that shape; a
//! modified copy goes back through the builder via [`EmbeddedAsset::to_fields`].

use serde::Serialize;

use crate::builder::{AssetFields, FieldValue};

/// Every key of the persisted document, in document order.
pub const ASSET_FIELDS: [&str; 22] = [
    "title",
    "description",
    "url",
    "type",
    "tags",
    "images",
    "image",
    "imageWidth",
    "imageHeight",
    "code",
    "width",
    "height",
    "aspectRatio",
    "authorName",
    "authorUrl",
    "providerName",
    "providerUrl",
    "providerIcon",
    "providerIcons",
    "publishedTime",
    "license",
    "feeds",
];

/// Raw embeddable markup that is rendered without escaping.
///
/// Never empty: [`Markup::new`] collapses the empty string to `None`, so an
/// `Option<Markup>` is either real markup or absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Markup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One candidate image or provider icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub mime: Option<String>,
}

impl Image {
    /// The larger of the two dimensions; the measure used for size selection.
    #[must_use]
    pub fn effective_size(&self) -> u32 {
        self.width.max(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedAsset {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) url: String,
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) images: Vec<Image>,
    pub(crate) image: Option<String>,
    pub(crate) image_width: u32,
    pub(crate) image_height: u32,
    pub(crate) code: Option<Markup>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) aspect_ratio: f64,
    pub(crate) author_name: Option<String>,
    pub(crate) author_url: Option<String>,
    pub(crate) provider_name: Option<String>,
    pub(crate) provider_url: Option<String>,
    pub(crate) provider_icon: Option<String>,
    pub(crate) provider_icons: Vec<Image>,
    pub(crate) published_time: Option<String>,
    pub(crate) license: Option<String>,
    pub(crate) feeds: Vec<String>,
}

impl EmbeddedAsset {
    /// An asset with every field at its default; only the builder fills it in.
    pub(crate) fn empty() -> Self {
        Self {
            title: None,
            description: None,
            url: String::new(),
            kind: None,
            tags: Vec::new(),
            images: Vec::new(),
            image: None,
            image_width: 0,
            image_height: 0,
            code: None,
            width: 0,
            height: 0,
            aspect_ratio: 0.0,
            author_name: None,
            author_url: None,
            provider_name: None,
            provider_url: None,
            provider_icon: None,
            provider_icons: Vec::new(),
            published_time: None,
            license: None,
            feeds: Vec::new(),
        }
    }

    /// Schema-level checks run after every field has been assigned.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason naming the first offending field.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("url must be non-empty".to_string());
        }
        if let Some(image) = self.images.iter().find(|i| i.url.trim().is_empty()) {
            return Err(format!("images entry has an empty url ({image:?})"));
        }
        if self.provider_icons.iter().any(|i| i.url.trim().is_empty()) {
            return Err("providerIcons entry has an empty url".to_string());
        }
        if !self.aspect_ratio.is_finite() || self.aspect_ratio < 0.0 {
            return Err(format!(
                "aspectRatio must be a finite non-negative number, got {}",
                self.aspect_ratio
            ));
        }
        if self.tags.iter().any(String::is_empty) {
            return Err("tags must not contain empty strings".to_string());
        }
        Ok(())
    }

    /// The asset as builder input, for producing a modified copy.
    ///
    /// `code` is carried as [`FieldValue::Markup`] so it stays trusted.
    #[must_use]
    pub fn to_fields(&self) -> AssetFields {
        let mut fields = AssetFields::new();
        let value = serde_json::to_value(self).unwrap_or_default();
        if let serde_json::Value::Object(map) = value {
            for (key, value) in map {
                fields.insert(key, FieldValue::Json(value));
            }
        }
        if let Some(code) = &self.code {
            fields.insert("code".to_string(), FieldValue::Markup(code.clone()));
        }
        fields
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Category tag such as `video`, `photo`, `link` or `rich`.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    #[must_use]
    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    #[must_use]
    pub fn code(&self) -> Option<&Markup> {
        self.code.as_ref()
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `height / width * 100`, or 0 when the width is unknown.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    #[must_use]
    pub fn author_name(&self) -> Option<&str> {
        self.author_name.as_deref()
    }

    #[must_use]
    pub fn author_url(&self) -> Option<&str> {
        self.author_url.as_deref()
    }

    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    #[must_use]
    pub fn provider_url(&self) -> Option<&str> {
        self.provider_url.as_deref()
    }

    #[must_use]
    pub fn provider_icon(&self) -> Option<&str> {
        self.provider_icon.as_deref()
    }

    #[must_use]
    pub fn provider_icons(&self) -> &[Image] {
        &self.provider_icons
    }

    #[must_use]
    pub fn published_time(&self) -> Option<&str> {
        self.published_time.as_deref()
    }

    #[must_use]
    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    #[must_use]
    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }
}

/// Aspect ratio as a percentage (`height / width * 100`), 0 when `width` is 0.
#[must_use]
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    if width > 0 {
        f64::from(height) / f64::from(width) * 100.0
    } else {
        0.0
    }
}
