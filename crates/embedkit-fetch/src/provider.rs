//! Provider data in the shape the model builder consumes.

use embedkit_core::{is_large_enough, AssetFields, FieldValue, Image, Markup};
use serde_json::{json, Value};

/// Raw metadata gathered for one URL, before it becomes an asset.
///
/// Field names mirror the persisted document one to one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub kind: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<Image>,
    pub image: Option<String>,
    pub image_width: u32,
    pub image_height: u32,
    pub code: Option<String>,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub provider_name: Option<String>,
    pub provider_url: Option<String>,
    pub provider_icons: Vec<Image>,
    pub provider_icon: Option<String>,
    pub published_time: Option<String>,
    pub license: Option<String>,
    pub feeds: Vec<String>,
}

impl ProviderData {
    /// Converts into builder fields, dropping images and icons smaller than
    /// `min_image_size` on either measured side.
    #[must_use]
    pub fn into_fields(self, min_image_size: u32) -> AssetFields {
        let images = filter_images(self.images, min_image_size);
        let provider_icons = filter_images(self.provider_icons, min_image_size);

        let mut fields = AssetFields::new();
        let mut put = |key: &str, value: Value| {
            fields.insert(key.to_string(), FieldValue::Json(value));
        };

        put("title", json!(self.title));
        put("description", json!(self.description));
        put("url", json!(self.url));
        put("type", json!(self.kind));
        put("tags", json!(self.tags));
        put("images", images);
        put("image", json!(self.image));
        put("imageWidth", json!(self.image_width));
        put("imageHeight", json!(self.image_height));
        put("width", json!(self.width));
        put("height", json!(self.height));
        put("aspectRatio", json!(self.aspect_ratio));
        put("authorName", json!(self.author_name));
        put("authorUrl", json!(self.author_url));
        put("providerName", json!(self.provider_name));
        put("providerUrl", json!(self.provider_url));
        put("providerIcons", provider_icons);
        put("providerIcon", json!(self.provider_icon));
        put("publishedTime", json!(self.published_time));
        put("license", json!(self.license));
        put("feeds", json!(self.feeds));

        if let Some(code) = self.code.and_then(Markup::new) {
            fields.insert("code".to_string(), FieldValue::Markup(code));
        }

        fields
    }
}

fn filter_images(images: Vec<Image>, min_size: u32) -> Value {
    let kept: Vec<Value> = images
        .into_iter()
        .filter(|image| is_large_enough(image, min_size))
        .map(|image| {
            json!({
                "url": image.url,
                "width": image.width,
                "height": image.height,
                "size": image.size,
                "mime": image.mime,
            })
        })
        .collect();
    Value::Array(kept)
}
