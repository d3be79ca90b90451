use embedkit_core::build_asset;

use super::*;

fn page() -> PageMetadata {
    PageMetadata {
        title: Some("Page title".to_string()),
        description: Some("Page description".to_string()),
        site_name: Some("Example".to_string()),
        images: vec![Image {
            url: "https://www.example.com/og.png".to_string(),
            width: 1200,
            height: 630,
            size: 756_000,
            mime: None,
        }],
        ..PageMetadata::default()
    }
}

#[test]
fn oembed_values_win_over_page_metadata() {
    let oembed = OembedResponse {
        kind: Some("video".to_string()),
        title: Some("Video title".to_string()),
        provider_name: Some("VideoSite".to_string()),
        html: Some("<iframe src=\"https://www.example.com/embed/1\"></iframe>".to_string()),
        width: Some(640),
        height: Some(360),
        thumbnail_url: Some("https://www.example.com/thumb.jpg".to_string()),
        thumbnail_width: Some(480),
        thumbnail_height: Some(360),
        ..OembedResponse::default()
    };
    let data = merge("https://www.example.com/v/1", page(), Some(oembed));

    assert_eq!(data.title.as_deref(), Some("Video title"));
    assert_eq!(data.description.as_deref(), Some("Page description"));
    assert_eq!(data.kind.as_deref(), Some("video"));
    assert_eq!(data.provider_name.as_deref(), Some("VideoSite"));
    assert!((data.aspect_ratio - 56.25).abs() < 1e-9);
    assert_eq!(data.images.len(), 2);
    assert_eq!(data.images[0].url, "https://www.example.com/thumb.jpg");
    assert_eq!(data.image.as_deref(), Some("https://www.example.com/og.png"));
    assert_eq!(data.image_width, 1200);
    assert!(data.code.unwrap().starts_with("<iframe"));
}

#[test]
fn page_only_defaults_to_link() {
    let data = merge("https://www.example.com/a", page(), None);
    assert_eq!(data.kind.as_deref(), Some("link"));
    assert_eq!(data.url, "https://www.example.com/a");
    assert!(data.code.is_none());
    assert!(data.aspect_ratio.abs() < f64::EPSILON);
    assert_eq!(data.provider_url.as_deref(), Some("https://www.example.com"));
    assert_eq!(data.provider_icons[0].url, "https://www.example.com/favicon.ico");
    assert_eq!(
        data.provider_icon.as_deref(),
        Some("https://www.example.com/favicon.ico")
    );
}

#[test]
fn canonical_url_replaces_fetched_url() {
    let page = PageMetadata {
        canonical_url: Some("https://www.example.com/canonical".to_string()),
        ..PageMetadata::default()
    };
    let data = merge("https://www.example.com/a?utm=1", page, None);
    assert_eq!(data.url, "https://www.example.com/canonical");
    assert_eq!(data.provider_name.as_deref(), Some("www.example.com"));
}

#[test]
fn canonical_url_on_another_host_is_ignored() {
    let page = PageMetadata {
        canonical_url: Some("https://www.youtube.com/watch?v=1".to_string()),
        ..PageMetadata::default()
    };
    let oembed = OembedResponse {
        html: Some("<img src=x onerror=alert(1)>".to_string()),
        ..OembedResponse::default()
    };
    let data = merge("https://evil.test/p", page, Some(oembed));
    assert_eq!(data.url, "https://evil.test/p");
    assert_eq!(data.provider_url.as_deref(), Some("https://evil.test"));
}

#[test]
fn unsized_images_survive_minimum_size_filter() {
    let photo = photo_data("https://cdn.example.com/cat.png", Some("image/png".to_string()));
    let asset = build_asset(photo.into_fields(16)).unwrap();
    assert_eq!(asset.images().len(), 1);
    assert_eq!(asset.image(), Some("https://cdn.example.com/cat.png"));

    let page = parse_page(
        "https://www.example.com/a",
        r#"<meta property="og:image" content="/og.jpg">"#,
    );
    let asset = build_asset(merge("https://www.example.com/a", page, None).into_fields(16)).unwrap();
    assert_eq!(asset.images()[0].url, "https://www.example.com/og.jpg");
    assert_eq!(
        asset.provider_icons()[0].url,
        "https://www.example.com/favicon.ico"
    );
}

#[test]
fn photo_without_html_gets_escaped_img_code() {
    let oembed = OembedResponse {
        kind: Some("photo".to_string()),
        title: Some("A \"quoted\" <title>".to_string()),
        url: Some("https://img.example.com/p.jpg?a=1&b=2".to_string()),
        width: Some(800),
        height: Some(600),
        ..OembedResponse::default()
    };
    let data = merge("https://www.example.com/p", PageMetadata::default(), Some(oembed));
    assert_eq!(
        data.code.as_deref(),
        Some("<img src=\"https://img.example.com/p.jpg?a=1&amp;b=2\" width=\"800\" height=\"600\" alt=\"A &quot;quoted&quot; &lt;title&gt;\">")
    );
}

#[test]
fn direct_image_becomes_photo() {
    let data = photo_data("https://cdn.example.com/cat.png", Some("image/png".to_string()));
    assert_eq!(data.kind.as_deref(), Some("photo"));
    assert_eq!(data.image.as_deref(), Some("https://cdn.example.com/cat.png"));
    assert_eq!(data.images[0].mime.as_deref(), Some("image/png"));
    assert_eq!(
        data.code.as_deref(),
        Some("<img src=\"https://cdn.example.com/cat.png\" alt=\"\">")
    );
}

#[test]
fn validate_url_rejects_non_http_schemes() {
    assert!(validate_url(" https://example.com/a ").is_ok());
    assert!(matches!(
        validate_url("javascript:alert(1)"),
        Err(FetchError::InvalidUrl { .. })
    ));
    assert!(matches!(
        validate_url("not a url"),
        Err(FetchError::InvalidUrl { .. })
    ));
}

#[test]
fn intermediary_prefers_iframely() {
    let client = OembedClient::new(FetchOptions {
        iframely_key: Some("ik".to_string()),
        embedly_key: Some("ek".to_string()),
        ..FetchOptions::default()
    })
    .unwrap();
    let endpoint = client
        .intermediary_endpoint("https://example.com/a")
        .unwrap();
    assert_eq!(
        endpoint,
        "https://iframe.ly/api/oembed?url=https%3A%2F%2Fexample.com%2Fa&api_key=ik"
    );

    let client = OembedClient::new(FetchOptions::default()).unwrap();
    assert!(client.intermediary_endpoint("https://example.com/a").is_none());
}

#[test]
fn extract_domain_takes_host() {
    assert_eq!(extract_domain("https://www.youtube.com/oembed?x=1"), "www.youtube.com");
    assert_eq!(extract_domain("nonsense"), "nonsense");
}

#[test]
fn fetch_options_debug_redacts_keys() {
    let options = FetchOptions {
        iframely_key: Some("secret-iframely".to_string()),
        ..FetchOptions::default()
    };
    let debug = format!("{options:?}");
    assert!(!debug.contains("secret-iframely"));
    assert!(debug.contains("[redacted]"));
}
