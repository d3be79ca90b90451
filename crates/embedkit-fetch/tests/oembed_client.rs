//! Integration tests for `OembedClient::fetch`.
//!
//! Each test stands up a `wiremock` server playing both the page host and
//! the oEmbed endpoint, so no real network traffic is made.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use embedkit_fetch::{EmbedFetcher, FetchError, FetchOptions, OembedClient};

fn test_client(max_retries: u32) -> OembedClient {
    OembedClient::new(FetchOptions {
        timeout_secs: 5,
        user_agent: "embedkit-test/0.1".to_string(),
        max_retries,
        backoff_base_secs: 0,
        ..FetchOptions::default()
    })
    .expect("failed to build test OembedClient")
}

fn html_page(head: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><head>{head}</head><body></body></html>"))
}

#[tokio::test]
async fn discovers_oembed_from_link_element() {
    let server = MockServer::start().await;
    let oembed_href = format!("{}/oembed?format=json", server.uri());

    Mock::given(method("GET"))
        .and(path("/watch"))
        .respond_with(html_page(&format!(
            r#"<title>Fallback</title>
               <meta property="og:description" content="From the page">
               <link rel="alternate" type="application/json+oembed" href="{oembed_href}">"#
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oembed"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "1.0",
            "type": "video",
            "title": "From oEmbed",
            "provider_name": "MockTube",
            "html": "<iframe src=\"https://mocktube.example/embed/1\"></iframe>",
            "width": 640,
            "height": "360",
            "thumbnail_url": "https://mocktube.example/t.jpg",
            "thumbnail_width": 480,
            "thumbnail_height": 360
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = test_client(0)
        .fetch(&format!("{}/watch", server.uri()))
        .await
        .expect("fetch should succeed");

    assert_eq!(data.title.as_deref(), Some("From oEmbed"));
    assert_eq!(data.description.as_deref(), Some("From the page"));
    assert_eq!(data.kind.as_deref(), Some("video"));
    assert_eq!(data.provider_name.as_deref(), Some("MockTube"));
    assert_eq!((data.width, data.height), (640, 360));
    assert!((data.aspect_ratio - 56.25).abs() < 1e-9);
    assert_eq!(data.images[0].url, "https://mocktube.example/t.jpg");
    assert!(data.code.is_some());
}

#[tokio::test]
async fn discovers_oembed_from_link_header_with_extra_parameters() {
    let server = MockServer::start().await;
    let link = format!(
        "<{}/api/oembed?url=x>; rel=\"alternate\"; type=\"application/json+oembed\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(html_page("<title>Post</title>").insert_header("link", link.as_str()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/oembed"))
        .and(query_param("url", "x"))
        .and(query_param("maxwidth", "800"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "rich",
            "html": "<blockquote>post</blockquote>"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OembedClient::new(FetchOptions {
        max_retries: 0,
        backoff_base_secs: 0,
        parameters: vec![("maxwidth".to_string(), "800".to_string())],
        ..FetchOptions::default()
    })
    .unwrap();

    let data = client
        .fetch(&format!("{}/post", server.uri()))
        .await
        .unwrap();
    assert_eq!(data.kind.as_deref(), Some("rich"));
    assert_eq!(data.code.as_deref(), Some("<blockquote>post</blockquote>"));
    assert_eq!(data.title.as_deref(), Some("Post"));
}

#[tokio::test]
async fn falls_back_to_intermediary_when_page_has_no_oembed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html_page("<title>Article</title>"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/iframely"))
        .and(query_param("api_key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "link",
            "provider_name": "Iframely"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OembedClient::new(FetchOptions {
        max_retries: 0,
        iframely_key: Some("test-key".to_string()),
        iframely_endpoint: format!("{}/iframely", server.uri()),
        ..FetchOptions::default()
    })
    .unwrap();

    let data = client
        .fetch(&format!("{}/article", server.uri()))
        .await
        .unwrap();
    assert_eq!(data.provider_name.as_deref(), Some("Iframely"));
    assert_eq!(data.title.as_deref(), Some("Article"));
}

#[tokio::test]
async fn broken_oembed_endpoint_keeps_page_metadata() {
    let server = MockServer::start().await;
    let oembed_href = format!("{}/oembed", server.uri());

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html_page(&format!(
            r#"<title>Only the page</title>
               <link rel="alternate" type="application/json+oembed" href="{oembed_href}">"#
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oembed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let data = test_client(0)
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap();
    assert_eq!(data.title.as_deref(), Some("Only the page"));
    assert_eq!(data.kind.as_deref(), Some("link"));
    assert!(data.code.is_none());
}

#[tokio::test]
async fn image_response_becomes_photo() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cat.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .mount(&server)
        .await;

    let url = format!("{}/cat.png", server.uri());
    let data = test_client(0).fetch(&url).await.unwrap();
    assert_eq!(data.kind.as_deref(), Some("photo"));
    assert_eq!(data.image.as_deref(), Some(url.as_str()));
    assert_eq!(data.images[0].mime.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn page_not_found_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_client(3)
        .fetch(&format!("{}/missing", server.uri()))
        .await;
    assert!(matches!(result, Err(FetchError::NotFound { .. })));
}

#[tokio::test]
async fn server_error_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/boom"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = test_client(0).fetch(&format!("{}/boom", server.uri())).await;
    assert!(matches!(
        result,
        Err(FetchError::UnexpectedStatus { status: 503, .. })
    ));
}

#[tokio::test]
async fn rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(html_page("<title>Finally</title>"))
        .mount(&server)
        .await;

    let data = test_client(2)
        .fetch(&format!("{}/busy", server.uri()))
        .await
        .unwrap();
    assert_eq!(data.title.as_deref(), Some("Finally"));
}

#[tokio::test]
async fn rate_limit_reported_after_retries_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .expect(2)
        .mount(&server)
        .await;

    let result = test_client(1)
        .fetch(&format!("{}/busy", server.uri()))
        .await;
    assert!(matches!(
        result,
        Err(FetchError::RateLimited {
            retry_after_secs: 30,
            ..
        })
    ));
}

#[tokio::test]
async fn non_http_url_is_rejected_without_a_request() {
    let result = test_client(0).fetch("file:///etc/passwd").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
}
