use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use embedkit_core::{Image, Whitelist};
use embedkit_fetch::{EmbedFetcher, ProviderData};
use tower::ServiceExt;

use super::*;

/// Answers every URL with the same canned provider data.
struct StaticFetcher {
    code: Option<String>,
    calls: AtomicU32,
}

#[async_trait]
impl EmbedFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<ProviderData, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("missing") {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !url.starts_with("http") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "relative URL without a base".to_string(),
            });
        }
        Ok(ProviderData {
            title: Some("Clip <one>".to_string()),
            url: url.to_string(),
            kind: Some("video".to_string()),
            code: self.code.clone(),
            images: vec![
                Image {
                    url: "https://cdn.example.com/small.jpg".to_string(),
                    width: 120,
                    height: 90,
                    size: 10_800,
                    mime: None,
                },
                Image {
                    url: "https://cdn.example.com/large.jpg".to_string(),
                    width: 640,
                    height: 480,
                    size: 307_200,
                    mime: None,
                },
            ],
            width: 640,
            height: 360,
            ..ProviderData::default()
        })
    }
}

struct TestApp {
    app: Router,
    _dir: tempfile::TempDir,
    root: std::path::PathBuf,
}

fn test_app(code: Option<&str>) -> TestApp {
    let fetcher = Arc::new(StaticFetcher {
        code: code.map(ToString::to_string),
        calls: AtomicU32::new(0),
    });
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().to_path_buf();
    let whitelist = Whitelist::new(["*.example.com"]).expect("whitelist");
    let state = AppState {
        cache: Arc::new(CacheFront::new(fetcher, 300, 16)),
        validator: Arc::new(SafetyValidator::new(whitelist)),
        store: Arc::new(AssetStore::new(&root, 50, 50)),
    };
    TestApp {
        app: build_app(state),
        _dir: dir,
        root,
    }
}

const SAFE_CODE: &str = "<iframe src=\"https://player.example.com/1\"></iframe>";
const UNSAFE_CODE: &str = "<iframe src=\"https://evil.test/1\"></iframe>";

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

async fn body_string(response: axum::response::Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("json parse")
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("unprocessable", StatusCode::UNPROCESSABLE_ENTITY),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        assert_eq!(ApiError::new("r", code, "m").into_response().status(), status);
    }
}

#[tokio::test]
async fn health_returns_ok_with_request_id() {
    let t = test_app(None);
    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["meta"]["request_id"], "req-123");
}

#[tokio::test]
async fn lookup_returns_asset_verdict_and_images() {
    let t = test_app(Some(SAFE_CODE));
    let response = get(
        t.app,
        "/api/v1/embeds?url=https%3A%2F%2Fwww.example.com%2Fv%2F1&size=100",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["asset"]["url"], "https://www.example.com/v/1");
    assert_eq!(data["asset"]["type"], "video");
    assert_eq!(data["asset"]["aspectRatio"], 56.25);
    assert_eq!(data["safe"], true);
    assert_eq!(data["violations"].as_array().map(Vec::len), Some(0));
    assert_eq!(
        data["display_image"]["url"],
        "https://cdn.example.com/small.jpg"
    );
    assert!(data["provider_icon"].is_null());
}

#[tokio::test]
async fn lookup_reports_unsafe_markup() {
    let t = test_app(Some(UNSAFE_CODE));
    let response = get(t.app, "/api/v1/embeds?url=https://www.example.com/v/2").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["safe"], false);
    assert_eq!(
        json["data"]["violations"][0],
        "iframe target https://evil.test/1 is not whitelisted"
    );
}

#[tokio::test]
async fn lookup_without_url_is_bad_request() {
    let t = test_app(None);
    let response = get(t.app, "/api/v1/embeds?url=%20%20").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn lookup_maps_fetch_errors() {
    let t = test_app(None);
    let response = get(t.app.clone(), "/api/v1/embeds?url=https://www.example.com/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(t.app, "/api/v1/embeds?url=nonsense").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn save_writes_document_into_folder() {
    let t = test_app(Some(SAFE_CODE));
    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/embeds")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"url": "https://www.example.com/v/1", "folder": "videos"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["file_name"], "Clip-one.json");
    assert_eq!(json["data"]["folder"], "videos");
    assert_eq!(json["data"]["title"], "Clip <one>");
    assert_eq!(json["data"]["safe"], true);

    let stored = std::fs::read_to_string(t.root.join("videos/Clip-one.json")).expect("file");
    assert!(stored.contains("\"url\": \"https://www.example.com/v/1\""));
}

#[tokio::test]
async fn save_rejects_folder_outside_root() {
    let t = test_app(None);
    let response = t
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/embeds")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"url": "https://www.example.com/v/1", "folder": "../escape"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preview_renders_safe_markup() {
    let t = test_app(Some(SAFE_CODE));
    let response = get(
        t.app,
        "/api/v1/embeds/preview?url=https://www.example.com/v/1&callback=parent.onLoaded",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/html; charset=utf-8")
    );
    let html = body_string(response).await;
    assert!(html.contains(SAFE_CODE));
    assert!(html.contains("<title>Clip &lt;one&gt;</title>"));
    assert!(html.contains("parent.onLoaded(document.body.scrollHeight)"));
}

#[tokio::test]
async fn preview_withholds_unsafe_markup() {
    let t = test_app(Some(UNSAFE_CODE));
    let response = get(t.app, "/api/v1/embeds/preview?url=https://www.example.com/v/2").await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(!html.contains("evil.test"));
    assert!(html.contains("href=\"https://www.example.com/v/2\""));
    assert!(html.contains("<img src=\"https://cdn.example.com/large.jpg\""));
    assert!(html.contains("<span>Clip &lt;one&gt;</span>"));
}

#[tokio::test]
async fn preview_rejects_script_callback() {
    let t = test_app(Some(SAFE_CODE));
    let response = get(
        t.app,
        "/api/v1/embeds/preview?url=https://www.example.com/v/1&callback=alert(1)",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
