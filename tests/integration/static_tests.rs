//! Static file integration tests.
//!
//! Tests verify:
//! - Files under the web root are served intact with Content-Length
//! - Directories serve their index document
//! - Traversal and missing paths are rejected with 400

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{create_test_router, get, patterned_bytes, text, FakeFrames, FakeLoader, TestSite};

fn site_router(site: &TestSite, chunk_size: usize) -> axum::Router {
    create_test_router(site, FakeFrames::new(), FakeLoader::with_faces(vec![]), chunk_size)
}

// =============================================================================
// Successful Requests
// =============================================================================

#[tokio::test]
async fn test_serves_file_with_length_and_type() {
    let site = TestSite::new().with_file("style.css", "body { color: red; }");
    let (status, headers, body) = get(site_router(&site, 1024), "/style.css").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-length").unwrap(), "20");
    assert_eq!(
        headers.get("content-type").unwrap(),
        "text/css; charset=utf-8"
    );
    assert_eq!(text(&body), "body { color: red; }");
}

#[tokio::test]
async fn test_root_serves_index() {
    let site = TestSite::new().with_file("index.html", "<p>home</p>");
    let (status, headers, body) = get(site_router(&site, 1024), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(text(&body), "<p>home</p>");
}

#[tokio::test]
async fn test_subdirectory_serves_index() {
    let site = TestSite::new().with_file("docs/index.html", "docs");
    let (status, _, body) = get(site_router(&site, 1024), "/docs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text(&body), "docs");
}

#[tokio::test]
async fn test_large_file_streamed_intact() {
    // Several full chunks plus a partial one
    let contents = patterned_bytes(5 * 1024 + 123);
    let site = TestSite::new().with_file("data/blob.bin", &contents);
    let (status, headers, body) = get(site_router(&site, 1024), "/data/blob.bin").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-length").unwrap(),
        &contents.len().to_string()
    );
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert_eq!(body.as_ref(), contents.as_slice());
}

#[tokio::test]
async fn test_exact_multiple_of_chunk_size() {
    let contents = patterned_bytes(4 * 1024);
    let site = TestSite::new().with_file("even.bin", &contents);
    let (status, _, body) = get(site_router(&site, 1024), "/even.bin").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_ref(), contents.as_slice());
}

#[tokio::test]
async fn test_empty_file() {
    let site = TestSite::new().with_file("empty.txt", "");
    let (status, headers, body) = get(site_router(&site, 1024), "/empty.txt").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-length").unwrap(), "0");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_percent_encoded_name() {
    let site = TestSite::new().with_file("my file.txt", "spaced");
    let (status, _, body) = get(site_router(&site, 1024), "/my%20file.txt").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text(&body), "spaced");
}

#[tokio::test]
async fn test_head_has_length_without_body() {
    let site = TestSite::new().with_file("page.html", "<p>hello</p>");
    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/page.html")
        .body(Body::empty())
        .unwrap();

    let response = site_router(&site, 1024).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-length").unwrap(), "12");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

// =============================================================================
// Rejected Requests
// =============================================================================

#[tokio::test]
async fn test_traversal_rejected() {
    let site = TestSite::new().with_file("index.html", "home");
    assert!(site.outside().join("secret.txt").exists());

    for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/a/../../secret.txt"] {
        let (status, headers, body) = get(site_router(&site, 1024), uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(
            headers.get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = text(&body);
        assert!(body.starts_with("Could not open path"), "body {}", body);
        assert!(!body.contains("top secret"));
    }
}

#[tokio::test]
async fn test_missing_file_is_bad_request() {
    let site = TestSite::new();
    let (status, _, body) = get(site_router(&site, 1024), "/nope.html").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text(&body).contains("/nope.html"));
}

#[tokio::test]
async fn test_directory_without_index_is_bad_request() {
    let site = TestSite::new().with_file("assets/logo.png", [0x89, b'P', b'N', b'G']);
    let (status, _, _) = get(site_router(&site, 1024), "/assets/").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_escape_rejected() {
    let site = TestSite::new();
    std::os::unix::fs::symlink(site.outside().join("secret.txt"), site.root().join("link.txt"))
        .unwrap();

    let (status, _, body) = get(site_router(&site, 1024), "/link.txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text(&body).contains("path must be within root path"));
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_not_shadowed_by_static_route() {
    let site = TestSite::new();
    let (status, _, body) = get(site_router(&site, 1024), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
