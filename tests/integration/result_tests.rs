//! Detection endpoint integration tests.
//!
//! Tests verify:
//! - JSON results and their exact serialization
//! - Annotated image output and that the image is then servable
//! - Malformed queries never touch the device
//! - Device and detector failures render as messages under 200

use axum::http::StatusCode;

use face_detection_service::Rect;

use super::test_utils::{create_test_router, get, text, FakeFrames, FakeLoader, TestSite};

const HEADING: &str = "<h1>Face Detection Service</h1>";
const USAGE_BODY: &str = "<h1>Face Detection Service</h1><p>Wrong parameter</p><p>Usage: ?type={ json | image }</p>";

// =============================================================================
// JSON Results
// =============================================================================

#[tokio::test]
async fn test_json_no_faces() {
    let site = TestSite::new();
    let frames = FakeFrames::new();
    let router = create_test_router(&site, frames.clone(), FakeLoader::with_faces(vec![]), 1024);

    let (status, headers, body) = get(router, "/getResult?type=json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(text(&body), r#"{"faces":[]}"#);
    assert_eq!(frames.capture_count(), 1);
}

#[tokio::test]
async fn test_json_single_face() {
    let site = TestSite::new();
    let loader = FakeLoader::with_faces(vec![Rect::new(1, 2, 3, 4)]);
    let router = create_test_router(&site, FakeFrames::new(), loader, 1024);

    let (status, _, body) = get(router, "/getResult?type=json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        text(&body),
        r#"{"faces":[{"x":1,"y":2,"width":3,"height":4}]}"#
    );
}

#[tokio::test]
async fn test_json_preserves_detector_order() {
    let site = TestSite::new();
    let loader = FakeLoader::with_faces(vec![Rect::new(30, 0, 8, 8), Rect::new(2, 5, 9, 9)]);
    let router = create_test_router(&site, FakeFrames::new(), loader, 1024);

    let (_, _, body) = get(router, "/getResult?type=json").await;
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["faces"][0]["x"], 30);
    assert_eq!(json["faces"][1]["x"], 2);
}

#[tokio::test]
async fn test_detector_loaded_once_across_requests() {
    let site = TestSite::new();
    let loader = FakeLoader::with_faces(vec![]);
    let frames = FakeFrames::new();
    let router = create_test_router(&site, frames.clone(), loader.clone(), 1024);

    let _ = get(router.clone(), "/health").await;
    assert_eq!(loader.load_count(), 0);

    for _ in 0..3 {
        let (status, _, _) = get(router.clone(), "/getResult?type=json").await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(loader.load_count(), 1);
    assert_eq!(frames.capture_count(), 3);
}

// =============================================================================
// Image Results
// =============================================================================

#[tokio::test]
async fn test_image_result_is_written_and_servable() {
    let site = TestSite::new();
    let loader = FakeLoader::with_faces(vec![Rect::new(4, 4, 10, 10)]);
    let router = create_test_router(&site, FakeFrames::new(), loader, 1024);

    let (status, headers, body) = get(router.clone(), "/getResult?type=image").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let body = text(&body);
    assert!(body.starts_with(HEADING));
    assert!(body.contains("<img src=\"image.jpg\">"));
    assert!(site.root().join("image.jpg").is_file());

    let (status, headers, image) = get(router, "/image.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/jpeg");
    assert_eq!(&image[..2], &[0xFF, 0xD8]);

    let decoded = image::load_from_memory(&image).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}

// =============================================================================
// Malformed Queries
// =============================================================================

#[tokio::test]
async fn test_missing_parameter_shows_usage() {
    let site = TestSite::new();
    let frames = FakeFrames::new();
    let loader = FakeLoader::with_faces(vec![]);

    for uri in ["/getResult", "/getResult?", "/getResult?kind=json"] {
        let router = create_test_router(&site, frames.clone(), loader.clone(), 1024);
        let (status, _, body) = get(router, uri).await;

        assert_eq!(status, StatusCode::OK, "uri {}", uri);
        assert_eq!(text(&body), USAGE_BODY, "uri {}", uri);
    }

    assert_eq!(frames.capture_count(), 0);
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_extra_parameter_shows_usage() {
    let site = TestSite::new();
    let frames = FakeFrames::new();

    for uri in ["/getResult?type=json&x=1", "/getResult?type=json&type=image"] {
        let router =
            create_test_router(&site, frames.clone(), FakeLoader::with_faces(vec![]), 1024);
        let (status, _, body) = get(router, uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(text(&body), USAGE_BODY);
    }

    assert_eq!(frames.capture_count(), 0);
}

#[tokio::test]
async fn test_unknown_value_reported() {
    let site = TestSite::new();
    let frames = FakeFrames::new();
    let router = create_test_router(&site, frames.clone(), FakeLoader::with_faces(vec![]), 1024);

    let (status, _, body) = get(router, "/getResult?type=video").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        text(&body),
        format!("{}<p>Wrong value: video</p>", HEADING)
    );
    assert_eq!(frames.capture_count(), 0);
}

#[tokio::test]
async fn test_unknown_value_is_escaped() {
    let site = TestSite::new();
    let router = create_test_router(
        &site,
        FakeFrames::new(),
        FakeLoader::with_faces(vec![]),
        1024,
    );

    let (_, _, body) = get(router, "/getResult?type=%3Cscript%3E").await;

    let body = text(&body);
    assert!(body.contains("Wrong value: &lt;script&gt;"));
    assert!(!body.contains("<script>"));
}

// =============================================================================
// Collaborator Failures
// =============================================================================

#[tokio::test]
async fn test_detector_load_failure_reported() {
    let site = TestSite::new();
    let frames = FakeFrames::new();
    let loader = FakeLoader::failing();
    let router = create_test_router(&site, frames.clone(), loader.clone(), 1024);

    let (status, _, body) = get(router.clone(), "/getResult?type=json").await;

    assert_eq!(status, StatusCode::OK);
    let body = text(&body);
    assert!(body.starts_with(HEADING));
    assert!(body.contains("Error loading face detector"));
    assert_eq!(frames.capture_count(), 0);

    // Not cached: the next request tries again
    let _ = get(router, "/getResult?type=json").await;
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn test_device_failure_reported() {
    let site = TestSite::new();
    let router = create_test_router(
        &site,
        FakeFrames::unavailable(),
        FakeLoader::with_faces(vec![]),
        1024,
    );

    let (status, _, body) = get(router, "/getResult?type=image").await;

    assert_eq!(status, StatusCode::OK);
    assert!(text(&body).contains("no such device"));
    assert!(!site.root().join("image.jpg").exists());
}
