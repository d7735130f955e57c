//! Integration tests for the HTTP surface
//!
//! Run with: cargo test --test http_api_test

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, get, post_json, TestEnvironment};
use serde_json::json;
use tower::ServiceExt;
use vidfetch::download::VideoSummary;
use vidfetch::testing::Step;

#[tokio::test]
async fn test_unsupported_host_rejected_without_subprocess() {
    let env = TestEnvironment::idle();

    for uri in ["/analyze", "/download", "/api/analyze", "/api/download"] {
        let response = env
            .router()
            .oneshot(post_json(uri, json!({ "url": "https://example.com/video/1" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body_json(response).await["error"], "Invalid or unsupported URL");
    }

    assert_eq!(env.runner.call_count(), 0);
    assert_eq!(env.workspace_count(), 0);
}

#[tokio::test]
async fn test_lookalike_host_rejected() {
    let env = TestEnvironment::idle();

    let response = env
        .router()
        .oneshot(post_json("/download", json!({ "url": "https://notyoutube.com.evil.net/watch" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.runner.call_count(), 0);
}

#[tokio::test]
async fn test_download_fallback_returns_file() {
    let env = TestEnvironment::new([Step::Timeout, Step::succeed_with_file("Clip.webm", b"fallback-bytes")]);

    let response = env
        .router()
        .oneshot(post_json(
            "/api/download",
            json!({
                "url": "https://www.youtube.com/watch?v=abc",
                "format": "mp4-1080p",
                "removeWatermark": false,
                "audioOnly": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "14");
    assert_eq!(body_bytes(response).await, b"fallback-bytes".to_vec());
    assert_eq!(env.runner.call_count(), 2);
    assert_eq!(env.workspace_count(), 0);
}

#[tokio::test]
async fn test_download_timeout_twice_is_timeout_message() {
    let env = TestEnvironment::new([Step::Timeout, Step::Timeout]);

    let response = env
        .router()
        .oneshot(post_json("/download", json!({ "url": "https://www.facebook.com/watch?v=1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Download timeout"));
    assert_eq!(env.workspace_count(), 0);
}

#[tokio::test]
async fn test_analyze_summary() {
    let dump = json!({
        "title": "Sample",
        "duration": 3725,
        "uploader": "channel",
        "view_count": 1000,
        "formats": [
            { "height": 720, "ext": "mp4", "filesize": 10485760 },
            { "height": 720, "ext": "webm", "filesize": 12582912 },
            { "height": 480, "ext": "mp4", "filesize": 5242880 },
            { "ext": "m4a", "filesize": 3000000 }
        ]
    });
    let env = TestEnvironment::new([Step::stdout(dump.to_string())]);

    let response = env
        .router()
        .oneshot(post_json("/analyze", json!({ "url": "https://www.youtube.com/watch?v=abc" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let summary: VideoSummary = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(summary.title, "Sample");
    assert_eq!(summary.duration, "1:02:05");
    assert_eq!(summary.platform, "youtube");
    assert_eq!(summary.upload_date, None);

    let qualities: Vec<&str> = summary.formats.iter().map(|f| f.quality.as_str()).collect();
    assert_eq!(qualities, ["720p", "480p", "Audio"]);
    assert_eq!(summary.formats[0].size, "12.0 MB");
    assert_eq!(summary.formats[0].format, "webm");
}

#[tokio::test]
async fn test_analyze_timeout_message() {
    let env = TestEnvironment::new([Step::Timeout]);

    let response = env
        .router()
        .oneshot(post_json("/analyze", json!({ "url": "https://x.com/user/status/1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Analysis timeout - please try again");
    assert_eq!(env.runner.call_count(), 1);
}

#[tokio::test]
async fn test_health_reports_version() {
    let env = TestEnvironment::new([Step::stdout("2024.08.06\n"), Step::stdout("ffmpeg version 7.0\n")]);

    let response = env.router().oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], "2024.08.06");
}

#[tokio::test]
async fn test_cors_headers_present() {
    let env = TestEnvironment::new([Step::stdout("2024.08.06\n"), Step::fail("no ffmpeg")]);

    let mut request = get("/health");
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());

    let response = env.router().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
