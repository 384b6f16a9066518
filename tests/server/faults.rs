use std::sync::atomic::Ordering;

use reqwest::StatusCode;
use thumbservice::application::errors::ErrorResponse;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{frame_json, mount_frame, spawn_app};

const FRAME_ID: i64 = 8_000_001;

async fn request_thumbnail(app: &crate::helpers::TestApp) -> (StatusCode, ErrorResponse) {
    let response = reqwest::Client::new()
        .get(app.url(&format!("/{FRAME_ID}/")))
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status();
    let body = response.json().await.expect("Failed to parse error body");
    (status, body)
}

#[tokio::test]
async fn download_failure_releases_the_workspace() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, FRAME_ID, "rp", 91);
    Mock::given(method("GET"))
        .and(path(format!("/frames/{FRAME_ID}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&frame))
        .mount(&app.mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{FRAME_ID}.fits.fz")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.mock_server)
        .await;

    let (status, body) = request_thumbnail(&app).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body.kind, "archive_unavailable");
    assert_eq!(app.renderer.calls(), 0);
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn render_failure_releases_the_workspace() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, FRAME_ID, "rp", 91);
    mount_frame(&app.mock_server, &frame).await;
    app.renderer.fail.store(true, Ordering::SeqCst);

    let (status, body) = request_thumbnail(&app).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.kind, "render_failure");
    assert!(app.cache.keys().is_empty());
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn persist_failure_releases_the_workspace() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, FRAME_ID, "rp", 91);
    mount_frame(&app.mock_server, &frame).await;
    app.cache.fail_puts.store(true, Ordering::SeqCst);

    let (status, body) = request_thumbnail(&app).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.kind, "storage_unavailable");
    assert_eq!(app.renderer.calls(), 1);
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn recovery_after_a_failed_render() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, FRAME_ID, "rp", 91);
    mount_frame(&app.mock_server, &frame).await;

    app.renderer.fail.store(true, Ordering::SeqCst);
    let (status, _) = request_thumbnail(&app).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    app.renderer.fail.store(false, Ordering::SeqCst);
    let response = reqwest::Client::new()
        .get(app.url(&format!("/{FRAME_ID}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.renderer.calls(), 2);
    assert_eq!(app.cache.keys().len(), 1);
}
