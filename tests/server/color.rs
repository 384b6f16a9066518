use reqwest::StatusCode;
use thumbservice::application::errors::ErrorResponse;
use thumbservice::application::services::ThumbnailLink;
use thumbservice::domain::bands::BandPolicy;

use crate::helpers::{
    frame_json, mount_download, mount_frame, mount_request_listing, spawn_app,
    spawn_app_with_band_policy,
};

const REFERENCE_ID: i64 = 7_000_001;

#[tokio::test]
async fn color_request_renders_all_three_bands() {
    let app = spawn_app().await;
    let server = &app.mock_server;

    let red = frame_json(server, REFERENCE_ID, "rp", 91);
    let visual = frame_json(server, 7_000_002, "V", 91);
    let blue = frame_json(server, 7_000_003, "B", 91);
    mount_frame(server, &red).await;
    mount_download(server, 7_000_002).await;
    mount_download(server, 7_000_003).await;
    mount_request_listing(server, 91, &[blue, red.clone(), visual]).await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/{REFERENCE_ID}/")))
        .query(&[("color", "true")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let link: ThumbnailLink = response.json().await.unwrap();
    assert!(link.url.contains(&format!("/{REFERENCE_ID}.")));

    assert_eq!(app.renderer.calls(), 1);
    let inputs = app.renderer.last_inputs();
    assert_eq!(inputs.len(), 3);
    assert!(
        inputs[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("7000001"),
        "red band comes first: {inputs:?}"
    );
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn mismatched_reduction_level_is_an_incomplete_color_set() {
    let app = spawn_app().await;
    let server = &app.mock_server;

    let red = frame_json(server, REFERENCE_ID, "rp", 91);
    let visual = frame_json(server, 7_000_002, "V", 91);
    // The only blue exposure is a raw frame; it must not be mixed with reduced data.
    let raw_blue = frame_json(server, 7_000_003, "B", 0);
    mount_frame(server, &red).await;
    mount_request_listing(server, 91, &[red.clone(), visual, raw_blue]).await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/{REFERENCE_ID}/")))
        .query(&[("color", "true")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.kind, "incomplete_color_set");
    assert_eq!(app.renderer.calls(), 0);
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn relaxed_band_policy_renders_partial_sets() {
    let app = spawn_app_with_band_policy(BandPolicy { min_bands: 2 }).await;
    let server = &app.mock_server;

    let red = frame_json(server, REFERENCE_ID, "rp", 91);
    let visual = frame_json(server, 7_000_002, "V", 91);
    mount_frame(server, &red).await;
    mount_download(server, 7_000_002).await;
    mount_request_listing(server, 91, &[red.clone(), visual]).await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/{REFERENCE_ID}/")))
        .query(&[("color", "true")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.renderer.last_inputs().len(), 2);
}

#[tokio::test]
async fn color_is_refused_for_calibration_frames() {
    let app = spawn_app().await;
    let mut bias = frame_json(&app.mock_server, 7_100_001, "air", 91);
    bias["configuration_type"] = serde_json::Value::from("BIAS");
    mount_frame(&app.mock_server, &bias).await;

    let client = reqwest::Client::new();
    let color = client
        .get(app.url("/7100001/"))
        .query(&[("color", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(color.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let grayscale = client.get(app.url("/7100001/")).send().await.unwrap();
    assert_eq!(grayscale.status(), StatusCode::OK);
}

#[tokio::test]
async fn companion_without_data_is_an_invalid_frame() {
    let app = spawn_app().await;
    let server = &app.mock_server;

    let red = frame_json(server, REFERENCE_ID, "rp", 91);
    let visual = frame_json(server, 7_000_002, "V", 91);
    let mut blue = frame_json(server, 7_000_003, "B", 91);
    blue["url"] = serde_json::Value::Null;
    mount_frame(server, &red).await;
    mount_download(server, 7_000_002).await;
    mount_request_listing(server, 91, &[red.clone(), visual, blue]).await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/{REFERENCE_ID}/")))
        .query(&[("color", "true")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.kind, "invalid_frame");
    assert_eq!(app.renderer.calls(), 0);
    assert!(app.cache.keys().is_empty());
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn proprietary_companion_needs_a_token() {
    let app = spawn_app().await;
    let server = &app.mock_server;

    let red = frame_json(server, REFERENCE_ID, "rp", 91);
    let mut visual = frame_json(server, 7_000_002, "V", 91);
    visual["public_date"] = serde_json::Value::from("2999-01-01T00:00:00Z");
    let blue = frame_json(server, 7_000_003, "B", 91);
    mount_frame(server, &red).await;
    mount_download(server, 7_000_002).await;
    mount_download(server, 7_000_003).await;
    mount_request_listing(server, 91, &[red.clone(), visual, blue]).await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/{REFERENCE_ID}/")))
        .query(&[("color", "true")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.kind, "unauthorized");
    assert_eq!(app.renderer.calls(), 0);
    assert_eq!(app.workspace_entries(), 0);

    let authorized = reqwest::Client::new()
        .get(app.url(&format!("/{REFERENCE_ID}/")))
        .query(&[("color", "true")])
        .header("Authorization", "Token secret")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(authorized.status(), StatusCode::OK);
    assert_eq!(app.renderer.calls(), 1);
}
