use reqwest::StatusCode;
use serde_json::{Value, json};
use thumbservice::application::errors::ErrorResponse;
use thumbservice::application::services::ThumbnailLink;
use thumbservice::domain::cache_keys::CacheKey;
use thumbservice::domain::ids::FrameId;
use thumbservice::domain::requests::RenderOptions;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{
    PROPOSAL_ID, PUBLIC_FRAME_ID, frame_json, mount_download, mount_frame, spawn_app, tiny_jpeg,
};

const STARS_QUERY: [(&str, &str); 3] = [
    ("width", "500"),
    ("height", "500"),
    ("label", "So many stars"),
];

#[tokio::test]
async fn public_frame_returns_url_then_hits_cache() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, PUBLIC_FRAME_ID, "rp", 91);
    mount_frame(&app.mock_server, &frame).await;

    let client = reqwest::Client::new();
    let first = client
        .get(app.url(&format!("/{PUBLIC_FRAME_ID}/")))
        .query(&STARS_QUERY)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(first.status(), StatusCode::OK);
    let first: ThumbnailLink = first.json().await.expect("Failed to parse response");

    assert!(first.url.starts_with(&format!("https://thumbnails.test/{PUBLIC_FRAME_ID}.")));
    assert!(first.url.contains(".jpg?expires=604800"));
    assert_eq!(first.proposal_id.as_deref(), Some(PROPOSAL_ID));
    assert_eq!(app.renderer.calls(), 1);
    assert_eq!(app.cache.keys().len(), 1);

    let second: ThumbnailLink = client
        .get(app.url(&format!("/{PUBLIC_FRAME_ID}/")))
        .query(&STARS_QUERY)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(second, first);
    assert_eq!(app.renderer.calls(), 1, "cached thumbnails are never rendered again");
    assert_eq!(app.workspace_entries(), 0);
}

#[tokio::test]
async fn image_flag_returns_jpeg_bytes() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, PUBLIC_FRAME_ID, "rp", 91);
    mount_frame(&app.mock_server, &frame).await;

    let response = reqwest::Client::new()
        .get(app.url(&format!("/{PUBLIC_FRAME_ID}/")))
        .query(&STARS_QUERY)
        .query(&[("image", "true")])
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/jpeg"
    );
    let bytes = response.bytes().await.unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8], "body starts with a JPEG marker");
}

#[tokio::test]
async fn precomputed_artifact_skips_download_and_render() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, PUBLIC_FRAME_ID, "rp", 91);
    Mock::given(method("GET"))
        .and(path(format!("/frames/{PUBLIC_FRAME_ID}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&frame))
        .mount(&app.mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{PUBLIC_FRAME_ID}.fits.fz")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.mock_server)
        .await;

    let id = FrameId::new(PUBLIC_FRAME_ID);
    let key = CacheKey::derive(
        id,
        &[id],
        &RenderOptions {
            width: 200,
            height: 200,
            label: None,
            color: false,
            median: false,
            percentile: 99.5,
            quality: 80,
        },
    );
    app.cache.insert(&key, tiny_jpeg(8, 8));

    let link: ThumbnailLink = reqwest::Client::new()
        .get(app.url(&format!("/{PUBLIC_FRAME_ID}")))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse response");

    assert!(link.url.contains(key.as_str()));
    assert_eq!(app.renderer.calls(), 0);
}

#[tokio::test]
async fn proprietary_frame_without_authorization_is_unauthorized() {
    let app = spawn_app().await;
    let mut frame = frame_json(&app.mock_server, 4_000_001, "V", 91);
    frame["public_date"] = json!("2999-01-01T00:00:00Z");
    mount_frame(&app.mock_server, &frame).await;

    let response = reqwest::Client::new()
        .get(app.url("/4000001/"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.kind, "unauthorized");
    assert_eq!(app.renderer.calls(), 0);
}

#[tokio::test]
async fn authorization_is_forwarded_to_the_archive() {
    let app = spawn_app().await;
    let mut frame = frame_json(&app.mock_server, 4_000_002, "V", 91);
    frame["public_date"] = json!("2999-01-01T00:00:00Z");

    Mock::given(method("GET"))
        .and(path("/frames/4000002/"))
        .and(header("authorization", "Token abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&frame))
        .expect(1)
        .mount(&app.mock_server)
        .await;
    mount_download(&app.mock_server, 4_000_002).await;

    let response = reqwest::Client::new()
        .get(app.url("/4000002/"))
        .header("Authorization", "Token abc123")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.renderer.calls(), 1);
}

#[tokio::test]
async fn basename_resolves_to_a_single_frame() {
    let app = spawn_app().await;
    let frame = frame_json(&app.mock_server, 5_000_001, "B", 91);
    let basename = frame["basename"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/frames/"))
        .and(query_param("basename_exact", basename.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"count": 1, "results": [frame]})),
        )
        .expect(1)
        .mount(&app.mock_server)
        .await;
    mount_download(&app.mock_server, 5_000_001).await;

    let link: ThumbnailLink = reqwest::Client::new()
        .get(app.url(&format!("/{basename}/")))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse response");

    assert!(link.url.contains("/5000001."));
}

#[tokio::test]
async fn ambiguous_basename_is_not_found() {
    let app = spawn_app().await;
    let a = frame_json(&app.mock_server, 5_000_002, "B", 91);
    let b = frame_json(&app.mock_server, 5_000_003, "B", 91);

    Mock::given(method("GET"))
        .and(path("/frames/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"count": 2, "results": [a, b]})),
        )
        .mount(&app.mock_server)
        .await;

    let response = reqwest::Client::new()
        .get(app.url("/some-basename/"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.kind, "not_found");
}

#[tokio::test]
async fn archive_failures_map_to_distinct_statuses() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/frames/404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/frames/500/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.mock_server)
        .await;

    let client = reqwest::Client::new();
    let missing = client.get(app.url("/404/")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let broken = client.get(app.url("/500/")).send().await.unwrap();
    assert_eq!(broken.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = broken.json().await.unwrap();
    assert_eq!(body.kind, "archive_unavailable");
}

#[tokio::test]
async fn unsupported_frames_are_unprocessable() {
    let app = spawn_app().await;
    let mut catalog = frame_json(&app.mock_server, 6_000_001, "rp", 91);
    catalog["filename"] = Value::from("ogg0m406-kb27-20200101-6000001-e91-cat.txt");
    mount_frame(&app.mock_server, &catalog).await;

    let mut unknown_type = frame_json(&app.mock_server, 6_000_002, "rp", 91);
    unknown_type["configuration_type"] = Value::from("SPECTRUM");
    mount_frame(&app.mock_server, &unknown_type).await;

    let client = reqwest::Client::new();
    for id in [6_000_001, 6_000_002] {
        let response = client.get(app.url(&format!("/{id}/"))).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "frame {id}");
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.kind, "invalid_frame");
    }
    assert_eq!(app.renderer.calls(), 0);
    assert_eq!(app.workspace_entries(), 0);
}
