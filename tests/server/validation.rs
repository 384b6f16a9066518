use reqwest::StatusCode;
use thumbservice::application::errors::ErrorResponse;
use wiremock::matchers::any;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::spawn_app;

#[tokio::test]
async fn invalid_parameters_never_reach_the_archive() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.mock_server)
        .await;

    let client = reqwest::Client::new();
    let cases: [&[(&str, &str)]; 7] = [
        &[("width", "0")],
        &[("height", "-20")],
        &[("width", "wide")],
        &[("width", "9000")],
        &[("quality", "101")],
        &[("percentile", "0")],
        &[("percentile", "lots")],
    ];

    for query in cases {
        let response = client
            .get(app.url("/3863274/"))
            .query(query)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query:?}");
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.kind, "invalid_request", "{query:?}");
    }

    assert_eq!(app.renderer.calls(), 0);
}

#[tokio::test]
async fn error_bodies_are_json() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(app.url("/42/?height=tall"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: ErrorResponse = response.json().await.unwrap();
    assert!(body.message.contains("height"), "{}", body.message);
}
