use reqwest::StatusCode;
use reqwest::redirect::Policy;

use crate::helpers::spawn_app;

#[tokio::test]
async fn favicon_redirects_to_the_observatory_cdn() {
    let app = spawn_app().await;
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    let response = client
        .get(app.url("/favicon.ico"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers()["location"],
        "https://cdn.lco.global/mainstyle/img/favicon.ico"
    );
}

#[tokio::test]
async fn robots_disallows_everything() {
    let app = spawn_app().await;

    let response = reqwest::get(app.url("/robots.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Disallow: /"));
}

#[tokio::test]
async fn unknown_paths_point_at_the_documentation() {
    let app = spawn_app().await;

    for path in ["/", "/a/b/c"] {
        let response = reqwest::get(app.url(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let body = response.text().await.unwrap();
        assert!(body.contains("developers.lco.global"), "{path}");
    }
}

#[tokio::test]
async fn responses_allow_cross_origin_use() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(app.url("/robots.txt"))
        .header("Origin", "https://observe.example")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}
