use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect};

const FAVICON_URL: &str = "https://cdn.lco.global/mainstyle/img/favicon.ico";

pub(crate) async fn favicon() -> Redirect {
    Redirect::temporary(FAVICON_URL)
}

pub(crate) async fn robots() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "User-agent: *\nDisallow: /\n",
    )
}

/// Served for `/` and anything no other route matches.
pub(crate) async fn index() -> Html<&'static str> {
    Html(
        "Please see the documentation for the thumbnail service at \
         <a href=\"https://developers.lco.global\">developers.lco.global</a>",
    )
}
