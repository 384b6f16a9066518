use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::application::errors::ApiError;
use crate::application::services::ThumbnailResponse;
use crate::application::state::AppState;
use crate::domain::errors::ThumbnailError;
use crate::domain::requests::{FrameSelector, ThumbnailParams, ThumbnailRequest};

/// Raw query string values. Everything is parsed by hand so that a bad value
/// produces our own error body instead of axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ThumbnailQuery {
    width: Option<String>,
    height: Option<String>,
    label: Option<String>,
    image: Option<String>,
    color: Option<String>,
    median: Option<String>,
    percentile: Option<String>,
    quality: Option<String>,
}

impl ThumbnailQuery {
    fn into_params(
        self,
        selector: FrameSelector,
        authorization: Option<String>,
    ) -> Result<ThumbnailParams, ThumbnailError> {
        Ok(ThumbnailParams {
            width: parse_number("width", self.width.as_deref())?,
            height: parse_number("height", self.height.as_deref())?,
            label: self.label,
            inline: is_truthy(self.image.as_deref()),
            color: is_true(self.color.as_deref()),
            median: is_true(self.median.as_deref()),
            percentile: parse_number("percentile", self.percentile.as_deref())?,
            quality: parse_number("quality", self.quality.as_deref())?,
            authorization,
            ..ThumbnailParams::for_selector(selector)
        })
    }
}

fn parse_number<T: FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>, ThumbnailError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            ThumbnailError::invalid_request(format!("{name} must be a number, got {raw:?}"))
        }),
    }
}

/// `image` accepts any value except an empty one, `false` or `0`.
fn is_truthy(value: Option<&str>) -> bool {
    value
        .map(str::trim)
        .is_some_and(|v| !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false")))
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

pub(crate) async fn get_thumbnail(
    State(state): State<AppState>,
    Path(frame): Path<String>,
    query: Result<Query<ThumbnailQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(query) = query
        .map_err(|rejection| ThumbnailError::invalid_request(rejection.body_text()))?;

    let authorization = headers
        .get(header::AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map(ToString::to_string)
                .map_err(|_| ThumbnailError::invalid_request("authorization header is not valid text"))
        })
        .transpose()?;

    let selector = FrameSelector::from_path_segment(&frame)?;
    let request = ThumbnailRequest::new(query.into_params(selector, authorization)?)?;

    let response = match state.thumbnail_service.handle(&request).await? {
        ThumbnailResponse::Url(link) => Json(link).into_response(),
        ThumbnailResponse::Image {
            bytes,
            content_type,
        } => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
    };
    Ok(response)
}
