use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::domain::errors::ThumbnailError;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

/// A [`ThumbnailError`] on its way out of an HTTP handler.
#[derive(Debug)]
pub struct ApiError(ThumbnailError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }

    pub fn into_inner(self) -> ThumbnailError {
        self.0
    }
}

impl From<ThumbnailError> for ApiError {
    fn from(err: ThumbnailError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &ThumbnailError) -> StatusCode {
    match err {
        ThumbnailError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ThumbnailError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ThumbnailError::NotFound(_) => StatusCode::NOT_FOUND,
        ThumbnailError::IncompleteColorSet(_) => StatusCode::CONFLICT,
        ThumbnailError::InvalidFrame(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ThumbnailError::RenderFailure(_) | ThumbnailError::StorageError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ThumbnailError::ArchiveUnavailable(_) => StatusCode::BAD_GATEWAY,
        ThumbnailError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ThumbnailError::ArchiveTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            info!(%status, kind = self.0.kind(), error = %self.0, "request rejected");
        }

        let body = ErrorResponse {
            kind: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
