use thiserror::Error;

/// Every way a thumbnail request can fail. Each variant maps to a distinct
/// caller-visible `kind` (see [`ThumbnailError::kind`]).
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("cannot generate thumbnail: {0}")]
    InvalidFrame(String),
    #[error("incomplete color set: {0}")]
    IncompleteColorSet(String),
    #[error("archive unavailable: {0}")]
    ArchiveUnavailable(String),
    #[error("timed out while accessing the archive: {0}")]
    ArchiveTimeout(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("render failed: {0}")]
    RenderFailure(String),
}

impl ThumbnailError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }

    pub fn incomplete_color_set(message: impl Into<String>) -> Self {
        Self::IncompleteColorSet(message.into())
    }

    pub fn render_failure(message: impl Into<String>) -> Self {
        Self::RenderFailure(message.into())
    }

    /// Stable machine-readable name for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidFrame(_) => "invalid_frame",
            Self::IncompleteColorSet(_) => "incomplete_color_set",
            Self::ArchiveUnavailable(_) => "archive_unavailable",
            Self::ArchiveTimeout(_) => "archive_timeout",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::StorageError(_) => "storage_error",
            Self::RenderFailure(_) => "render_failure",
        }
    }

    /// Whether the caller may reasonably retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable(_) | Self::ArchiveUnavailable(_) | Self::ArchiveTimeout(_)
        )
    }
}

/// Failures reported by the frame archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not found")]
    NotFound,
    #[error("archive rejected the credentials (status {0})")]
    Unauthorized(u16),
    #[error("timeout while accessing {0}")]
    Timeout(String),
    #[error("{0}")]
    Unavailable(String),
}

impl From<ArchiveError> for ThumbnailError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotFound => Self::NotFound("Not found".to_string()),
            ArchiveError::Unauthorized(_) => Self::Unauthorized(err.to_string()),
            ArchiveError::Timeout(url) => Self::ArchiveTimeout(url),
            ArchiveError::Unavailable(message) => Self::ArchiveUnavailable(message),
        }
    }
}

/// Failures reported by the artifact cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Transient: the backend could not be reached or asked us to back off.
    #[error("{0}")]
    Unavailable(String),
    /// Permanent: the backend refused the operation.
    #[error("{0}")]
    Rejected(String),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

impl From<CacheError> for ThumbnailError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable(message) => Self::StorageUnavailable(message),
            CacheError::Rejected(message) => Self::StorageError(message),
        }
    }
}

/// The external renderer did not produce a usable image.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl From<RenderError> for ThumbnailError {
    fn from(err: RenderError) -> Self {
        Self::RenderFailure(err.0)
    }
}
