use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::cache_keys::CacheKey;
use crate::domain::errors::{ArchiveError, CacheError, RenderError};
use crate::domain::frames::FrameMetadata;
use crate::domain::ids::{FrameId, ObservationRequestId};
use crate::domain::requests::RenderOptions;

/// Read access to the frame archive. `authorization` is forwarded verbatim.
#[async_trait]
pub trait FrameArchive: Send + Sync {
    async fn get(
        &self,
        id: FrameId,
        authorization: Option<&str>,
    ) -> Result<FrameMetadata, ArchiveError>;

    /// All frames whose basename matches exactly.
    async fn find_by_basename(
        &self,
        basename: &str,
        authorization: Option<&str>,
    ) -> Result<Vec<FrameMetadata>, ArchiveError>;

    /// Frames observed for the same request at the given reduction level.
    async fn list_for_request(
        &self,
        request_id: ObservationRequestId,
        reduction_level: i32,
        authorization: Option<&str>,
    ) -> Result<Vec<FrameMetadata>, ArchiveError>;

    /// Download the frame's raw data to `destination`.
    async fn download(&self, frame: &FrameMetadata, destination: &Path)
    -> Result<(), ArchiveError>;
}

/// Durable, content-addressed store of rendered thumbnails.
#[async_trait]
pub trait ArtifactCache: Send + Sync {
    async fn has(&self, key: &CacheKey) -> Result<bool, CacheError>;
    async fn put(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<(), CacheError>;
    /// An expiring URL from which the artifact can be downloaded directly.
    async fn issue_url(&self, key: &CacheKey, ttl: Duration) -> Result<String, CacheError>;
    async fn read_bytes(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError>;
}

/// Turns raw science frames into a raster thumbnail.
#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    /// Render `inputs` (one path for grayscale, one per band for color) into `output`.
    async fn render(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        options: &RenderOptions,
    ) -> Result<(), RenderError>;
}
