use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::ThumbnailError;
use crate::domain::frames::{FrameMetadata, FramePolicy};
use crate::domain::ids::FrameId;
use crate::domain::repositories::FrameArchive;
use crate::domain::requests::FrameSelector;

/// Turns what the caller asked for into archive frame metadata.
#[derive(Clone)]
pub struct FrameResolver {
    archive: Arc<dyn FrameArchive>,
    policy: Arc<FramePolicy>,
}

impl FrameResolver {
    pub fn new(archive: Arc<dyn FrameArchive>, policy: FramePolicy) -> Self {
        Self {
            archive,
            policy: Arc::new(policy),
        }
    }

    pub async fn resolve(
        &self,
        selector: &FrameSelector,
        authorization: Option<&str>,
    ) -> Result<FrameMetadata, ThumbnailError> {
        match selector {
            FrameSelector::Id(id) => self.fetch_metadata(*id, authorization).await,
            FrameSelector::Basename(basename) => {
                self.lookup_basename(basename, authorization).await
            }
        }
    }

    pub async fn resolve_by_basename(
        &self,
        basename: &str,
        authorization: Option<&str>,
    ) -> Result<FrameId, ThumbnailError> {
        self.lookup_basename(basename, authorization)
            .await
            .map(|frame| frame.id)
    }

    pub async fn fetch_metadata(
        &self,
        id: FrameId,
        authorization: Option<&str>,
    ) -> Result<FrameMetadata, ThumbnailError> {
        let frame = self.archive.get(id, authorization).await?;
        check_access(&frame, authorization)?;
        Ok(frame)
    }

    /// Reject frames that cannot be thumbnailed, before any work is started.
    pub fn validate(&self, frame: &FrameMetadata, color: bool) -> Result<(), ThumbnailError> {
        frame.validate_for_thumbnail(color, &self.policy)
    }

    /// Companion exposures come from a request listing rather than a direct
    /// lookup, so they get the access and thumbnail checks here.
    pub fn validate_companion(
        &self,
        frame: &FrameMetadata,
        authorization: Option<&str>,
    ) -> Result<(), ThumbnailError> {
        check_access(frame, authorization)?;
        self.validate(frame, true)
    }

    // The basename listing already carries full metadata, so no second lookup.
    async fn lookup_basename(
        &self,
        basename: &str,
        authorization: Option<&str>,
    ) -> Result<FrameMetadata, ThumbnailError> {
        let mut frames = self
            .archive
            .find_by_basename(basename, authorization)
            .await?;

        if frames.len() != 1 {
            debug!(basename, matches = frames.len(), "basename did not resolve to one frame");
            return Err(ThumbnailError::NotFound(format!(
                "no unique frame with basename {basename}"
            )));
        }

        let frame = frames.remove(0);
        check_access(&frame, authorization)?;
        Ok(frame)
    }
}

fn check_access(frame: &FrameMetadata, authorization: Option<&str>) -> Result<(), ThumbnailError> {
    if frame.proprietary && authorization.is_none() {
        return Err(ThumbnailError::Unauthorized(format!(
            "frame {} is proprietary; an Authorization header is required",
            frame.id
        )));
    }
    Ok(())
}
