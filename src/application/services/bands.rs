use std::sync::Arc;

use tracing::debug;

use crate::domain::bands::{BandPolicy, select_bands};
use crate::domain::errors::ThumbnailError;
use crate::domain::frames::FrameMetadata;
use crate::domain::repositories::FrameArchive;

/// Finds the companion exposures a color thumbnail is composed from.
#[derive(Clone)]
pub struct BandSelector {
    archive: Arc<dyn FrameArchive>,
    policy: BandPolicy,
}

impl BandSelector {
    pub fn new(archive: Arc<dyn FrameArchive>, policy: BandPolicy) -> Self {
        Self { archive, policy }
    }

    pub async fn select(
        &self,
        reference: &FrameMetadata,
        authorization: Option<&str>,
    ) -> Result<Vec<FrameMetadata>, ThumbnailError> {
        let Some(request_id) = reference.request_id else {
            return Err(ThumbnailError::invalid_frame(
                "color thumbnails need a frame that belongs to a request",
            ));
        };

        let siblings = self
            .archive
            .list_for_request(request_id, reference.reduction_level, authorization)
            .await?;

        let selected = select_bands(reference, &siblings, self.policy)?;
        debug!(
            frame.id = %reference.id,
            request.id = %request_id,
            candidates = siblings.len(),
            selected = ?selected.iter().map(|f| f.id.into_inner()).collect::<Vec<_>>(),
            "selected color bands"
        );
        Ok(selected)
    }
}
