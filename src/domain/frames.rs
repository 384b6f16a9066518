use serde::{Deserialize, Serialize};

use crate::domain::errors::ThumbnailError;
use crate::domain::ids::{FrameId, ObservationRequestId};

const FITS_EXTENSIONS: [&str; 2] = [".fits", ".fits.fz"];

/// Metadata for one archived frame, as returned by the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub id: FrameId,
    pub basename: String,
    pub filename: String,
    pub request_id: Option<ObservationRequestId>,
    /// Optical element in the light path, e.g. `rp` or `V`.
    pub filter: String,
    pub reduction_level: i32,
    /// Where the raw FITS data can be downloaded from.
    pub data_url: Option<String>,
    pub proposal_id: Option<String>,
    pub configuration_type: Option<String>,
    /// The frame is still within its proprietary period.
    pub proprietary: bool,
}

/// Which frames a thumbnail may be generated for.
#[derive(Debug, Clone)]
pub struct FramePolicy {
    pub configuration_types: Vec<String>,
    pub color_configuration_types: Vec<String>,
}

impl Default for FramePolicy {
    fn default() -> Self {
        let owned = |types: &[&str]| types.iter().map(ToString::to_string).collect();
        Self {
            configuration_types: owned(&[
                "ARC",
                "BIAS",
                "DARK",
                "EXPERIMENTAL",
                "EXPOSE",
                "GUIDE",
                "LAMPFLAT",
                "REPEAT_EXPOSE",
                "SKYFLAT",
                "STANDARD",
                "TRAILED",
            ]),
            color_configuration_types: owned(&["EXPOSE", "REPEAT_EXPOSE", "STANDARD"]),
        }
    }
}

impl FrameMetadata {
    pub fn is_fits(&self) -> bool {
        FITS_EXTENSIONS
            .iter()
            .any(|ext| self.filename.ends_with(ext))
    }

    /// Check the frame can be turned into a thumbnail before any work starts.
    pub fn validate_for_thumbnail(
        &self,
        color: bool,
        policy: &FramePolicy,
    ) -> Result<(), ThumbnailError> {
        if self.data_url.as_deref().is_none_or(str::is_empty) {
            return Err(ThumbnailError::invalid_frame(
                "frame has no downloadable data",
            ));
        }

        let Some(configuration_type) = self.configuration_type.as_deref() else {
            return Err(ThumbnailError::invalid_frame(
                "frame has no configuration type",
            ));
        };
        let configuration_type = configuration_type.to_uppercase();

        if !policy
            .configuration_types
            .iter()
            .any(|t| *t == configuration_type)
        {
            return Err(ThumbnailError::invalid_frame(format!(
                "unsupported configuration_type={configuration_type}"
            )));
        }

        if color && self.request_id.is_none() {
            return Err(ThumbnailError::invalid_frame(
                "color thumbnails need a frame that belongs to a request",
            ));
        }

        if color
            && !policy
                .color_configuration_types
                .iter()
                .any(|t| *t == configuration_type)
        {
            return Err(ThumbnailError::invalid_frame(format!(
                "color thumbnails are not supported for configuration_type={configuration_type}"
            )));
        }

        if !self.is_fits() {
            return Err(ThumbnailError::invalid_frame("frame is not a FITS file"));
        }

        Ok(())
    }
}
