use std::fmt;

use crate::domain::errors::ThumbnailError;
use crate::domain::frames::FrameMetadata;

/// A color channel of a composite thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Red,
    Visual,
    Blue,
}

impl Band {
    /// Composition order expected by the renderer.
    pub const ALL: [Band; 3] = [Band::Red, Band::Visual, Band::Blue];

    /// Filters that may stand in for this band.
    pub fn filters(self) -> &'static [&'static str] {
        match self {
            Band::Red => &["R", "rp"],
            Band::Visual => &["V"],
            Band::Blue => &["B"],
        }
    }

    pub fn accepts(self, filter: &str) -> bool {
        self.filters().contains(&filter)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Red => "red",
            Band::Visual => "visual",
            Band::Blue => "blue",
        };
        f.write_str(name)
    }
}

/// How many bands a color composite needs before it is rendered.
#[derive(Debug, Clone, Copy)]
pub struct BandPolicy {
    pub min_bands: usize,
}

impl Default for BandPolicy {
    fn default() -> Self {
        Self {
            min_bands: Band::ALL.len(),
        }
    }
}

/// Pick one exposure per band from `candidates`, all at the reference frame's
/// reduction level.
///
/// The reference frame wins its own band; otherwise the lowest frame id is
/// taken so the choice does not depend on archive ordering. Returns frames in
/// [`Band::ALL`] order.
pub fn select_bands(
    reference: &FrameMetadata,
    candidates: &[FrameMetadata],
    policy: BandPolicy,
) -> Result<Vec<FrameMetadata>, ThumbnailError> {
    let mut selected = Vec::with_capacity(Band::ALL.len());
    let mut missing = Vec::new();

    for band in Band::ALL {
        let eligible = std::iter::once(reference)
            .chain(candidates.iter())
            .filter(|f| f.request_id == reference.request_id)
            .filter(|f| f.reduction_level == reference.reduction_level)
            .filter(|f| band.accepts(&f.filter));

        let chosen = eligible.min_by_key(|f| (f.id != reference.id, f.id));

        match chosen {
            Some(frame) => selected.push(frame.clone()),
            None => missing.push(band),
        }
    }

    let required = policy.min_bands.clamp(1, Band::ALL.len());
    if selected.len() < required {
        let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
        return Err(ThumbnailError::incomplete_color_set(format!(
            "no {} frames at reduction level {} for request {}",
            missing.join("/"),
            reference.reduction_level,
            reference
                .request_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
        )));
    }

    Ok(selected)
}
