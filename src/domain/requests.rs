use crate::domain::errors::ThumbnailError;
use crate::domain::ids::FrameId;

pub const DEFAULT_DIMENSION: i64 = 200;
/// Largest width or height a caller may ask for, in pixels.
pub const MAX_DIMENSION: i64 = 5000;
pub const DEFAULT_QUALITY: i64 = 80;
pub const DEFAULT_PERCENTILE: f64 = 99.5;

/// How the caller identified the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelector {
    Id(FrameId),
    Basename(String),
}

impl FrameSelector {
    /// Interpret a path segment: all digits is a frame id, anything else a basename.
    pub fn from_path_segment(segment: &str) -> Result<Self, ThumbnailError> {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(ThumbnailError::invalid_request(
                "a frame id or basename is required",
            ));
        }

        if segment.bytes().all(|b| b.is_ascii_digit()) {
            return segment
                .parse::<FrameId>()
                .map(Self::Id)
                .map_err(|_| ThumbnailError::invalid_request("frame id is out of range"));
        }

        Ok(Self::Basename(segment.to_string()))
    }
}

/// Parameters handed to the renderer. Everything in here changes the
/// rendered pixels and therefore participates in the cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub label: Option<String>,
    pub color: bool,
    pub median: bool,
    pub percentile: f64,
    pub quality: u8,
}

/// Unvalidated request parameters, as collected at the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailParams {
    pub frame_id: Option<FrameId>,
    pub basename: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub label: Option<String>,
    pub inline: bool,
    pub color: bool,
    pub median: bool,
    pub percentile: Option<f64>,
    pub quality: Option<i64>,
    pub authorization: Option<String>,
}

impl ThumbnailParams {
    pub fn for_selector(selector: FrameSelector) -> Self {
        match selector {
            FrameSelector::Id(id) => Self {
                frame_id: Some(id),
                ..Self::default()
            },
            FrameSelector::Basename(basename) => Self {
                basename: Some(basename),
                ..Self::default()
            },
        }
    }
}

/// A fully validated thumbnail request.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    selector: FrameSelector,
    options: RenderOptions,
    inline: bool,
    authorization: Option<String>,
}

impl ThumbnailRequest {
    pub fn new(params: ThumbnailParams) -> Result<Self, ThumbnailError> {
        let basename = params
            .basename
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        let selector = match (params.frame_id, basename) {
            (Some(id), None) => FrameSelector::Id(id),
            (None, Some(basename)) => FrameSelector::Basename(basename),
            (Some(_), Some(_)) => {
                return Err(ThumbnailError::invalid_request(
                    "provide either a frame id or a basename, not both",
                ));
            }
            (None, None) => {
                return Err(ThumbnailError::invalid_request(
                    "a frame id or basename is required",
                ));
            }
        };

        let width = dimension("width", params.width)?;
        let height = dimension("height", params.height)?;

        let quality = params.quality.unwrap_or(DEFAULT_QUALITY);
        let quality = u8::try_from(quality)
            .ok()
            .filter(|q| (1..=100).contains(q))
            .ok_or_else(|| {
                ThumbnailError::invalid_request("quality must be between 1 and 100")
            })?;

        let percentile = params.percentile.unwrap_or(DEFAULT_PERCENTILE);
        if !percentile.is_finite() || percentile <= 0.0 || percentile > 100.0 {
            return Err(ThumbnailError::invalid_request(
                "percentile must be greater than 0 and at most 100",
            ));
        }

        let label = params
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let authorization = params.authorization.filter(|a| !a.trim().is_empty());

        Ok(Self {
            selector,
            options: RenderOptions {
                width,
                height,
                label,
                color: params.color,
                median: params.median,
                percentile,
                quality,
            },
            inline: params.inline,
            authorization,
        })
    }

    pub fn selector(&self) -> &FrameSelector {
        &self.selector
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn is_color(&self) -> bool {
        self.options.color
    }

    /// Whether the caller wants the image bytes rather than a URL.
    pub fn wants_inline(&self) -> bool {
        self.inline
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }
}

fn dimension(name: &str, value: Option<i64>) -> Result<u32, ThumbnailError> {
    let value = value.unwrap_or(DEFAULT_DIMENSION);
    if value <= 0 || value > MAX_DIMENSION {
        return Err(ThumbnailError::invalid_request(format!(
            "{name} must be between 1 and {MAX_DIMENSION}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| ThumbnailError::invalid_request(format!("{name} is out of range")))
}
