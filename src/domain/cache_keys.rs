use std::fmt;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::ids::FrameId;
use crate::domain::requests::RenderOptions;

/// Bumped whenever the key material changes shape, so old artifacts are not reused.
const KEY_FORMAT_VERSION: u32 = 1;
const DIGEST_BYTES: usize = 20;

/// Pre-signed URLs for artifacts are valid this long.
pub const ARTIFACT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Storage key of a rendered thumbnail: `<frame id>.<digest>.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct KeyMaterial<'a> {
    version: u32,
    frames: Vec<FrameId>,
    width: u32,
    height: u32,
    label: Option<&'a str>,
    color: bool,
    median: bool,
    percentile: f64,
    quality: u8,
}

impl CacheKey {
    /// Derive the key for rendering `sources` with `options`.
    ///
    /// `reference` is the frame the caller asked for; `sources` are all frames
    /// feeding the render (just the reference for grayscale). The order of
    /// `sources` does not matter.
    pub fn derive(reference: FrameId, sources: &[FrameId], options: &RenderOptions) -> Self {
        let mut frames = sources.to_vec();
        frames.sort_unstable();
        frames.dedup();

        let material = KeyMaterial {
            version: KEY_FORMAT_VERSION,
            frames,
            width: options.width,
            height: options.height,
            label: options.label.as_deref(),
            color: options.color,
            median: options.median,
            percentile: options.percentile,
            quality: options.quality,
        };

        // Serializing a plain struct of numbers, bools and strings cannot fail.
        let encoded = serde_json::to_vec(&material).unwrap_or_default();
        let digest = Sha256::digest(&encoded);

        Self(format!(
            "{reference}.{}.jpg",
            hex::encode(&digest[..DIGEST_BYTES])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rendered thumbnail held by the artifact cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailArtifact {
    pub key: CacheKey,
    pub ttl: Duration,
    /// This request rendered the artifact rather than finding it cached.
    pub generated: bool,
}

impl ThumbnailArtifact {
    pub fn cached(key: CacheKey) -> Self {
        Self {
            key,
            ttl: ARTIFACT_TTL,
            generated: false,
        }
    }

    pub fn generated(key: CacheKey) -> Self {
        Self {
            key,
            ttl: ARTIFACT_TTL,
            generated: true,
        }
    }
}
