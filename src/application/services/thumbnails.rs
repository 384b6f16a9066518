use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::services::pipeline::GenerationPipeline;
use crate::domain::errors::ThumbnailError;
use crate::domain::requests::ThumbnailRequest;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Body returned when the caller wants a link rather than the image itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailLink {
    pub url: String,
    #[serde(rename = "propid")]
    pub proposal_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ThumbnailResponse {
    Url(ThumbnailLink),
    Image {
        bytes: Vec<u8>,
        content_type: &'static str,
    },
}

/// Runs the generation pipeline and shapes its result for the caller.
#[derive(Clone)]
pub struct ThumbnailService {
    pipeline: Arc<GenerationPipeline>,
}

impl ThumbnailService {
    pub fn new(pipeline: Arc<GenerationPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn handle(
        &self,
        request: &ThumbnailRequest,
    ) -> Result<ThumbnailResponse, ThumbnailError> {
        let output = self.pipeline.run(request).await?;
        let cache = self.pipeline.cache();
        let key = &output.artifact.key;

        if request.wants_inline() {
            let bytes = cache.read_bytes(key).await?;
            info!(%key, bytes = bytes.len(), generated = output.artifact.generated, "serving thumbnail bytes");
            return Ok(ThumbnailResponse::Image {
                bytes,
                content_type: JPEG_CONTENT_TYPE,
            });
        }

        let url = cache.issue_url(key, output.artifact.ttl).await?;
        info!(%key, generated = output.artifact.generated, "serving thumbnail url");
        Ok(ThumbnailResponse::Url(ThumbnailLink {
            url,
            proposal_id: output.frame.proposal_id,
        }))
    }
}
