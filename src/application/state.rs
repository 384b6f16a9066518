use std::sync::Arc;

use crate::application::services::{
    BandSelector, FrameResolver, GenerationPipeline, PipelineParts, ThumbnailService,
};
use crate::domain::bands::BandPolicy;
use crate::domain::frames::FramePolicy;
use crate::domain::repositories::{ArtifactCache, FrameArchive, ThumbnailRenderer};
use crate::infrastructure::workspace::WorkspaceFactory;

/// The collaborators that differ between production and tests. Services are
/// wired from these automatically.
pub struct AppStateConfig {
    pub archive: Arc<dyn FrameArchive>,
    pub cache: Arc<dyn ArtifactCache>,
    pub renderer: Arc<dyn ThumbnailRenderer>,
    pub workspaces: WorkspaceFactory,
    pub frame_policy: FramePolicy,
    pub band_policy: BandPolicy,
    pub render_concurrency: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub thumbnail_service: ThumbnailService,
}

impl AppState {
    pub fn new(config: AppStateConfig) -> Self {
        let resolver = FrameResolver::new(Arc::clone(&config.archive), config.frame_policy);
        let bands = BandSelector::new(Arc::clone(&config.archive), config.band_policy);

        let pipeline = GenerationPipeline::new(PipelineParts {
            archive: config.archive,
            resolver,
            bands,
            cache: config.cache,
            renderer: config.renderer,
            workspaces: config.workspaces,
            render_concurrency: config.render_concurrency,
        });

        Self {
            thumbnail_service: ThumbnailService::new(Arc::new(pipeline)),
        }
    }
}
