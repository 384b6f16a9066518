use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use image::ImageFormat;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::application::services::bands::BandSelector;
use crate::application::services::resolver::FrameResolver;
use crate::domain::cache_keys::{CacheKey, ThumbnailArtifact};
use crate::domain::errors::ThumbnailError;
use crate::domain::frames::FrameMetadata;
use crate::domain::ids::FrameId;
use crate::domain::repositories::{ArtifactCache, FrameArchive, ThumbnailRenderer};
use crate::domain::requests::{RenderOptions, ThumbnailRequest};
use crate::infrastructure::workspace::{Workspace, WorkspaceFactory};

/// Where a pipeline run currently is. A failure is reported together with
/// the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    KeyDerived,
    CacheCheck,
    Downloading,
    Rendering,
    Persisting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::KeyDerived => "key-derived",
            Stage::CacheCheck => "cache-check",
            Stage::Downloading => "downloading",
            Stage::Rendering => "rendering",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub frame: FrameMetadata,
    pub artifact: ThumbnailArtifact,
}

/// Collaborators the pipeline is built from.
pub struct PipelineParts {
    pub archive: Arc<dyn FrameArchive>,
    pub resolver: FrameResolver,
    pub bands: BandSelector,
    pub cache: Arc<dyn ArtifactCache>,
    pub renderer: Arc<dyn ThumbnailRenderer>,
    pub workspaces: WorkspaceFactory,
    pub render_concurrency: usize,
}

/// Produces (or finds) the cached artifact for a thumbnail request.
///
/// Concurrent requests for the same uncached key may both render and upload.
/// Artifacts are content-addressed, so the second upload writes equivalent
/// bytes over the first and the only cost is the duplicated work.
pub struct GenerationPipeline {
    archive: Arc<dyn FrameArchive>,
    resolver: FrameResolver,
    bands: BandSelector,
    cache: Arc<dyn ArtifactCache>,
    renderer: Arc<dyn ThumbnailRenderer>,
    workspaces: WorkspaceFactory,
    render_permits: Semaphore,
}

impl GenerationPipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            archive: parts.archive,
            resolver: parts.resolver,
            bands: parts.bands,
            cache: parts.cache,
            renderer: parts.renderer,
            workspaces: parts.workspaces,
            render_permits: Semaphore::new(parts.render_concurrency.max(1)),
        }
    }

    pub fn cache(&self) -> &Arc<dyn ArtifactCache> {
        &self.cache
    }

    #[tracing::instrument(skip_all, fields(frame = ?request.selector(), color = request.is_color()))]
    pub async fn run(&self, request: &ThumbnailRequest) -> Result<PipelineOutput, ThumbnailError> {
        let mut stage = Stage::Resolving;
        let result = self.run_stages(request, &mut stage).await;
        if let Err(err) = &result {
            warn!(%stage, kind = err.kind(), error = %err, "thumbnail pipeline failed");
        }
        result
    }

    async fn run_stages(
        &self,
        request: &ThumbnailRequest,
        stage: &mut Stage,
    ) -> Result<PipelineOutput, ThumbnailError> {
        let authorization = request.authorization();

        let frame = self
            .resolver
            .resolve(request.selector(), authorization)
            .await?;
        self.resolver.validate(&frame, request.is_color())?;

        let sources = if request.is_color() {
            let selected = self.bands.select(&frame, authorization).await?;
            for companion in selected.iter().filter(|f| f.id != frame.id) {
                self.resolver.validate_companion(companion, authorization)?;
            }
            selected
        } else {
            vec![frame.clone()]
        };

        let source_ids: Vec<FrameId> = sources.iter().map(|f| f.id).collect();
        let key = CacheKey::derive(frame.id, &source_ids, request.options());
        advance(stage, Stage::KeyDerived, &key);

        advance(stage, Stage::CacheCheck, &key);
        if self.cache.has(&key).await? {
            info!(%key, "thumbnail cache hit");
            advance(stage, Stage::Done, &key);
            return Ok(PipelineOutput {
                frame,
                artifact: ThumbnailArtifact::cached(key),
            });
        }
        info!(%key, "thumbnail cache miss");

        let workspace = self.workspaces.acquire()?;
        let generated = self
            .generate(&workspace, &key, &sources, request.options(), stage)
            .await;
        if let Err(err) = workspace.release() {
            warn!(%key, error = %err, "failed to remove workspace");
        }
        generated?;

        advance(stage, Stage::Done, &key);
        Ok(PipelineOutput {
            frame,
            artifact: ThumbnailArtifact::generated(key),
        })
    }

    async fn generate(
        &self,
        workspace: &Workspace,
        key: &CacheKey,
        sources: &[FrameMetadata],
        options: &RenderOptions,
        stage: &mut Stage,
    ) -> Result<(), ThumbnailError> {
        advance(stage, Stage::Downloading, key);
        let inputs: Vec<PathBuf> = sources
            .iter()
            .enumerate()
            .map(|(index, frame)| {
                let name = if frame.filename.is_empty() {
                    &frame.basename
                } else {
                    &frame.filename
                };
                workspace.file(&format!("{index}-{name}"))
            })
            .collect();

        futures::future::try_join_all(
            sources
                .iter()
                .zip(&inputs)
                .map(|(frame, path)| self.archive.download(frame, path)),
        )
        .await?;

        advance(stage, Stage::Rendering, key);
        let output = workspace.file(key.as_str());
        {
            let _permit = self
                .render_permits
                .acquire()
                .await
                .map_err(|_| ThumbnailError::render_failure("renderer is shutting down"))?;
            let started = Instant::now();
            self.renderer.render(&inputs, &output, options).await?;
            info!(%key, elapsed_ms = started.elapsed().as_millis(), "rendered thumbnail");
        }

        let bytes = tokio::fs::read(&output).await.map_err(|e| {
            ThumbnailError::render_failure(format!("renderer produced no output: {e}"))
        })?;
        let bytes = verify_jpeg(bytes).await?;

        advance(stage, Stage::Persisting, key);
        self.cache.put(key, bytes).await?;
        Ok(())
    }
}

fn advance(stage: &mut Stage, next: Stage, key: &CacheKey) {
    debug!(from = %stage, to = %next, %key, "pipeline stage");
    *stage = next;
}

/// Make sure the renderer produced a readable JPEG before it is cached.
async fn verify_jpeg(bytes: Vec<u8>) -> Result<Vec<u8>, ThumbnailError> {
    if bytes.is_empty() {
        return Err(ThumbnailError::render_failure(
            "renderer produced an empty file",
        ));
    }

    tokio::task::spawn_blocking(move || {
        let reader = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| ThumbnailError::render_failure(format!("unreadable output: {e}")))?;
        if reader.format() != Some(ImageFormat::Jpeg) {
            return Err(ThumbnailError::render_failure(
                "renderer output is not a JPEG",
            ));
        }
        reader
            .into_dimensions()
            .map_err(|e| ThumbnailError::render_failure(format!("corrupt output image: {e}")))?;
        Ok(bytes)
    })
    .await
    .map_err(|e| ThumbnailError::render_failure(format!("output check panicked: {e}")))?
}
