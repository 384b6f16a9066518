use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use url::Url;

use crate::application::routes::app_router;
use crate::application::state::{AppState, AppStateConfig};
use crate::domain::bands::BandPolicy;
use crate::domain::frames::FramePolicy;
use crate::domain::repositories::ArtifactCache;
use crate::infrastructure::archive::HttpFrameArchive;
use crate::infrastructure::render::CommandRenderer;
use crate::infrastructure::storage::{FilesystemArtifactCache, S3ArtifactCache, S3Config};
use crate::infrastructure::workspace::WorkspaceFactory;

/// Where rendered thumbnails are kept.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    S3(S3Config),
    Filesystem {
        root: PathBuf,
        public_base_url: Option<Url>,
    },
}

impl StorageConfig {
    fn build(self) -> anyhow::Result<Arc<dyn ArtifactCache>> {
        let cache: Arc<dyn ArtifactCache> = match self {
            Self::S3(config) => {
                info!(
                    endpoint = %config.endpoint,
                    bucket = %config.bucket,
                    addressing = ?config.addressing_style,
                    "using S3 artifact storage"
                );
                Arc::new(S3ArtifactCache::new(config).context("invalid S3 storage configuration")?)
            }
            Self::Filesystem {
                root,
                public_base_url,
            } => {
                std::fs::create_dir_all(&root).with_context(|| {
                    format!("failed to create storage directory {}", root.display())
                })?;
                info!(root = %root.display(), "using filesystem artifact storage");
                Arc::new(FilesystemArtifactCache::new(root, public_base_url))
            }
        };
        Ok(cache)
    }
}

pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub archive_api_url: String,
    pub tmp_dir: Option<PathBuf>,
    pub render_command: String,
    pub render_concurrency: usize,
    pub min_color_bands: usize,
    pub storage: StorageConfig,
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let archive = Arc::new(
        HttpFrameArchive::new(&config.archive_api_url)
            .context("failed to configure archive client")?,
    );
    let cache = config.storage.build()?;
    let renderer = Arc::new(CommandRenderer::new(&config.render_command));

    let workspaces = match &config.tmp_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| {
                format!("failed to create temporary directory {}", dir.display())
            })?;
            WorkspaceFactory::new(dir)
        }
        None => WorkspaceFactory::system(),
    };

    let state = AppState::new(AppStateConfig {
        archive,
        cache,
        renderer,
        workspaces,
        frame_policy: FramePolicy::default(),
        band_policy: BandPolicy {
            min_bands: config.min_color_bands,
        },
        render_concurrency: config.render_concurrency,
    });

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_address))?;

    let app = app_router(state);

    info!(
        address = %config.bind_address,
        archive = %config.archive_api_url,
        renderer = %config.render_command,
        render_concurrency = config.render_concurrency,
        "starting HTTP server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    info!("server shutdown complete");

    Ok(())
}

#[allow(clippy::expect_used)] // Startup: panicking is appropriate if signal handlers fail
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
