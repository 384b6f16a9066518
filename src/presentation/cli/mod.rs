pub mod get;
pub mod key;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use get::GetCommand;
use key::KeyCommand;

use crate::application::{ServerConfig, StorageConfig};
use crate::domain::requests::{
    DEFAULT_DIMENSION, DEFAULT_PERCENTILE, DEFAULT_QUALITY, FrameSelector, ThumbnailParams,
    ThumbnailRequest,
};
use crate::infrastructure::archive::DEFAULT_ARCHIVE_API_URL;
use crate::infrastructure::render::DEFAULT_RENDER_COMMAND;
use crate::infrastructure::storage::{AddressingStyle, S3Config};

#[derive(Debug, Parser)]
#[command(author, version, about = "Serve thumbnails of archived observatory frames", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Request a thumbnail from a running service
    Get(GetCommand),

    /// Print the cache key a thumbnail would be stored under
    Key(KeyCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    S3,
    Filesystem,
}

#[derive(Debug, Args)]
pub struct ServeCommand {
    #[arg(long, env = "THUMBSERVICE_BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    pub bind_address: SocketAddr,

    #[arg(long, env = "THUMBSERVICE_ARCHIVE_API_URL", default_value = DEFAULT_ARCHIVE_API_URL)]
    pub archive_api_url: String,

    /// Directory for per-request workspaces (defaults to the system temp dir)
    #[arg(long, env = "THUMBSERVICE_TMP_DIR")]
    pub tmp_dir: Option<PathBuf>,

    #[arg(long, env = "THUMBSERVICE_RENDER_COMMAND", default_value = DEFAULT_RENDER_COMMAND)]
    pub render_command: String,

    /// Maximum number of renders running at once
    #[arg(long, env = "THUMBSERVICE_RENDER_CONCURRENCY", default_value_t = 4)]
    pub render_concurrency: usize,

    /// Bands a color thumbnail needs before it is rendered (1 to 3)
    #[arg(long, env = "THUMBSERVICE_MIN_COLOR_BANDS", default_value_t = 3,
          value_parser = clap::value_parser!(u8).range(1..=3))]
    pub min_color_bands: u8,

    #[arg(long, env = "THUMBSERVICE_STORAGE_BACKEND", value_enum, default_value_t = StorageBackend::S3)]
    pub storage_backend: StorageBackend,

    #[arg(
        long,
        env = "THUMBSERVICE_STORAGE_URL",
        default_value = "https://s3.us-west-2.amazonaws.com"
    )]
    pub storage_url: String,

    #[arg(long, env = "AWS_BUCKET")]
    pub bucket: Option<String>,

    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "us-west-2")]
    pub region: String,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "THUMBSERVICE_ADDRESSING_STYLE", value_enum, default_value_t = AddressingStyle::Virtual)]
    pub addressing_style: AddressingStyle,

    /// Artifact directory for the filesystem backend
    #[arg(long, env = "THUMBSERVICE_STORAGE_DIR", default_value = "thumbnails")]
    pub storage_dir: PathBuf,

    /// Public URL the filesystem backend's directory is served under
    #[arg(long, env = "THUMBSERVICE_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,
}

impl ServeCommand {
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let storage = match self.storage_backend {
            StorageBackend::S3 => {
                let Some(bucket) = self.bucket else {
                    bail!("--bucket (AWS_BUCKET) is required for S3 storage");
                };
                let (Some(access_key_id), Some(secret_access_key)) =
                    (self.access_key_id, self.secret_access_key)
                else {
                    bail!("S3 storage needs both AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY");
                };
                StorageConfig::S3(S3Config {
                    endpoint: self.storage_url,
                    bucket,
                    region: self.region,
                    access_key_id,
                    secret_access_key,
                    addressing_style: self.addressing_style,
                })
            }
            StorageBackend::Filesystem => {
                let public_base_url = self
                    .public_base_url
                    .as_deref()
                    .map(|url| {
                        Url::parse(url).with_context(|| format!("invalid public base url: {url}"))
                    })
                    .transpose()?;
                StorageConfig::Filesystem {
                    root: self.storage_dir,
                    public_base_url,
                }
            }
        };

        Ok(ServerConfig {
            bind_address: self.bind_address,
            archive_api_url: self.archive_api_url,
            tmp_dir: self.tmp_dir,
            render_command: self.render_command,
            render_concurrency: self.render_concurrency,
            min_color_bands: usize::from(self.min_color_bands),
            storage,
        })
    }
}

/// Rendering options shared by the client-side commands.
#[derive(Debug, Args)]
pub struct RenderArgs {
    #[arg(long, default_value_t = DEFAULT_DIMENSION)]
    pub width: i64,
    #[arg(long, default_value_t = DEFAULT_DIMENSION)]
    pub height: i64,
    #[arg(long)]
    pub label: Option<String>,
    /// Compose a color image from the red, visual and blue exposures
    #[arg(long)]
    pub color: bool,
    #[arg(long)]
    pub median: bool,
    #[arg(long, default_value_t = DEFAULT_PERCENTILE)]
    pub percentile: f64,
    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    pub quality: i64,
}

impl RenderArgs {
    /// Validate the options the same way the server does.
    pub fn into_request(self, selector: FrameSelector) -> anyhow::Result<ThumbnailRequest> {
        let params = ThumbnailParams {
            width: Some(self.width),
            height: Some(self.height),
            label: self.label,
            color: self.color,
            median: self.median,
            percentile: Some(self.percentile),
            quality: Some(self.quality),
            ..ThumbnailParams::for_selector(selector)
        };
        ThumbnailRequest::new(params).context("invalid thumbnail options")
    }
}

pub(crate) fn print_json<T>(value: &T) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
