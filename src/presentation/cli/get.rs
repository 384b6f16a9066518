use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{RenderArgs, print_json};
use crate::domain::requests::FrameSelector;
use crate::infrastructure::client::ThumbnailClient;

#[derive(Debug, Args)]
pub struct GetCommand {
    /// Frame id or basename
    pub frame: String,

    #[arg(long, env = "THUMBSERVICE_URL", default_value = "http://localhost:8080")]
    pub service_url: String,

    /// Archive API token, needed for proprietary frames
    #[arg(long, env = "THUMBSERVICE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Write the image here instead of printing a link
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub render: RenderArgs,
}

pub async fn run(command: GetCommand) -> Result<()> {
    let selector = FrameSelector::from_path_segment(&command.frame)?;
    let request = command.render.into_request(selector)?;
    let client = ThumbnailClient::from_base_url(&command.service_url, command.token)?;

    match command.output {
        Some(path) => {
            let bytes = client.image(command.frame.trim(), request.options()).await?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
            Ok(())
        }
        None => {
            let link = client.link(command.frame.trim(), request.options()).await?;
            print_json(&link)
        }
    }
}
