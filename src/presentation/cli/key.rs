use anyhow::Result;
use clap::Args;

use super::RenderArgs;
use crate::domain::cache_keys::CacheKey;
use crate::domain::ids::FrameId;
use crate::domain::requests::FrameSelector;

#[derive(Debug, Args)]
pub struct KeyCommand {
    /// Frame id the thumbnail is requested for
    pub frame_id: FrameId,

    /// Ids of the band exposures a color thumbnail is composed from
    #[arg(long = "band-frame", value_delimiter = ',')]
    pub band_frames: Vec<FrameId>,

    #[command(flatten)]
    pub render: RenderArgs,
}

pub fn run(command: KeyCommand) -> Result<()> {
    println!("{}", derive_key(command)?);
    Ok(())
}

fn derive_key(command: KeyCommand) -> Result<CacheKey> {
    let request = command
        .render
        .into_request(FrameSelector::Id(command.frame_id))?;

    let sources = if command.band_frames.is_empty() {
        vec![command.frame_id]
    } else {
        command.band_frames
    };
    Ok(CacheKey::derive(command.frame_id, &sources, request.options()))
}
