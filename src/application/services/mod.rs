pub mod bands;
pub mod pipeline;
pub mod resolver;
pub mod thumbnails;

pub use bands::BandSelector;
pub use pipeline::{GenerationPipeline, PipelineOutput, PipelineParts, Stage};
pub use resolver::FrameResolver;
pub use thumbnails::{ThumbnailLink, ThumbnailResponse, ThumbnailService};
