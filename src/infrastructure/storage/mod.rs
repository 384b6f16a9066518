pub mod filesystem;
pub mod s3;
mod sigv4;

pub use filesystem::FilesystemArtifactCache;
pub use s3::{AddressingStyle, S3ArtifactCache, S3Config};
