pub mod bands;
pub mod cache_keys;
pub mod errors;
pub mod frames;
pub mod ids;
pub mod repositories;
pub mod requests;

// Re-exports
pub use errors::ThumbnailError;
