pub mod archive;
pub mod client;
pub mod render;
pub mod storage;
pub mod workspace;
