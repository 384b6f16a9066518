pub mod errors;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;

pub use server::{ServerConfig, StorageConfig, serve};
