pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, ThumbnailStrategy};
pub use error::{AppError, ErrorMetadata, LogLevel};
