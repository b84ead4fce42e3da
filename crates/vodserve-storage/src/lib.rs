//! Durable staging of raw uploads before transcoding.

mod staging;

pub use staging::{StagedFile, StagingStore};
