mod video;

pub use video::{VideoRecord, DEFAULT_DESCRIPTION};
