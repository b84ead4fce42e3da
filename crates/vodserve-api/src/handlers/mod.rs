pub mod upload;
pub mod videos;

pub use upload::upload_video;
pub use videos::{get_video, list_videos};
