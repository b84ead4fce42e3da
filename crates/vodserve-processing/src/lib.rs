//! The ingestion-and-transcode pipeline: stage, transcode to HLS, verify and
//! publish, record metadata.

mod ingest;
mod publish;
mod transcode;

pub use ingest::IngestionOrchestrator;
pub use publish::{AssetPublisher, PublicLocations};
pub use transcode::{FfmpegTranscoder, TranscodeError, TranscodeOutput, Transcoder};
