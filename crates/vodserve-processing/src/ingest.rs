//! The end-to-end ingestion pipeline.
//!
//! One upload flows stage -> transcode -> publish -> record. The staged
//! input is deleted as soon as the transcoder has resolved, whatever the
//! outcome. Transcode failures remove the partial output directory;
//! publish and persistence failures keep it on disk for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio::fs;
use uuid::Uuid;
use vodserve_core::models::VideoRecord;
use vodserve_core::AppError;
use vodserve_db::VideoRepository;
use vodserve_storage::{StagedFile, StagingStore};

use crate::publish::AssetPublisher;
use crate::transcode::Transcoder;

const VIDEOS_SUBDIR: &str = "videos";

/// Owns one upload from raw stream to metadata record.
pub struct IngestionOrchestrator {
    staging: StagingStore,
    transcoder: Arc<dyn Transcoder>,
    publisher: AssetPublisher,
    repository: Arc<dyn VideoRepository>,
    media_root: PathBuf,
}

impl IngestionOrchestrator {
    pub fn new(
        staging: StagingStore,
        transcoder: Arc<dyn Transcoder>,
        publisher: AssetPublisher,
        repository: Arc<dyn VideoRepository>,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            staging,
            transcoder,
            publisher,
            repository,
            media_root: media_root.into(),
        }
    }

    /// The staging store, for callers that stage before they have the full
    /// request (multipart fields arrive in client order).
    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Full pipeline from a raw byte stream.
    pub async fn ingest<S, E>(
        &self,
        stream: S,
        declared_mime: &str,
        declared_filename: &str,
        description: Option<String>,
    ) -> Result<VideoRecord, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let staged = self
            .staging
            .stage(stream, declared_mime, declared_filename)
            .await?;
        self.ingest_staged(staged, description).await
    }

    /// Pipeline from an already-staged input. Consumes the staged file: it
    /// is removed once the transcoder has resolved, success or not.
    #[tracing::instrument(
        skip(self, staged, description),
        fields(
            asset_id = tracing::field::Empty,
            original_filename = %staged.original_filename,
            size_bytes = staged.size_bytes,
        )
    )]
    pub async fn ingest_staged(
        &self,
        staged: StagedFile,
        description: Option<String>,
    ) -> Result<VideoRecord, AppError> {
        let asset_id = Uuid::new_v4();
        tracing::Span::current().record("asset_id", tracing::field::display(asset_id));

        let output_dir = self
            .media_root
            .join(VIDEOS_SUBDIR)
            .join(asset_id.to_string());

        let transcode_result = self.transcoder.transcode(&staged.path, &output_dir).await;

        // The raw input has served its purpose either way.
        if let Err(e) = staged.remove().await {
            tracing::warn!(
                path = %staged.path.display(),
                error = %e,
                "Failed to remove staged input"
            );
        }

        let output = match transcode_result {
            Ok(output) => output,
            Err(e) => {
                remove_dir_best_effort(&output_dir).await;
                return Err(e.into());
            }
        };

        let locations = match self.publisher.publish(asset_id, &output).await {
            Ok(locations) => locations,
            Err(e) => {
                // Output stays on disk for inspection.
                tracing::error!(
                    output_dir = %output_dir.display(),
                    error = %e,
                    "Publish verification failed; output retained"
                );
                return Err(e);
            }
        };

        let record = VideoRecord::new(
            asset_id,
            staged.original_filename.clone(),
            description,
            locations.video_path,
            locations.thumbnail_path,
        );

        match self.repository.create(&record).await {
            Ok(record) => {
                tracing::info!("Video ingested");
                Ok(record)
            }
            Err(e) => {
                // Playable files without a record: an orphan to reconcile,
                // not something to delete.
                tracing::error!(
                    output_dir = %output_dir.display(),
                    error = %e,
                    "Failed to record published asset; files retained as orphan"
                );
                Err(e)
            }
        }
    }
}

async fn remove_dir_best_effort(dir: &Path) {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "Failed to remove partial transcode output"
            );
        }
    }
}
