//! Application wiring: components, routes and server lifecycle.

pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;
use vodserve_core::Config;
use vodserve_db::{PgVideoRepository, VideoRepository};
use vodserve_processing::{AssetPublisher, FfmpegTranscoder, IngestionOrchestrator};
use vodserve_storage::StagingStore;

use crate::state::AppState;

/// Connect the database, build the pipeline components and the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let pool = vodserve_db::connect(&config.database_url, config.db_max_connections).await?;
    let repository: Arc<dyn VideoRepository> = Arc::new(PgVideoRepository::new(pool));

    tokio::fs::create_dir_all(&config.media_root).await?;

    let staging = StagingStore::new(
        &config.staging_dir,
        config.max_upload_bytes,
        config.video_allowed_content_types.clone(),
    )
    .await?;

    let transcoder = Arc::new(FfmpegTranscoder::new(
        &config.ffmpeg_path,
        config.hls_segment_duration,
        config.thumbnail_width,
        config.thumbnail_height,
        config.thumbnail_strategy,
    ));

    let orchestrator = IngestionOrchestrator::new(
        staging,
        transcoder,
        AssetPublisher::new(&config.public_base_url),
        repository.clone(),
        &config.media_root,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
        repository,
    });

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
