//! Publish verification: prove a transcoded asset is actually playable
//! before a metadata record ever points at it.

use std::path::Path;

use tokio::fs;
use uuid::Uuid;
use vodserve_core::AppError;

use crate::transcode::TranscodeOutput;

/// Public URLs for a published asset, derived from the verified filesystem
/// layout. These are the only strings that reach the metadata record.
#[derive(Debug, Clone)]
pub struct PublicLocations {
    pub video_path: String,
    pub thumbnail_path: String,
}

/// Verifies transcode output on disk and maps it to public URLs.
///
/// Verification reads the playlist and checks that every referenced segment
/// exists and is non-empty, so a record is never created for an asset a
/// player would fail to fetch. On failure the output directory is left in
/// place for inspection; the orchestrator owns the cleanup policy.
#[derive(Clone)]
pub struct AssetPublisher {
    public_base_url: String,
}

impl AssetPublisher {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        let mut public_base_url = public_base_url.into();
        while public_base_url.ends_with('/') {
            public_base_url.pop();
        }
        Self { public_base_url }
    }

    #[tracing::instrument(skip(self, output), fields(asset_id = %asset_id))]
    pub async fn publish(
        &self,
        asset_id: Uuid,
        output: &TranscodeOutput,
    ) -> Result<PublicLocations, AppError> {
        let playlist = fs::read_to_string(&output.playlist_path)
            .await
            .map_err(|e| {
                AppError::IncompleteOutput(format!(
                    "playlist {} is unreadable: {}",
                    output.playlist_path.display(),
                    e
                ))
            })?;

        let segments = segment_names(&playlist)?;
        if segments.is_empty() {
            return Err(AppError::IncompleteOutput(format!(
                "playlist {} references no segments",
                output.playlist_path.display()
            )));
        }

        for segment in &segments {
            require_nonempty(&output.dir.join(segment), "segment").await?;
        }
        require_nonempty(&output.thumbnail_path, "thumbnail").await?;

        let playlist_name = file_name(&output.playlist_path)?;
        let thumbnail_name = file_name(&output.thumbnail_path)?;

        tracing::info!(
            segments = segments.len(),
            "Asset verified and published"
        );

        Ok(PublicLocations {
            video_path: self.asset_url(asset_id, &playlist_name),
            thumbnail_path: self.asset_url(asset_id, &thumbnail_name),
        })
    }

    fn asset_url(&self, asset_id: Uuid, file: &str) -> String {
        format!(
            "{}/uploads/videos/{}/{}",
            self.public_base_url, asset_id, file
        )
    }
}

/// Media lines from an HLS playlist: every non-empty line that is not a
/// `#EXT` tag. Lines that escape the asset directory are rejected outright
/// rather than resolved.
fn segment_names(playlist: &str) -> Result<Vec<String>, AppError> {
    let mut segments = Vec::new();
    for line in playlist.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.contains("..") || line.starts_with('/') || line.contains('\\') {
            return Err(AppError::IncompleteOutput(format!(
                "playlist references a path outside the asset directory: {}",
                line
            )));
        }
        segments.push(line.to_string());
    }
    Ok(segments)
}

async fn require_nonempty(path: &Path, kind: &str) -> Result<(), AppError> {
    let meta = fs::metadata(path).await.map_err(|_| {
        AppError::IncompleteOutput(format!("{} {} is missing", kind, path.display()))
    })?;
    if meta.len() == 0 {
        return Err(AppError::IncompleteOutput(format!(
            "{} {} is empty",
            kind,
            path.display()
        )));
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String, AppError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            AppError::IncompleteOutput(format!("output path {} has no file name", path.display()))
        })
}
