use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Placeholder used when the uploader supplies no description.
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// One persisted record per published asset.
///
/// A record exists if and only if the asset's transcode output was
/// successfully published; the id doubles as the asset's directory name and
/// URL component. Records are created once and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Public URL of the HLS playlist manifest.
    pub video_path: String,
    /// Public URL of the representative thumbnail.
    pub thumbnail_path: String,
    pub created_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        description: Option<String>,
        video_path: impl Into<String>,
        thumbnail_path: impl Into<String>,
    ) -> Self {
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        VideoRecord {
            id,
            title: title.into(),
            description,
            video_path: video_path.into(),
            thumbnail_path: thumbnail_path.into(),
            created_at: Utc::now(),
        }
    }
}
