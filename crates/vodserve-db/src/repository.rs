use async_trait::async_trait;
use uuid::Uuid;
use vodserve_core::models::VideoRecord;
use vodserve_core::AppError;

/// Metadata store consumed by the ingestion pipeline and the read endpoints.
///
/// `find_all` takes limit/offset so pagination can be exposed later without
/// changing the trait. Records are create-once; there is no update or delete.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Persist a record for a freshly published asset. Called exactly once
    /// per successful ingestion.
    async fn create(&self, record: &VideoRecord) -> Result<VideoRecord, AppError>;

    /// All records in reverse creation order.
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<VideoRecord>, AppError>;

    /// Single record lookup. `Ok(None)` is the normal absent case, not a
    /// failure.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError>;
}
