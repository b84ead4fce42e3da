//! In-memory [`VideoRepository`] for tests and database-free development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;
use vodserve_core::models::VideoRecord;
use vodserve_core::AppError;

use crate::repository::VideoRepository;

#[derive(Default)]
pub struct InMemoryVideoRepository {
    records: Mutex<Vec<VideoRecord>>,
    fail_creates: AtomicBool,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create` calls fail, to exercise the
    /// persistence-failure path of the pipeline.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("repository lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create(&self, record: &VideoRecord) -> Result<VideoRecord, AppError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }

        let mut records = self.records.lock().expect("repository lock");
        if records.iter().any(|r| r.id == record.id) {
            return Err(AppError::Internal(format!(
                "Duplicate record id: {}",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(record.clone())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<VideoRecord>, AppError> {
        let records = self.records.lock().expect("repository lock");
        let mut all: Vec<VideoRecord> = records.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        let records = self.records.lock().expect("repository lock");
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}
