//! Shared application state

use std::sync::Arc;

use vodserve_core::Config;
use vodserve_db::VideoRepository;
use vodserve_processing::IngestionOrchestrator;

pub struct AppState {
    pub config: Config,
    pub orchestrator: IngestionOrchestrator,
    pub repository: Arc<dyn VideoRepository>,
}
