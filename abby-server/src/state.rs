use std::sync::Arc;

use abby_core::cache::ConfigCache;
use abby_core::events::EventPipeline;
use abby_core::quota::QuotaEnforcer;

/// Shared handles, constructed once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ConfigCache>,
    pub pipeline: Arc<EventPipeline>,
    pub quota: Arc<QuotaEnforcer>,
}
