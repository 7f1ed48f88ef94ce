use crate::core::config::{load_search_config, SearchConfig};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    /// File-based config loaded from `scout-search.json` (env-var fallback for all fields).
    pub config: Arc<SearchConfig>,
}

impl AppState {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn from_environment() -> Self {
        Self::new(load_search_config())
    }
}
