use std::sync::Arc;

use crate::{config::AppConfig, store::DynStore};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: DynStore, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
