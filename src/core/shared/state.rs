use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::store::HelpdeskStore;
use crate::directory::DirectoryService;
use crate::tickets::TicketEngine;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn HelpdeskStore>,
    pub tickets: TicketEngine,
    pub directory: DirectoryService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn HelpdeskStore>) -> Self {
        Self {
            tickets: TicketEngine::new(Arc::clone(&store)),
            directory: DirectoryService::new(Arc::clone(&store)),
            config,
            store,
        }
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self::new(self.config.clone(), Arc::clone(&self.store))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &"Arc<dyn HelpdeskStore>")
            .finish()
    }
}
