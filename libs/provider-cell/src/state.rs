use std::sync::Arc;

use shared_config::AppConfig;

use crate::services::ProviderDirectory;

#[derive(Clone)]
pub struct ProviderState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn ProviderDirectory>,
}

impl ProviderState {
    pub fn new(config: Arc<AppConfig>, directory: Arc<dyn ProviderDirectory>) -> Self {
        Self { config, directory }
    }
}
