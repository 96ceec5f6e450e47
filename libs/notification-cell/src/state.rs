use std::sync::Arc;

use shared_config::AppConfig;

use crate::services::NotificationStore;

#[derive(Clone)]
pub struct NotificationState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn NotificationStore>,
}

impl NotificationState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn NotificationStore>) -> Self {
        Self { config, store }
    }
}
