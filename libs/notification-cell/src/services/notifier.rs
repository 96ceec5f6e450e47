use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Notification, NotificationError};
use crate::services::store::NotificationStore;

/// Fire-and-forget notification collaborator. Callers on a booking path
/// spawn these calls; a delivery failure never rolls a booking back.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        category: &str,
    ) -> Result<(), NotificationError>;
}

/// Notifier that records notifications in the portal's notification store,
/// where the presentation layer picks them up.
pub struct StoreNotifier {
    store: Arc<dyn NotificationStore>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        body: &str,
        category: &str,
    ) -> Result<(), NotificationError> {
        let notification = Notification::new(user_id, title, body, category);
        self.store.insert(notification).await?;
        debug!("Notification stored for user {}", user_id);
        Ok(())
    }
}
