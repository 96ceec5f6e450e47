use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::PostgrestClient;

use crate::models::{Notification, NotificationError};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError>;

    /// Most recent first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError>;

    /// Marks read only when the notification belongs to `user_id`.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, NotificationError>;

    /// Deletes read notifications created before `cutoff`. Unread ones
    /// stay regardless of age. Returns how many rows were removed.
    async fn purge_read_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, NotificationError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

#[derive(Default)]
pub struct MemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError> {
        let mut notifications = self.notifications.write().expect("notification store poisoned");
        notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        let notifications = self.notifications.read().expect("notification store poisoned");
        let mut mine: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, NotificationError> {
        let mut notifications = self.notifications.write().expect("notification store poisoned");
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(NotificationError::NotFound)?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn purge_read_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, NotificationError> {
        let mut notifications = self.notifications.write().expect("notification store poisoned");
        let before = notifications.len();
        notifications.retain(|n| !n.is_read || n.created_at >= cutoff);
        Ok(before - notifications.len())
    }
}

// ==============================================================================
// POSTGREST-BACKED STORE
// ==============================================================================

pub struct PostgrestNotificationStore {
    client: Arc<PostgrestClient>,
}

impl PostgrestNotificationStore {
    pub fn new(client: Arc<PostgrestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationStore for PostgrestNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<Notification, NotificationError> {
        debug!("Persisting notification {} for user {}", notification.id, notification.user_id);

        let body = serde_json::to_value(&notification)
            .map_err(|e| NotificationError::Store(e.to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .client
            .request_with_headers(Method::POST, "/rest/v1/notifications", Some(body), Some(headers))
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| NotificationError::Store("Failed to create notification".to_string()))?;
        serde_json::from_value(row)
            .map_err(|e| NotificationError::Store(format!("Failed to parse notification: {}", e)))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?user_id=eq.{}&order=created_at.desc",
            user_id
        );
        let result: Vec<Value> = self.client.request(Method::GET, &path, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row))
            .collect::<Result<Vec<Notification>, _>>()
            .map_err(|e| NotificationError::Store(format!("Failed to parse notifications: {}", e)))
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, NotificationError> {
        let path = format!(
            "/rest/v1/notifications?id=eq.{}&user_id=eq.{}",
            id, user_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ "is_read": true })),
                Some(headers),
            )
            .await?;

        let row = result.into_iter().next().ok_or(NotificationError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| NotificationError::Store(format!("Failed to parse notification: {}", e)))
    }

    async fn purge_read_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, NotificationError> {
        let cutoff_str = cutoff.to_rfc3339();
        let path = format!(
            "/rest/v1/notifications?is_read=eq.true&created_at=lt.{}",
            urlencoding::encode(&cutoff_str)
        );

        // Representation is requested so the deleted rows come back and
        // can be counted.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .client
            .request_with_headers(Method::DELETE, &path, None, Some(headers))
            .await?;

        debug!("Purged {} read notifications older than {}", result.len(), cutoff);
        Ok(result.len())
    }
}
