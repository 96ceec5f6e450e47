use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// In-portal notification row. Category is one of the portal's
/// notification types: "appointment", "payment", "system", "message".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, title: &str, body: &str, category: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            category: category.to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<shared_database::DbError> for NotificationError {
    fn from(e: shared_database::DbError) -> Self {
        NotificationError::Store(e.to_string())
    }
}
