use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Notification, NotificationError};
use crate::state::NotificationState;

fn map_notification_error(e: NotificationError) -> AppError {
    match e {
        NotificationError::NotFound => AppError::NotFound("Notification not found".to_string()),
        NotificationError::Store(msg) => AppError::Database(msg),
    }
}

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user identity".to_string()))
}

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<NotificationState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_uuid(&user)?;
    let notifications = state
        .store
        .list_for_user(user_id)
        .await
        .map_err(map_notification_error)?;

    let unread = notifications.iter().filter(|n| !n.is_read).count();
    Ok(Json(json!({
        "notifications": notifications,
        "unread_count": unread,
    })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<NotificationState>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let user_id = caller_uuid(&user)?;
    let notification = state
        .store
        .mark_read(notification_id, user_id)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(notification))
}
