use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateProviderRequest, Provider, ProviderError, UpdateScheduleRequest};
use crate::state::ProviderState;

fn map_provider_error(e: ProviderError) -> AppError {
    match e {
        ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
        ProviderError::InvalidSchedule(msg) => AppError::BadRequest(msg),
        ProviderError::Store(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<Arc<ProviderState>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let providers = state.directory.list_active().await.map_err(map_provider_error)?;

    Ok(Json(json!({
        "providers": providers,
    })))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(state): State<Arc<ProviderState>>,
    Extension(_user): Extension<User>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Provider>, AppError> {
    let provider = state.directory.get(provider_id).await.map_err(map_provider_error)?;
    Ok(Json(provider))
}

/// Register a new provider. Admin only.
#[axum::debug_handler]
pub async fn create_provider(
    State(state): State<Arc<ProviderState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<Json<Provider>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can register providers".to_string(),
        ));
    }

    let schedule = request.schedule.unwrap_or_default();
    schedule.validate().map_err(map_provider_error)?;

    let now = Utc::now();
    let provider = Provider {
        id: Uuid::new_v4(),
        user_id: request.user_id,
        display_name: request.display_name,
        specialty: request.specialty,
        is_active: true,
        schedule,
        created_at: now,
        updated_at: now,
    };

    let created = state.directory.create(provider).await.map_err(map_provider_error)?;

    info!("Provider {} registered by {}", created.id, user.id);
    Ok(Json(created))
}

/// Replace a provider's working-hours policy. Allowed for admins and for
/// the staff identity behind the provider.
#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<ProviderState>>,
    Extension(user): Extension<User>,
    Path(provider_id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Json<Provider>, AppError> {
    let provider = state.directory.get(provider_id).await.map_err(map_provider_error)?;

    let is_own = provider.user_id.to_string() == user.id;
    if !user.is_admin() && !is_own {
        return Err(AppError::Forbidden(
            "Not authorized to change this provider's schedule".to_string(),
        ));
    }

    let updated = state
        .directory
        .update_schedule(provider_id, request.schedule)
        .await
        .map_err(map_provider_error)?;

    info!("Schedule updated for provider {} by {}", provider_id, user.id);
    Ok(Json(updated))
}
