use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::SchedulingError;
use crate::models::{
    Booking, BookingQuery, BookingStatus, CancelBookingRequest, ReserveRequest, SlotListResponse,
};
use crate::state::SchedulingState;

const DEFAULT_HORIZON_DAYS: u32 = 7;
const DEFAULT_SLOT_LIMIT: usize = 20;
const DEFAULT_UPCOMING_HOURS: i64 = 48;

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::Conflict => {
            AppError::Conflict("This slot was just taken; pick another".to_string())
        }
        SchedulingError::ProviderNotFound => AppError::NotFound("Provider not found".to_string()),
        SchedulingError::BookingNotFound => AppError::NotFound("Booking not found".to_string()),
        SchedulingError::InvalidSlot(msg) => AppError::BadRequest(msg),
        SchedulingError::InvalidTransition { from, to } => AppError::BadRequest(format!(
            "Booking cannot move from {} to {}",
            from, to
        )),
        SchedulingError::NoShowTooEarly => AppError::BadRequest(
            "Cannot mark no-show before the scheduled start".to_string(),
        ),
        SchedulingError::Persistence(msg) => AppError::Database(msg),
    }
}

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user identity".to_string()))
}

/// True when the caller is the requester, the provider behind the booking
/// or an administrator.
async fn is_participant(
    state: &SchedulingState,
    user: &User,
    booking: &Booking,
) -> bool {
    if user.is_admin() || booking.is_requester(&user.id) {
        return true;
    }
    match state.providers.get(booking.provider_id).await {
        Ok(provider) => provider.user_id.to_string() == user.id,
        Err(_) => false,
    }
}

/// True when the caller may act on the provider side of the booking.
async fn is_provider_side(
    state: &SchedulingState,
    user: &User,
    booking: &Booking,
) -> bool {
    if user.is_admin() {
        return true;
    }
    match state.providers.get(booking.provider_id).await {
        Ok(provider) => provider.user_id.to_string() == user.id,
        Err(_) => false,
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub provider_id: Uuid,
    pub horizon_days: Option<u32>,
    pub limit: Option<usize>,
}

#[axum::debug_handler]
pub async fn list_open_slots(
    State(state): State<Arc<SchedulingState>>,
    Extension(_user): Extension<User>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotListResponse>, AppError> {
    let provider = state
        .providers
        .get_active(query.provider_id)
        .await
        .map_err(|_| AppError::NotFound("Provider not found".to_string()))?;

    let horizon = query.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS);
    let limit = query.limit.unwrap_or(DEFAULT_SLOT_LIMIT);

    let slots = state
        .slot_generator()
        .generate_slots(&provider, horizon, Utc::now())
        .await
        .map_err(map_scheduling_error)?
        .take(limit)
        .collect();

    Ok(Json(SlotListResponse {
        provider_id: provider.id,
        slots,
    }))
}

// ==============================================================================
// RESERVATION
// ==============================================================================

#[axum::debug_handler]
pub async fn reserve_booking(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<ReserveRequest>,
) -> Result<Json<Booking>, AppError> {
    let caller = caller_uuid(&user)?;

    // Staff can book on behalf of a patient; everyone else books for
    // themselves.
    let requester = match request.requester_id {
        Some(other) if other != caller => {
            if !user.is_staff() {
                return Err(AppError::Forbidden(
                    "Only staff can book on behalf of another patient".to_string(),
                ));
            }
            other
        }
        _ => caller,
    };

    let booking = state
        .arbiter()
        .reserve(request, requester)
        .await
        .map_err(map_scheduling_error)?;

    info!("Booking {} created by {}", booking.id, user.id);
    Ok(Json(booking))
}

// ==============================================================================
// QUERIES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub provider_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub from: Option<chrono::DateTime<Utc>>,
    pub to: Option<chrono::DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[axum::debug_handler]
pub async fn search_bookings(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;

    // Patients only ever see their own bookings.
    let requester_id = if user.is_staff() {
        query.requester_id
    } else {
        Some(caller)
    };

    let bookings = state
        .store
        .search(BookingQuery {
            provider_id: query.provider_id,
            requester_id,
            status: query.status,
            from: query.from,
            to: query.to,
            active_only: false,
            limit: query.limit,
            offset: query.offset,
        })
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    let count = bookings.len();
    Ok(Json(json!({
        "bookings": bookings,
        "count": count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub hours_ahead: Option<i64>,
}

#[axum::debug_handler]
pub async fn upcoming_bookings(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = caller_uuid(&user)?;
    let now = Utc::now();
    let hours = query.hours_ahead.unwrap_or(DEFAULT_UPCOMING_HOURS);

    let bookings = state
        .store
        .search(BookingQuery {
            requester_id: Some(caller),
            from: Some(now),
            to: Some(now + Duration::hours(hours)),
            active_only: true,
            ..Default::default()
        })
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    let mut upcoming = bookings;
    // Soonest first for an agenda view.
    upcoming.sort_by_key(|b| b.start_time);

    let count = upcoming.len();
    Ok(Json(json!({
        "bookings": upcoming,
        "count": count,
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .store
        .get(booking_id)
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    if !is_participant(&state, &user, &booking).await {
        return Err(AppError::Forbidden(
            "Not a participant in this booking".to_string(),
        ));
    }

    Ok(Json(booking))
}

// ==============================================================================
// LIFECYCLE TRANSITIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn confirm_booking(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .store
        .get(booking_id)
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    if !is_provider_side(&state, &user, &booking).await {
        return Err(AppError::Forbidden(
            "Only the provider can confirm a booking".to_string(),
        ));
    }

    let updated = state
        .transitions()
        .confirm(booking_id)
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .store
        .get(booking_id)
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    if !is_participant(&state, &user, &booking).await {
        return Err(AppError::Forbidden(
            "Not a participant in this booking".to_string(),
        ));
    }

    let updated = state
        .transitions()
        .cancel(booking_id, &request.reason, request.cancelled_by)
        .await
        .map_err(map_scheduling_error)?;

    info!("Booking {} cancelled by {}", booking_id, user.id);
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn complete_booking(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .store
        .get(booking_id)
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    if !is_provider_side(&state, &user, &booking).await {
        return Err(AppError::Forbidden(
            "Only the provider can complete a booking".to_string(),
        ));
    }

    let updated = state
        .transitions()
        .complete(booking_id)
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .store
        .get(booking_id)
        .await
        .map_err(|e| map_scheduling_error(e.into()))?;

    if !is_provider_side(&state, &user, &booking).await {
        return Err(AppError::Forbidden(
            "Only the provider can mark a no-show".to_string(),
        ));
    }

    let updated = state
        .transitions()
        .mark_no_show(booking_id, Utc::now())
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(updated))
}
