use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{DbError, PostgrestClient};

use crate::models::{Booking, BookingQuery, BookingStatus};
use crate::store::{BookingStore, NewBooking, StoreError};

/// Booking store over a PostgREST-dialect REST endpoint.
///
/// Slot uniqueness is enforced by a partial unique index on the bookings
/// table: `UNIQUE (provider_id, start_time) WHERE status IN ('scheduled',
/// 'confirmed')`. The store maps the resulting HTTP 409 to
/// `StoreError::DuplicateActiveSlot`, which keeps the check-and-insert a
/// single atomic unit on the database side.
pub struct PostgrestBookingStore {
    client: Arc<PostgrestClient>,
}

impl PostgrestBookingStore {
    pub fn new(client: Arc<PostgrestClient>) -> Self {
        Self { client }
    }

    pub fn into_shared(self) -> Arc<dyn BookingStore> {
        Arc::new(self)
    }

    fn map_db_error(e: DbError) -> StoreError {
        match e.status() {
            Some(409) => StoreError::DuplicateActiveSlot,
            Some(404) => StoreError::NotFound,
            _ => StoreError::Backend(e.to_string()),
        }
    }

    fn parse_one(result: Vec<Value>) -> Result<Booking, StoreError> {
        let row = result.into_iter().next().ok_or(StoreError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| StoreError::Backend(format!("Failed to parse booking: {}", e)))
    }

    fn parse_many(result: Vec<Value>) -> Result<Vec<Booking>, StoreError> {
        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Booking>, _>>()
            .map_err(|e| StoreError::Backend(format!("Failed to parse bookings: {}", e)))
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }
}

#[async_trait]
impl BookingStore for PostgrestBookingStore {
    async fn insert_active_unique(&self, new: NewBooking) -> Result<Booking, StoreError> {
        let now = Utc::now();
        let booking_data = json!({
            "id": Uuid::new_v4(),
            "provider_id": new.provider_id,
            "requester_id": new.requester_id,
            "start_time": new.start_time.to_rfc3339(),
            "duration_minutes": new.duration_minutes,
            "status": BookingStatus::Scheduled.to_string(),
            "reason": new.reason,
            "notes": new.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .client
            .request_with_headers(
                Method::POST,
                "/rest/v1/bookings",
                Some(booking_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| {
                if matches!(e.status(), Some(409)) {
                    debug!(
                        "Active-slot uniqueness fired for provider {} at {}",
                        new.provider_id, new.start_time
                    );
                }
                Self::map_db_error(e)
            })?;

        if result.is_empty() {
            return Err(StoreError::Backend("Failed to create booking".to_string()));
        }
        Self::parse_one(result)
    }

    async fn get(&self, id: Uuid) -> Result<Booking, StoreError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", id);
        let result: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(Self::map_db_error)?;
        Self::parse_one(result)
    }

    async fn active_starts(
        &self,
        provider_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        #[derive(Deserialize)]
        struct StartRow {
            start_time: DateTime<Utc>,
        }

        let from_str = from.to_rfc3339();
        let to_str = to.to_rfc3339();
        let from_enc = urlencoding::encode(&from_str);
        let to_enc = urlencoding::encode(&to_str);
        let path = format!(
            "/rest/v1/bookings?provider_id=eq.{}&start_time=gte.{}&start_time=lt.{}&status=in.(scheduled,confirmed)&select=start_time&order=start_time.asc",
            provider_id, from_enc, to_enc
        );

        let result: Vec<StartRow> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(Self::map_db_error)?;

        Ok(result.into_iter().map(|row| row.start_time).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, StoreError> {
        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(status.to_string()));
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        if let Some(note) = note {
            // Append to any existing notes rather than overwrite history.
            let current = self.get(id).await?;
            let combined = match current.notes {
                Some(existing) => format!("{}\n{}", existing, note),
                None => note,
            };
            update_data.insert("notes".to_string(), json!(combined));
        }

        // The status filter makes the PATCH a compare-and-swap: a row whose
        // status moved since the caller read it matches nothing.
        let path = format!("/rest/v1/bookings?id=eq.{}&status=eq.{}", id, expected);
        let result: Vec<Value> = self
            .client
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(Self::map_db_error)?;

        if result.is_empty() {
            // Zero rows matched: either the booking is gone or its status
            // no longer equals `expected`. Re-read to tell the two apart.
            return match self.get(id).await {
                Ok(_) => {
                    warn!("Status update raced for booking {}", id);
                    Err(StoreError::StaleStatus)
                }
                Err(_) => Err(StoreError::NotFound),
            };
        }
        Self::parse_one(result)
    }

    async fn search(&self, query: BookingQuery) -> Result<Vec<Booking>, StoreError> {
        let mut query_parts = Vec::new();

        if let Some(provider_id) = query.provider_id {
            query_parts.push(format!("provider_id=eq.{}", provider_id));
        }
        if let Some(requester_id) = query.requester_id {
            query_parts.push(format!("requester_id=eq.{}", requester_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if query.active_only {
            query_parts.push("status=in.(scheduled,confirmed)".to_string());
        }
        if let Some(from) = query.from {
            let date_str = from.to_rfc3339();
            query_parts.push(format!("start_time=gte.{}", urlencoding::encode(&date_str)));
        }
        if let Some(to) = query.to {
            let date_str = to.to_rfc3339();
            query_parts.push(format!("start_time=lte.{}", urlencoding::encode(&date_str)));
        }

        let mut path = format!(
            "/rest/v1/bookings?{}&order=start_time.desc",
            query_parts.join("&")
        );
        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .client
            .request(Method::GET, &path, None)
            .await
            .map_err(Self::map_db_error)?;
        Self::parse_many(result)
    }
}
