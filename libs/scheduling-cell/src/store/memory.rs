use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingQuery, BookingStatus};
use crate::store::{BookingStore, NewBooking, StoreError};

type Partition = Arc<Mutex<Vec<Booking>>>;

/// Process-local booking store used by tests and standalone deployments.
///
/// Bookings are partitioned by provider and each partition carries its own
/// mutex: the duplicate check and the insert happen under one short lock
/// with no await points inside, so arbitration for one provider never
/// blocks another.
#[derive(Default)]
pub struct MemoryBookingStore {
    partitions: RwLock<HashMap<Uuid, Partition>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> Arc<dyn BookingStore> {
        Arc::new(self)
    }

    fn partition(&self, provider_id: Uuid) -> Partition {
        if let Some(partition) = self
            .partitions
            .read()
            .expect("booking partitions poisoned")
            .get(&provider_id)
        {
            return Arc::clone(partition);
        }

        let mut partitions = self.partitions.write().expect("booking partitions poisoned");
        Arc::clone(
            partitions
                .entry(provider_id)
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new()))),
        )
    }

    fn all_partitions(&self) -> Vec<Partition> {
        self.partitions
            .read()
            .expect("booking partitions poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert_active_unique(&self, new: NewBooking) -> Result<Booking, StoreError> {
        let partition = self.partition(new.provider_id);
        let mut bookings = partition.lock().expect("booking partition poisoned");

        // The critical section: check and insert under one lock.
        if bookings
            .iter()
            .any(|b| b.is_active() && b.start_time == new.start_time)
        {
            return Err(StoreError::DuplicateActiveSlot);
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            provider_id: new.provider_id,
            requester_id: new.requester_id,
            start_time: new.start_time,
            duration_minutes: new.duration_minutes,
            status: BookingStatus::Scheduled,
            reason: new.reason,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> Result<Booking, StoreError> {
        for partition in self.all_partitions() {
            let bookings = partition.lock().expect("booking partition poisoned");
            if let Some(booking) = bookings.iter().find(|b| b.id == id) {
                return Ok(booking.clone());
            }
        }
        Err(StoreError::NotFound)
    }

    async fn active_starts(
        &self,
        provider_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let partition = self.partition(provider_id);
        let bookings = partition.lock().expect("booking partition poisoned");

        let mut starts: Vec<DateTime<Utc>> = bookings
            .iter()
            .filter(|b| b.is_active() && b.start_time >= from && b.start_time < to)
            .map(|b| b.start_time)
            .collect();
        starts.sort();
        Ok(starts)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, StoreError> {
        for partition in self.all_partitions() {
            let mut bookings = partition.lock().expect("booking partition poisoned");
            if let Some(booking) = bookings.iter_mut().find(|b| b.id == id) {
                // The status check and the write share the partition lock,
                // so a concurrent writer cannot slip in between them.
                if booking.status != expected {
                    return Err(StoreError::StaleStatus);
                }
                booking.status = status;
                if let Some(note) = note {
                    booking.notes = Some(match booking.notes.take() {
                        Some(existing) => format!("{}\n{}", existing, note),
                        None => note,
                    });
                }
                booking.updated_at = Utc::now();
                return Ok(booking.clone());
            }
        }
        Err(StoreError::NotFound)
    }

    async fn search(&self, query: BookingQuery) -> Result<Vec<Booking>, StoreError> {
        let partitions = match query.provider_id {
            Some(provider_id) => vec![self.partition(provider_id)],
            None => self.all_partitions(),
        };

        let mut results = Vec::new();
        for partition in partitions {
            let bookings = partition.lock().expect("booking partition poisoned");
            for booking in bookings.iter() {
                if query.active_only && !booking.is_active() {
                    continue;
                }
                if let Some(requester_id) = query.requester_id {
                    if booking.requester_id != requester_id {
                        continue;
                    }
                }
                if let Some(status) = query.status {
                    if booking.status != status {
                        continue;
                    }
                }
                if let Some(from) = query.from {
                    if booking.start_time < from {
                        continue;
                    }
                }
                if let Some(to) = query.to {
                    if booking.start_time > to {
                        continue;
                    }
                }
                results.push(booking.clone());
            }
        }

        results.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        if let Some(offset) = query.offset {
            let offset = offset.max(0) as usize;
            results = results.into_iter().skip(offset).collect();
        }
        if let Some(limit) = query.limit {
            results.truncate(limit.max(0) as usize);
        }

        Ok(results)
    }
}
