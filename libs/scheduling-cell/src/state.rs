use std::sync::Arc;

use notification_cell::services::Notifier;
use provider_cell::services::ProviderDirectory;
use shared_config::AppConfig;

use crate::services::{BookingArbiter, ReminderService, SlotGenerator, TransitionService};
use crate::store::BookingStore;

/// Shared state for the scheduling routes. Stores and collaborators are
/// trait objects so routers in tests can run entirely in memory.
#[derive(Clone)]
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BookingStore>,
    pub providers: Arc<dyn ProviderDirectory>,
    pub notifier: Arc<dyn Notifier>,
}

impl SchedulingState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn BookingStore>,
        providers: Arc<dyn ProviderDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            store,
            providers,
            notifier,
        }
    }

    pub fn slot_generator(&self) -> SlotGenerator {
        SlotGenerator::new(self.store.clone())
    }

    pub fn arbiter(&self) -> BookingArbiter {
        BookingArbiter::new(
            self.store.clone(),
            self.providers.clone(),
            self.notifier.clone(),
        )
    }

    pub fn transitions(&self) -> TransitionService {
        TransitionService::new(
            self.store.clone(),
            self.providers.clone(),
            self.notifier.clone(),
        )
    }

    pub fn reminders(&self) -> ReminderService {
        ReminderService::new(
            self.store.clone(),
            self.providers.clone(),
            self.notifier.clone(),
        )
    }
}
