use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::warn;

use notification_cell::router::notification_routes;
use notification_cell::services::{
    MemoryNotificationStore, NotificationStore, Notifier, PostgrestNotificationStore,
    StoreNotifier,
};
use notification_cell::state::NotificationState;
use provider_cell::router::provider_routes;
use provider_cell::services::{
    MemoryProviderDirectory, PostgrestProviderDirectory, ProviderDirectory,
};
use provider_cell::state::ProviderState;
use scheduling_cell::router::scheduling_routes;
use scheduling_cell::state::SchedulingState;
use scheduling_cell::store::{BookingStore, MemoryBookingStore, PostgrestBookingStore};
use shared_config::AppConfig;
use shared_database::PostgrestClient;

/// Wires every cell to the same backing stores and returns the router plus
/// the scheduling state and notification store, which the background
/// maintenance task shares. Falls back to in-process memory stores when no
/// REST store is configured, which keeps local development self-contained.
pub fn create_router(
    config: Arc<AppConfig>,
) -> (Router, Arc<SchedulingState>, Arc<dyn NotificationStore>) {
    let (bookings, providers, notifications): (
        Arc<dyn BookingStore>,
        Arc<dyn ProviderDirectory>,
        Arc<dyn NotificationStore>,
    ) = if config.is_rest_store_configured() {
        let client = Arc::new(PostgrestClient::new(&config));
        (
            Arc::new(PostgrestBookingStore::new(client.clone())),
            Arc::new(PostgrestProviderDirectory::new(client.clone())),
            Arc::new(PostgrestNotificationStore::new(client)),
        )
    } else {
        warn!("REST store not configured; using in-memory stores");
        (
            Arc::new(MemoryBookingStore::new()),
            Arc::new(MemoryProviderDirectory::new()),
            Arc::new(MemoryNotificationStore::new()),
        )
    };

    let notifier: Arc<dyn Notifier> = Arc::new(StoreNotifier::new(notifications.clone()));

    let provider_state = Arc::new(ProviderState::new(config.clone(), providers.clone()));
    let scheduling_state = Arc::new(SchedulingState::new(
        config.clone(),
        bookings,
        providers,
        notifier,
    ));
    let notification_state = Arc::new(NotificationState::new(config, notifications.clone()));

    let router = Router::new()
        .route("/", get(|| async { "CareLink API is running!" }))
        .nest("/providers", provider_routes(provider_state))
        .nest("/bookings", scheduling_routes(scheduling_state.clone()))
        .nest("/notifications", notification_routes(notification_state));

    (router, scheduling_state, notifications)
}
