use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use notification_cell::services::NotificationStore;
use scheduling_cell::state::SchedulingState;
use shared_config::AppConfig;

/// Read notifications older than this are purged by the maintenance loop.
const NOTIFICATION_RETENTION_DAYS: i64 = 30;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareLink API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let (app, scheduling_state, notifications) = router::create_router(config.clone());
    let app = app
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Reminders, the no-show sweep and the notification purge run on a
    // fixed interval.
    tokio::spawn(maintenance_loop(config.clone(), scheduling_state, notifications));

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn maintenance_loop(
    config: Arc<AppConfig>,
    state: Arc<SchedulingState>,
    notifications: Arc<dyn NotificationStore>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));
    // The first tick fires immediately; skip it so startup stays quiet.
    interval.tick().await;

    loop {
        interval.tick().await;
        let now = Utc::now();
        let reminders = state.reminders();

        match reminders.send_upcoming_reminders(now).await {
            Ok(0) => {}
            Ok(count) => info!("Sent reminders for {} upcoming bookings", count),
            Err(e) => error!("Reminder sweep failed: {}", e),
        }

        match reminders
            .mark_overdue_no_shows(now, config.no_show_grace_minutes)
            .await
        {
            Ok(0) => {}
            Ok(count) => warn!("Swept {} overdue bookings to no-show", count),
            Err(e) => error!("No-show sweep failed: {}", e),
        }

        let cutoff = now - chrono::Duration::days(NOTIFICATION_RETENTION_DAYS);
        match notifications.purge_read_older_than(cutoff).await {
            Ok(0) => {}
            Ok(count) => info!("Purged {} read notifications", count),
            Err(e) => error!("Notification purge failed: {}", e),
        }
    }
}
