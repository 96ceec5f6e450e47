pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::*;
pub use router::notification_routes;
pub use services::{MemoryNotificationStore, NotificationStore, Notifier, StoreNotifier};
pub use state::NotificationState;
