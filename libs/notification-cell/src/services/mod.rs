pub mod notifier;
pub mod store;

pub use notifier::{Notifier, StoreNotifier};
pub use store::{MemoryNotificationStore, NotificationStore, PostgrestNotificationStore};
