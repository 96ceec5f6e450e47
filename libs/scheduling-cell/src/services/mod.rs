pub mod arbiter;
pub mod lifecycle;
pub mod reminder;
pub mod slots;

pub use arbiter::BookingArbiter;
pub use lifecycle::{BookingLifecycle, TransitionService};
pub use reminder::ReminderService;
pub use slots::{SlotGenerator, SlotIter};
