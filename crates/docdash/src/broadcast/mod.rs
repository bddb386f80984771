//! Broadcast channels shared between dashboard components.
//!
//! Notifications are the user-visible, non-blocking message stream; the
//! invalidation signal asks the job list to refetch.

pub mod invalidation;
pub mod notifications;

pub use invalidation::JobListInvalidator;
pub use notifications::{Notification, NotificationBroadcaster, NotificationLevel};
