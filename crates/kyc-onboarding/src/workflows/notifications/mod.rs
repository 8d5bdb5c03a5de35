//! Per-subject notification inbox used to tell applicants how their submission went.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    NewNotification, Notification, NotificationCategory, NotificationId, NotificationType,
};
pub use repository::{
    InMemoryNotificationRepository, NotificationRepository, NotificationStoreError,
};
pub use router::notification_router;
pub use service::{NotificationError, NotificationService};
