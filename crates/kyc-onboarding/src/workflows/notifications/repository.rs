use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{Notification, NotificationId};
use crate::workflows::verification::SubjectId;

/// Storage port for notifications. Every lookup is scoped to the owning subject.
pub trait NotificationRepository: Send + Sync {
    fn insert(&self, notification: Notification) -> Result<Notification, NotificationStoreError>;
    /// Notifications for one subject, newest first.
    fn list(&self, subject: &SubjectId) -> Result<Vec<Notification>, NotificationStoreError>;
    fn mark_read(
        &self,
        subject: &SubjectId,
        id: &NotificationId,
    ) -> Result<Notification, NotificationStoreError>;
    /// Returns how many notifications flipped to read.
    fn mark_all_read(&self, subject: &SubjectId) -> Result<usize, NotificationStoreError>;
    fn delete(&self, subject: &SubjectId, id: &NotificationId) -> Result<(), NotificationStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationStoreError {
    #[error("notification not found")]
    NotFound,
    #[error("notification store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local inbox keyed by subject, kept in insertion order.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    inboxes: Mutex<HashMap<SubjectId, Vec<Notification>>>,
}

impl InMemoryNotificationRepository {
    fn with_inbox<T>(
        &self,
        subject: &SubjectId,
        apply: impl FnOnce(&mut Vec<Notification>) -> Result<T, NotificationStoreError>,
    ) -> Result<T, NotificationStoreError> {
        let mut guard = self
            .inboxes
            .lock()
            .map_err(|_| NotificationStoreError::Unavailable("inbox lock poisoned".into()))?;
        apply(guard.entry(subject.clone()).or_default())
    }
}

impl NotificationRepository for InMemoryNotificationRepository {
    fn insert(&self, notification: Notification) -> Result<Notification, NotificationStoreError> {
        let subject = notification.subject_id.clone();
        self.with_inbox(&subject, |inbox| {
            inbox.push(notification.clone());
            Ok(notification)
        })
    }

    fn list(&self, subject: &SubjectId) -> Result<Vec<Notification>, NotificationStoreError> {
        self.with_inbox(subject, |inbox| {
            let mut listed = inbox.clone();
            listed.reverse();
            Ok(listed)
        })
    }

    fn mark_read(
        &self,
        subject: &SubjectId,
        id: &NotificationId,
    ) -> Result<Notification, NotificationStoreError> {
        self.with_inbox(subject, |inbox| {
            let notification = inbox
                .iter_mut()
                .find(|notification| &notification.id == id)
                .ok_or(NotificationStoreError::NotFound)?;
            notification.read = true;
            Ok(notification.clone())
        })
    }

    fn mark_all_read(&self, subject: &SubjectId) -> Result<usize, NotificationStoreError> {
        self.with_inbox(subject, |inbox| {
            let mut updated = 0;
            for notification in inbox.iter_mut().filter(|notification| !notification.read) {
                notification.read = true;
                updated += 1;
            }
            Ok(updated)
        })
    }

    fn delete(&self, subject: &SubjectId, id: &NotificationId) -> Result<(), NotificationStoreError> {
        self.with_inbox(subject, |inbox| {
            let before = inbox.len();
            inbox.retain(|notification| &notification.id != id);
            if inbox.len() == before {
                Err(NotificationStoreError::NotFound)
            } else {
                Ok(())
            }
        })
    }
}
