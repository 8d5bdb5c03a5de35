use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{NewNotification, Notification, NotificationId};
use super::repository::{NotificationRepository, NotificationStoreError};
use crate::workflows::verification::SubjectId;

/// Create, list and acknowledge per-subject notifications.
pub struct NotificationService<N> {
    repository: Arc<N>,
}

impl<N> NotificationService<N>
where
    N: NotificationRepository + 'static,
{
    pub fn new(repository: Arc<N>) -> Self {
        Self { repository }
    }

    /// Validate and store a new unread notification.
    pub fn notify(&self, request: NewNotification) -> Result<Notification, NotificationError> {
        if request.user_id.0.trim().is_empty() {
            return Err(NotificationError::MissingField("user_id"));
        }
        if request.title.trim().is_empty() {
            return Err(NotificationError::MissingField("title"));
        }
        if request.message.trim().is_empty() {
            return Err(NotificationError::MissingField("message"));
        }

        let notification = Notification {
            id: NotificationId::generate(),
            subject_id: request.user_id,
            title: request.title,
            message: request.message,
            kind: request.kind.unwrap_or_default(),
            category: request.category.unwrap_or_default(),
            action_url: request.action_url,
            created_at: Utc::now(),
            read: false,
        };

        let stored = self.repository.insert(notification)?;
        info!(subject = %stored.subject_id, notification = %stored.id.0, "notification created");
        Ok(stored)
    }

    pub fn list(&self, subject: &SubjectId) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.repository.list(subject)?)
    }

    pub fn unread_count(&self, subject: &SubjectId) -> Result<usize, NotificationError> {
        Ok(self
            .repository
            .list(subject)?
            .iter()
            .filter(|notification| !notification.read)
            .count())
    }

    pub fn mark_read(
        &self,
        subject: &SubjectId,
        id: &NotificationId,
    ) -> Result<Notification, NotificationError> {
        Ok(self.repository.mark_read(subject, id)?)
    }

    pub fn mark_all_read(&self, subject: &SubjectId) -> Result<usize, NotificationError> {
        Ok(self.repository.mark_all_read(subject)?)
    }

    pub fn delete(&self, subject: &SubjectId, id: &NotificationId) -> Result<(), NotificationError> {
        Ok(self.repository.delete(subject, id)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Store(#[from] NotificationStoreError),
}
