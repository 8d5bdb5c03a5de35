use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::verification::SubjectId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Success,
    #[default]
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    #[serde(rename = "self")]
    SelfProtocol,
    Kyc,
    Tax,
    #[default]
    System,
}

/// Message addressed to one subject. Only the `read` flag changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub subject_id: SubjectId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub category: NotificationCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Inbound "notify this subject" request shared by every collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: SubjectId,
    pub title: String,
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<NotificationType>,
    #[serde(default)]
    pub category: Option<NotificationCategory>,
    #[serde(default)]
    pub action_url: Option<String>,
}

impl NewNotification {
    pub fn new(user_id: SubjectId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            kind: None,
            category: None,
            action_url: None,
        }
    }

    pub fn kind(mut self, kind: NotificationType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn category(mut self, category: NotificationCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }
}
