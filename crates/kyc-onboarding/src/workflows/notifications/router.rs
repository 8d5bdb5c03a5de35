use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde_json::json;

use super::domain::{NewNotification, NotificationId};
use super::repository::{NotificationRepository, NotificationStoreError};
use super::service::{NotificationError, NotificationService};
use crate::workflows::verification::SubjectId;

/// Router exposing the per-subject notification inbox.
pub fn notification_router<N>(service: Arc<NotificationService<N>>) -> Router
where
    N: NotificationRepository + 'static,
{
    Router::new()
        .route("/api/v1/notifications", post(notify_handler::<N>))
        .route("/api/v1/notifications/:subject_id", get(list_handler::<N>))
        .route(
            "/api/v1/notifications/:subject_id/read-all",
            post(mark_all_read_handler::<N>),
        )
        .route(
            "/api/v1/notifications/:subject_id/:notification_id/read",
            post(mark_read_handler::<N>),
        )
        .route(
            "/api/v1/notifications/:subject_id/:notification_id",
            delete(delete_handler::<N>),
        )
        .with_state(service)
}

pub(crate) async fn notify_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    axum::Json(request): axum::Json<NewNotification>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    match service.notify(request) {
        Ok(notification) => (StatusCode::CREATED, axum::Json(notification)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    Path(subject_id): Path<String>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    let subject = SubjectId(subject_id);
    let listed = service
        .list(&subject)
        .and_then(|notifications| Ok((service.unread_count(&subject)?, notifications)));
    match listed {
        Ok((unread, notifications)) => {
            let payload = json!({
                "unread_count": unread,
                "notifications": notifications,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mark_read_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    Path((subject_id, notification_id)): Path<(String, String)>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    match service.mark_read(&SubjectId(subject_id), &NotificationId(notification_id)) {
        Ok(notification) => (StatusCode::OK, axum::Json(notification)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mark_all_read_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    Path(subject_id): Path<String>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    match service.mark_all_read(&SubjectId(subject_id)) {
        Ok(updated) => (StatusCode::OK, axum::Json(json!({ "updated": updated }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<N>(
    State(service): State<Arc<NotificationService<N>>>,
    Path((subject_id, notification_id)): Path<(String, String)>,
) -> Response
where
    N: NotificationRepository + 'static,
{
    match service.delete(&SubjectId(subject_id), &NotificationId(notification_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: NotificationError) -> Response {
    let status = match &error {
        NotificationError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
        NotificationError::Store(NotificationStoreError::NotFound) => StatusCode::NOT_FOUND,
        NotificationError::Store(NotificationStoreError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
