use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use kyc_onboarding::workflows::notifications::{
    notification_router, NotificationRepository, NotificationService,
};
use kyc_onboarding::workflows::verification::{
    verification_router, DraftStore, OnboardingService, VerificationRepository,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_onboarding_routes<D, R, N>(
    onboarding: Arc<OnboardingService<D, R, N>>,
    notifications: Arc<NotificationService<N>>,
) -> axum::Router
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    verification_router(onboarding)
        .merge(notification_router(notifications))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
