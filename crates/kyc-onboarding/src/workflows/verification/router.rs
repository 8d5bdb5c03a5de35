use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::capture::{ArtifactKind, CaptureError, CapturedArtifact, StorageError};
use super::corroboration::CorroborationError;
use super::domain::{
    ArtifactRef, BiometricKind, ClaimField, ClaimedFields, DocumentSide, RecordId, SubjectId,
    VerificationDraft,
};
use super::draft_store::DraftStore;
use super::repository::{RepositoryError, VerificationRepository};
use super::service::{CorroborationOutcome, OnboardingService, OnboardingServiceError};
use super::steps::{SequencerError, WizardStep};
use crate::workflows::notifications::NotificationRepository;

type SharedService<D, R, N> = Arc<OnboardingService<D, R, N>>;

/// Router exposing the verification wizard over HTTP.
pub fn verification_router<D, R, N>(service: SharedService<D, R, N>) -> Router
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/verification/corroborate",
            post(corroborate_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/records/:record_id",
            get(record_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/draft",
            get(resume_handler::<D, R, N>)
                .put(save_draft_handler::<D, R, N>)
                .delete(abandon_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/advance",
            post(advance_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/retreat",
            post(retreat_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/documents/:side",
            post(document_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/biometrics/:kind",
            post(biometric_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/finalize",
            post(finalize_handler::<D, R, N>),
        )
        .route(
            "/api/v1/verification/:subject_id/records",
            get(records_handler::<D, R, N>),
        )
        .with_state(service)
}

/// Corroboration request as sent by the document upload page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorroborationRequest {
    pub document_url: String,
    #[serde(default)]
    pub form_data: ClaimedForm,
    pub user_id: String,
    #[serde(default)]
    pub document_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimedForm {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub address: String,
    pub country: String,
}

impl From<&ClaimedForm> for ClaimedFields {
    fn from(form: &ClaimedForm) -> Self {
        ClaimedFields::new()
            .with(ClaimField::FirstName, form.first_name.clone())
            .with(ClaimField::LastName, form.last_name.clone())
            .with(ClaimField::DateOfBirth, form.date_of_birth.clone())
            .with(ClaimField::Address, form.address.clone())
            .with(ClaimField::Country, form.country.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StepQuery {
    pub step: Option<String>,
}

pub(crate) async fn corroborate_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    axum::Json(request): axum::Json<CorroborationRequest>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let claimed = ClaimedFields::from(&request.form_data);
    let document = ArtifactRef(request.document_url);
    let subject = SubjectId(request.user_id);

    match service.corroborate(&subject, &document, &claimed).await {
        Ok(result) => {
            tracing::debug!(
                subject = %subject,
                document_type = request.document_type.as_deref().unwrap_or("unknown"),
                "corroboration requested"
            );
            let payload = json!({
                "success": true,
                "matchScore": result.match_score,
                "status": result.status.label(),
                "extractedData": result.extracted_fields,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resume_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
    Query(query): Query<StepQuery>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let requested = query.step.as_deref().and_then(WizardStep::parse);
    match service.resume(SubjectId(subject_id), requested).await {
        Ok(entry) => {
            let payload = json!({
                "step": entry.step,
                "steps": service.sequencer().descriptors(),
                "draft": entry.session.draft,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_draft_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
    axum::Json(draft): axum::Json<VerificationDraft>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    match service.replace_draft(SubjectId(subject_id), draft).await {
        Ok(session) => {
            let payload = json!({
                "step": service.sequencer().current(&session.draft),
                "draft": session.draft,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn abandon_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    match service.abandon(&SubjectId(subject_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let mut session = match service.session(SubjectId(subject_id)).await {
        Ok(session) => session,
        Err(error) => return error_response(error),
    };
    match service.advance(&mut session).await {
        Ok(step) => (StatusCode::OK, axum::Json(json!({ "step": step }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn retreat_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let mut session = match service.session(SubjectId(subject_id)).await {
        Ok(session) => session,
        Err(error) => return error_response(error),
    };
    match service.retreat(&mut session).await {
        Ok(step) => (StatusCode::OK, axum::Json(json!({ "step": step }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn document_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path((subject_id, side)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let Some(side) = DocumentSide::parse(&side) else {
        return bad_request(format!("unknown document side '{side}'"));
    };
    let artifact = match upload_artifact(ArtifactKind::Document(side), &headers, body) {
        Ok(artifact) => artifact,
        Err(error) => return error_response(error.into()),
    };
    let mut session = match service.session(SubjectId(subject_id)).await {
        Ok(session) => session,
        Err(error) => return error_response(error),
    };

    match service.upload_document(&mut session, artifact).await {
        Ok(outcome) => {
            let corroboration = outcome.corroboration.map(|corroboration| match corroboration {
                CorroborationOutcome::Completed(result) => json!({
                    "status": "completed",
                    "result": result,
                }),
                CorroborationOutcome::Failed { reason } => json!({
                    "status": "failed",
                    "reason": reason,
                }),
            });
            let payload = json!({
                "side": outcome.side.label(),
                "artifact": outcome.artifact,
                "corroboration": corroboration,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn biometric_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path((subject_id, kind)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let Some(kind) = BiometricKind::parse(&kind) else {
        return bad_request(format!("unknown biometric kind '{kind}'"));
    };
    let artifact = match upload_artifact(ArtifactKind::Biometric(kind), &headers, body) {
        Ok(artifact) => artifact,
        Err(error) => return error_response(error.into()),
    };
    let mut session = match service.session(SubjectId(subject_id)).await {
        Ok(session) => session,
        Err(error) => return error_response(error),
    };

    match service.record_biometric(&mut session, artifact).await {
        Ok(reference) => {
            let payload = json!({
                "kind": kind.label(),
                "artifact": reference,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn finalize_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    let session = match service.session(SubjectId(subject_id)).await {
        Ok(session) => session,
        Err(error) => return error_response(error),
    };
    match service.finalize(session).await {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn records_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(subject_id): Path<String>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    match service.records_for(&SubjectId(subject_id)) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_handler<D, R, N>(
    State(service): State<SharedService<D, R, N>>,
    Path(record_id): Path<String>,
) -> Response
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    match service.record(&RecordId(record_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

fn upload_artifact(
    kind: ArtifactKind,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<CapturedArtifact, CaptureError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream");
    CapturedArtifact::from_upload(kind, content_type, body.to_vec())
}

fn bad_request(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn error_response(error: OnboardingServiceError) -> Response {
    let status = status_for(&error);
    let mut payload = BTreeMap::new();
    payload.insert("error", json!(error.to_string()));

    match &error {
        OnboardingServiceError::Sequencer(SequencerError::Incomplete { step, errors }) => {
            payload.insert("step", json!(step));
            payload.insert("fields", json!(errors));
        }
        OnboardingServiceError::PreconditionViolated(errors) => {
            payload.insert("fields", json!(errors));
        }
        _ => {}
    }

    (status, axum::Json(payload)).into_response()
}

fn status_for(error: &OnboardingServiceError) -> StatusCode {
    match error {
        OnboardingServiceError::Sequencer(SequencerError::Incomplete { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OnboardingServiceError::Sequencer(_) => StatusCode::CONFLICT,
        OnboardingServiceError::PreconditionViolated(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OnboardingServiceError::DraftNotFound(_) => StatusCode::NOT_FOUND,
        OnboardingServiceError::UnexpectedArtifact(_) => StatusCode::BAD_REQUEST,
        OnboardingServiceError::ForeignArtifact(_) => StatusCode::FORBIDDEN,
        OnboardingServiceError::MissingArtifact(_)
        | OnboardingServiceError::AlreadySubmitted(_) => StatusCode::CONFLICT,
        OnboardingServiceError::Draft(_) => StatusCode::SERVICE_UNAVAILABLE,
        OnboardingServiceError::Capture(CaptureError::UnsupportedMedia(_)) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        OnboardingServiceError::Capture(CaptureError::NothingCaptured) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OnboardingServiceError::Capture(_) => StatusCode::SERVICE_UNAVAILABLE,
        OnboardingServiceError::Storage(error)
        | OnboardingServiceError::Corroboration(CorroborationError::Storage(error)) => {
            storage_status(error)
        }
        OnboardingServiceError::Corroboration(CorroborationError::Ocr(_)) => StatusCode::BAD_GATEWAY,
        OnboardingServiceError::Corroboration(CorroborationError::TimedOut(_)) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        OnboardingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        OnboardingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        OnboardingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn storage_status(error: &StorageError) -> StatusCode {
    match error {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidReference(_) => StatusCode::BAD_REQUEST,
        StorageError::Io(_) | StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
