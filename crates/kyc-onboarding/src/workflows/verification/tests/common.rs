use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::notifications::{InMemoryNotificationRepository, NotificationService};
use crate::workflows::verification::capture::{
    artifact_prefix, AuthenticatorAssertion, CameraDevice, CameraFacing, FaceDetection,
    FaceDetector, Frame, FrameSource, PlatformAuthenticator,
};
use crate::workflows::verification::repository::{RepositoryError, VerificationRepository};
use crate::workflows::verification::service::draft_artifacts;
use crate::workflows::verification::{
    ArtifactKind, ArtifactRef, ArtifactUploader, BiometricKind, BlobStore, CaptureError,
    CapturedArtifact, CorroborationConfig, CorroborationService, DocumentSide, DocumentType,
    DraftStore, DraftStoreError, InMemoryBlobStore, InMemoryDraftStore,
    InMemoryVerificationRepository, OcrEngine, OcrError, OnboardingService, PersonalInfo,
    RecordId, SubjectId, VerificationDraft, VerificationRecord,
};

pub(super) const PASSPORT_TEXT: &str = "REPUBLIC OF KENYA\nPASSPORT\nGiven Name: Jane\nSurname: Doe\nNationality: Kenya";

pub(super) fn subject() -> SubjectId {
    SubjectId("user-42".to_string())
}

pub(super) fn personal_info() -> PersonalInfo {
    PersonalInfo {
        first_name: "Jane Doe".to_string(),
        last_name: "Doe".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12),
        address: "12 Harbour Road".to_string(),
        country: "Kenya".to_string(),
        zip_code: "00100".to_string(),
    }
}

pub(super) fn artifact(name: &str) -> ArtifactRef {
    ArtifactRef(format!("stored/{name}"))
}

/// Reference in `subject()`'s namespace, as the uploader would produce it.
pub(super) fn owned_artifact(kind: ArtifactKind, name: &str) -> ArtifactRef {
    ArtifactRef(format!("{}{name}", artifact_prefix(kind, &subject())))
}

/// A draft that satisfies every step and sits on the review step.
pub(super) fn complete_draft(document_type: DocumentType) -> VerificationDraft {
    let mut draft = VerificationDraft {
        personal_info: personal_info(),
        document_type: Some(document_type),
        step_index: 3,
        ..VerificationDraft::default()
    };
    draft.document_artifacts.front = Some(owned_artifact(
        ArtifactKind::Document(DocumentSide::Front),
        "front.jpg",
    ));
    if document_type.requires_back() {
        draft.document_artifacts.back = Some(owned_artifact(
            ArtifactKind::Document(DocumentSide::Back),
            "back.jpg",
        ));
    }
    for kind in BiometricKind::ALL {
        draft.biometric_artifacts.set(
            kind,
            owned_artifact(ArtifactKind::Biometric(kind), &format!("{}.jpg", kind.label())),
        );
    }
    draft
}

pub(super) fn document_page(side: DocumentSide) -> CapturedArtifact {
    CapturedArtifact::new(
        ArtifactKind::Document(side),
        mime::IMAGE_JPEG,
        vec![0xff, 0xd8, 0xff, 0xe0],
    )
}

pub(super) fn biometric(kind: BiometricKind) -> CapturedArtifact {
    CapturedArtifact::new(ArtifactKind::Biometric(kind), mime::IMAGE_PNG, vec![0x89, 0x50])
}

/// OCR engine returning a fixed transcript.
pub(super) struct ScriptedOcr(pub String);

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }
}

pub(super) struct FailingOcr;

#[async_trait]
impl OcrEngine for FailingOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::Failed("engine crashed".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl VerificationRepository for UnavailableRepository {
    fn insert(&self, _record: VerificationRecord) -> Result<VerificationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RecordId) -> Result<Option<VerificationRecord>, RepositoryError> {
        Ok(None)
    }

    fn for_subject(&self, _subject: &SubjectId) -> Result<Vec<VerificationRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Draft store that keeps drafts but cannot delete them.
#[derive(Default)]
pub(super) struct StickyDraftStore {
    pub inner: InMemoryDraftStore,
}

#[async_trait]
impl DraftStore for StickyDraftStore {
    async fn save(
        &self,
        subject: &SubjectId,
        draft: &VerificationDraft,
    ) -> Result<(), DraftStoreError> {
        self.inner.save(subject, draft).await
    }

    async fn load(&self, subject: &SubjectId) -> Result<Option<VerificationDraft>, DraftStoreError> {
        self.inner.load(subject).await
    }

    async fn clear(&self, _subject: &SubjectId) -> Result<(), DraftStoreError> {
        Err(DraftStoreError::Unavailable("delete rejected".to_string()))
    }
}

pub(super) struct Harness<R> {
    pub service: Arc<OnboardingService<InMemoryDraftStore, R, InMemoryNotificationRepository>>,
    pub drafts: Arc<InMemoryDraftStore>,
    pub records: Arc<R>,
    pub notifications: Arc<NotificationService<InMemoryNotificationRepository>>,
    pub blobs: Arc<InMemoryBlobStore>,
}

pub(super) fn harness_with<R>(records: Arc<R>, ocr: Arc<dyn OcrEngine>) -> Harness<R>
where
    R: VerificationRepository + 'static,
{
    let drafts = Arc::new(InMemoryDraftStore::default());
    let notifications = Arc::new(NotificationService::new(Arc::new(
        InMemoryNotificationRepository::default(),
    )));
    let blobs = Arc::new(InMemoryBlobStore::default());
    let corroboration = Arc::new(CorroborationService::new(
        blobs.clone(),
        ocr,
        CorroborationConfig::default(),
        Duration::from_secs(5),
    ));

    let service = Arc::new(OnboardingService::new(
        drafts.clone(),
        records.clone(),
        notifications.clone(),
        ArtifactUploader::new(blobs.clone()),
        corroboration,
    ));

    Harness {
        service,
        drafts,
        records,
        notifications,
        blobs,
    }
}

impl<R> Harness<R> {
    /// Put a blob behind every artifact the draft references.
    pub async fn stage_artifacts(&self, draft: &VerificationDraft) {
        for (_, reference) in draft_artifacts(draft) {
            self.blobs
                .put(reference.as_str(), &[0xff, 0xd8, 0xff])
                .await
                .expect("blob staged");
        }
    }
}

pub(super) fn harness() -> Harness<InMemoryVerificationRepository> {
    harness_with(
        Arc::new(InMemoryVerificationRepository::default()),
        Arc::new(ScriptedOcr(PASSPORT_TEXT.to_string())),
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Camera that tracks how many of its streams are running at once.
#[derive(Default)]
pub(super) struct CountingCamera {
    pub active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub opened: AtomicUsize,
    pub deny: bool,
}

impl CountingCamera {
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl CameraDevice for CountingCamera {
    fn open(&self, _facing: CameraFacing) -> Result<Box<dyn FrameSource>, CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(CountingStream {
            active: self.active.clone(),
            stopped: false,
        }))
    }
}

struct CountingStream {
    active: Arc<AtomicUsize>,
    stopped: bool,
}

impl FrameSource for CountingStream {
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        Ok(Some(Frame {
            width: 640,
            height: 480,
            media_type: mime::IMAGE_JPEG,
            bytes: vec![0xff, 0xd8, 0x01],
        }))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Detector whose answer can be flipped while a stream runs.
#[derive(Default)]
pub(super) struct ToggleDetector {
    pub face: Mutex<bool>,
}

impl ToggleDetector {
    pub fn seeing(face: bool) -> Self {
        Self {
            face: Mutex::new(face),
        }
    }

    pub fn set(&self, face: bool) {
        *self.face.lock().expect("detector mutex") = face;
    }
}

impl FaceDetector for ToggleDetector {
    fn detect(&self, _frame: &Frame) -> Option<FaceDetection> {
        if *self.face.lock().expect("detector mutex") {
            Some(FaceDetection { confidence: 0.92 })
        } else {
            None
        }
    }
}

pub(super) enum AuthenticatorScript {
    Assert,
    Dismiss,
    Hang,
}

pub(super) struct ScriptedAuthenticator(pub AuthenticatorScript);

#[async_trait]
impl PlatformAuthenticator for ScriptedAuthenticator {
    async fn get_assertion(
        &self,
        _subject: &SubjectId,
        _challenge: &[u8],
    ) -> Result<Option<AuthenticatorAssertion>, CaptureError> {
        match self.0 {
            AuthenticatorScript::Assert => Ok(Some(AuthenticatorAssertion {
                credential_id: b"credential-1".to_vec(),
                authenticator_data: vec![0x49, 0x96, 0x0d, 0xe5],
                signature: vec![0x30, 0x45],
            })),
            AuthenticatorScript::Dismiss => Ok(None),
            AuthenticatorScript::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
        }
    }
}
