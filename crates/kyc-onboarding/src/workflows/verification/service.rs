use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::capture::{
    owned_by, ArtifactKind, ArtifactUploader, CaptureError, CapturedArtifact, StorageError,
};
use super::corroboration::{CorroborationError, CorroborationService};
use super::domain::{
    ArtifactRef, BiometricKind, ClaimedFields, CorroborationResult, DocumentSide, RecordId,
    SubjectId, VerificationDraft, VerificationRecord, VerificationStatus,
};
use super::draft_store::{DraftStore, DraftStoreError};
use super::repository::{RepositoryError, VerificationRepository};
use super::session::WizardSession;
use super::steps::{FieldErrors, SequencerError, StepSequencer, WizardStep};
use crate::workflows::notifications::{
    NewNotification, NotificationCategory, NotificationRepository, NotificationService,
    NotificationType,
};

pub const SUBMITTED_TITLE: &str = "Verification submitted";
pub const SUBMISSION_FAILED_TITLE: &str = "Verification submission failed";
pub const STATUS_ACTION_URL: &str = "/kyc/status";

/// Where a visitor lands when opening the wizard.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardEntry {
    pub session: WizardSession,
    pub step: WizardStep,
}

/// Result of the OCR cross-check that follows a front-page upload.
#[derive(Debug, Clone, PartialEq)]
pub enum CorroborationOutcome {
    Completed(CorroborationResult),
    /// The upload itself succeeded; the user may upload again to retry.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUploadOutcome {
    pub side: DocumentSide,
    pub artifact: ArtifactRef,
    /// Only front pages are corroborated.
    pub corroboration: Option<CorroborationOutcome>,
}

/// Facade over the wizard: draft persistence, step gating, artifact upload,
/// corroboration and submission.
pub struct OnboardingService<D, R, N> {
    drafts: Arc<D>,
    records: Arc<R>,
    notifications: Arc<NotificationService<N>>,
    sequencer: Arc<StepSequencer>,
    uploader: ArtifactUploader,
    corroboration: Arc<CorroborationService>,
}

impl<D, R, N> OnboardingService<D, R, N>
where
    D: DraftStore + 'static,
    R: VerificationRepository + 'static,
    N: NotificationRepository + 'static,
{
    pub fn new(
        drafts: Arc<D>,
        records: Arc<R>,
        notifications: Arc<NotificationService<N>>,
        uploader: ArtifactUploader,
        corroboration: Arc<CorroborationService>,
    ) -> Self {
        Self {
            drafts,
            records,
            notifications,
            sequencer: Arc::new(StepSequencer::standard()),
            uploader,
            corroboration,
        }
    }

    pub fn with_sequencer(mut self, sequencer: StepSequencer) -> Self {
        self.sequencer = Arc::new(sequencer);
        self
    }

    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    /// Open the wizard for a subject, resuming any persisted draft.
    ///
    /// Without a draft the visitor always lands on the first step with a fresh draft.
    /// A requested step the draft has not earned is clamped back to the first step
    /// that still fails validation.
    pub async fn resume(
        &self,
        subject: SubjectId,
        requested: Option<WizardStep>,
    ) -> Result<WizardEntry, OnboardingServiceError> {
        let draft = self.drafts.load(&subject).await?;
        let step = self.sequencer.entry_step(draft.as_ref(), requested);

        let session = match draft {
            Some(mut draft) => {
                if let Some(index) = self.sequencer.index_of(step) {
                    draft.step_index = index;
                }
                WizardSession::resume(subject, draft)
            }
            None => WizardSession::new(subject),
        };

        Ok(WizardEntry { session, step })
    }

    /// Load the persisted draft, failing when the subject has none.
    pub async fn session(&self, subject: SubjectId) -> Result<WizardSession, OnboardingServiceError> {
        match self.drafts.load(&subject).await? {
            Some(draft) => Ok(WizardSession::resume(subject, draft)),
            None => Err(OnboardingServiceError::DraftNotFound(subject)),
        }
    }

    /// Persist a full snapshot of the session's draft.
    pub async fn save(&self, session: &WizardSession) -> Result<(), OnboardingServiceError> {
        self.drafts.save(&session.subject_id, &session.draft).await?;
        Ok(())
    }

    /// Replace the caller-editable part of the draft: personal details, document type
    /// and the step index.
    ///
    /// Artifacts and the corroboration result are only ever produced by uploads, so they
    /// are carried over from the persisted draft. Changing the claimed personal details
    /// discards the corroboration made against the old ones. The step index is never
    /// taken past the first step whose rules fail.
    pub async fn replace_draft(
        &self,
        subject: SubjectId,
        submitted: VerificationDraft,
    ) -> Result<WizardSession, OnboardingServiceError> {
        let stored = self.drafts.load(&subject).await?.unwrap_or_default();
        let claims_changed = stored.personal_info != submitted.personal_info;

        let mut draft = VerificationDraft {
            personal_info: submitted.personal_info,
            document_type: submitted.document_type,
            step_index: submitted.step_index,
            ..stored
        };
        if claims_changed && draft.corroboration.take().is_some() {
            info!(subject = %subject, "claimed details changed, corroboration discarded");
        }

        let gate = self
            .sequencer
            .index_of(self.sequencer.first_incomplete(&draft))
            .unwrap_or(0);
        draft.step_index = draft.step_index.min(gate);

        let session = WizardSession::resume(subject, draft);
        self.save(&session).await?;
        Ok(session)
    }

    pub async fn abandon(&self, subject: &SubjectId) -> Result<(), OnboardingServiceError> {
        self.drafts.clear(subject).await?;
        info!(subject = %subject, "verification draft abandoned");
        Ok(())
    }

    /// Move to the next step when the current one validates, then snapshot the draft.
    pub async fn advance(
        &self,
        session: &mut WizardSession,
    ) -> Result<WizardStep, OnboardingServiceError> {
        let step = self.sequencer.advance(session)?;
        self.save(session).await?;
        info!(subject = %session.subject_id, step = step.label(), "wizard advanced");
        Ok(step)
    }

    pub async fn retreat(
        &self,
        session: &mut WizardSession,
    ) -> Result<WizardStep, OnboardingServiceError> {
        let step = self.sequencer.retreat(session)?;
        self.save(session).await?;
        Ok(step)
    }

    /// Upload a document page, attach it to the draft and corroborate front pages.
    ///
    /// Corroboration failures never fail the upload; they are reported in the outcome.
    pub async fn upload_document(
        &self,
        session: &mut WizardSession,
        artifact: CapturedArtifact,
    ) -> Result<DocumentUploadOutcome, OnboardingServiceError> {
        let ArtifactKind::Document(side) = artifact.kind else {
            return Err(OnboardingServiceError::UnexpectedArtifact(artifact.kind));
        };

        let reference = self.uploader.upload(&session.subject_id, &artifact).await?;
        session.draft.attach_document(side, reference.clone());
        self.save(session).await?;

        let corroboration = match side {
            DocumentSide::Front => Some(self.corroborate_front(session, &reference).await?),
            DocumentSide::Back => None,
        };

        Ok(DocumentUploadOutcome {
            side,
            artifact: reference,
            corroboration,
        })
    }

    async fn corroborate_front(
        &self,
        session: &mut WizardSession,
        reference: &ArtifactRef,
    ) -> Result<CorroborationOutcome, OnboardingServiceError> {
        let claimed = session.draft.claimed_fields();
        match self.corroboration.corroborate(reference, &claimed).await {
            Ok(result) => {
                session.draft.corroboration = Some(result.clone());
                self.save(session).await?;
                info!(
                    subject = %session.subject_id,
                    score = result.match_score,
                    status = result.status.label(),
                    "document corroboration completed"
                );
                Ok(CorroborationOutcome::Completed(result))
            }
            Err(error) => {
                warn!(subject = %session.subject_id, error = %error, "document corroboration failed");
                Ok(CorroborationOutcome::Failed {
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Upload a biometric artifact and attach it to the draft.
    pub async fn record_biometric(
        &self,
        session: &mut WizardSession,
        artifact: CapturedArtifact,
    ) -> Result<ArtifactRef, OnboardingServiceError> {
        let ArtifactKind::Biometric(kind) = artifact.kind else {
            return Err(OnboardingServiceError::UnexpectedArtifact(artifact.kind));
        };

        let reference = self.uploader.upload(&session.subject_id, &artifact).await?;
        session
            .draft
            .biometric_artifacts
            .set(kind, reference.clone());
        self.save(session).await?;
        Ok(reference)
    }

    /// Stand-alone corroboration of a document page the subject uploaded earlier.
    pub async fn corroborate(
        &self,
        subject: &SubjectId,
        document: &ArtifactRef,
        claimed: &ClaimedFields,
    ) -> Result<CorroborationResult, OnboardingServiceError> {
        if !owned_by(document, ArtifactKind::Document(DocumentSide::Front), subject) {
            warn!(subject = %subject, artifact = %document, "corroboration of a foreign document refused");
            return Err(OnboardingServiceError::ForeignArtifact(document.clone()));
        }
        Ok(self.corroboration.corroborate(document, claimed).await?)
    }

    /// Turn a complete draft into a pending verification record.
    ///
    /// Calling this with an incomplete draft is a defect in the caller and yields
    /// `PreconditionViolated`. Every referenced artifact must sit in the subject's
    /// namespace and still be stored. A draft already turned into a pending record is
    /// refused with `AlreadySubmitted`. When the record cannot be stored the persisted
    /// draft is kept so the subject can retry.
    pub async fn finalize(
        &self,
        session: WizardSession,
    ) -> Result<VerificationRecord, OnboardingServiceError> {
        let WizardSession { subject_id, draft } = session;

        if let Err(errors) = self.sequencer.ready_to_finalize(&draft) {
            error!(
                subject = %subject_id,
                fields = ?errors.fields().collect::<Vec<_>>(),
                "finalize called on an incomplete draft"
            );
            return Err(OnboardingServiceError::PreconditionViolated(errors));
        }
        let Some(document_type) = draft.document_type else {
            error!(subject = %subject_id, "finalize called without a document type");
            return Err(OnboardingServiceError::PreconditionViolated(
                FieldErrors::single("documentType", "Please select a document type"),
            ));
        };

        if let Some(existing) = self.pending_record_for(&subject_id, &draft)? {
            warn!(subject = %subject_id, record = %existing, "draft was already submitted");
            if let Err(failure) = self.drafts.clear(&subject_id).await {
                warn!(subject = %subject_id, error = %failure, "submitted draft was not cleared");
            }
            return Err(OnboardingServiceError::AlreadySubmitted(existing));
        }
        self.verify_artifacts(&subject_id, &draft).await?;

        self.drafts.save(&subject_id, &draft).await?;

        let record = VerificationRecord {
            id: RecordId::generate(),
            subject_id: subject_id.clone(),
            document_type,
            ocr_data: draft
                .corroboration
                .as_ref()
                .map(|result| result.extracted_fields.clone())
                .unwrap_or_default(),
            match_score: draft.corroboration.as_ref().map(|result| result.match_score),
            status: VerificationStatus::Pending,
            created_at: Utc::now(),
            form_snapshot: draft,
        };

        let stored = match self.records.insert(record) {
            Ok(stored) => stored,
            Err(failure) => {
                warn!(subject = %subject_id, error = %failure, "verification record not stored");
                self.emit(
                    NewNotification::new(
                        subject_id,
                        SUBMISSION_FAILED_TITLE,
                        "We could not save your verification. Your progress was kept, please try again.",
                    )
                    .kind(NotificationType::Error)
                    .category(NotificationCategory::Kyc),
                );
                return Err(failure.into());
            }
        };

        if let Err(failure) = self.drafts.clear(&subject_id).await {
            warn!(subject = %subject_id, error = %failure, "submitted draft was not cleared");
        }

        self.emit(
            NewNotification::new(
                subject_id.clone(),
                SUBMITTED_TITLE,
                "Your identity verification was submitted and is pending review.",
            )
            .kind(NotificationType::Success)
            .category(NotificationCategory::Kyc)
            .action_url(STATUS_ACTION_URL),
        );

        info!(subject = %subject_id, record = %stored.id.0, "verification submitted");
        Ok(stored)
    }

    fn pending_record_for(
        &self,
        subject: &SubjectId,
        draft: &VerificationDraft,
    ) -> Result<Option<RecordId>, OnboardingServiceError> {
        let existing = self
            .records
            .for_subject(subject)?
            .into_iter()
            .find(|record| {
                record.status == VerificationStatus::Pending && &record.form_snapshot == draft
            });
        Ok(existing.map(|record| record.id))
    }

    async fn verify_artifacts(
        &self,
        subject: &SubjectId,
        draft: &VerificationDraft,
    ) -> Result<(), OnboardingServiceError> {
        for (kind, reference) in draft_artifacts(draft) {
            if !owned_by(reference, kind, subject) {
                error!(subject = %subject, artifact = %reference, "draft references a foreign artifact");
                return Err(OnboardingServiceError::ForeignArtifact(reference.clone()));
            }
            match self.uploader.store().get(reference).await {
                Ok(_) => {}
                Err(StorageError::NotFound(_)) => {
                    warn!(subject = %subject, artifact = %reference, "draft references a missing artifact");
                    return Err(OnboardingServiceError::MissingArtifact(reference.clone()));
                }
                Err(failure) => return Err(failure.into()),
            }
        }
        Ok(())
    }

    fn emit(&self, notification: NewNotification) {
        if let Err(failure) = self.notifications.notify(notification) {
            warn!(error = %failure, "notification was not delivered");
        }
    }

    pub fn records_for(
        &self,
        subject: &SubjectId,
    ) -> Result<Vec<VerificationRecord>, OnboardingServiceError> {
        Ok(self.records.for_subject(subject)?)
    }

    pub fn record(&self, id: &RecordId) -> Result<VerificationRecord, OnboardingServiceError> {
        let record = self.records.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }
}

/// Every artifact reference held by a draft, paired with the kind it was uploaded as.
pub(crate) fn draft_artifacts(draft: &VerificationDraft) -> Vec<(ArtifactKind, &ArtifactRef)> {
    let documents = [
        (DocumentSide::Front, draft.document_artifacts.front.as_ref()),
        (DocumentSide::Back, draft.document_artifacts.back.as_ref()),
    ]
    .into_iter()
    .filter_map(|(side, reference)| reference.map(|reference| (ArtifactKind::Document(side), reference)));
    let biometrics = BiometricKind::ALL.into_iter().filter_map(|kind| {
        draft
            .biometric_artifacts
            .get(kind)
            .map(|reference| (ArtifactKind::Biometric(kind), reference))
    });
    documents.chain(biometrics).collect()
}

/// Error raised by the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingServiceError {
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error("verification draft is not ready for submission")]
    PreconditionViolated(FieldErrors),
    #[error("no verification draft for subject {0}")]
    DraftNotFound(SubjectId),
    #[error("unexpected artifact kind {0:?}")]
    UnexpectedArtifact(ArtifactKind),
    #[error("artifact {0} does not belong to this subject")]
    ForeignArtifact(ArtifactRef),
    #[error("artifact {0} is no longer stored, please upload it again")]
    MissingArtifact(ArtifactRef),
    #[error("draft was already submitted as record {0}")]
    AlreadySubmitted(RecordId),
    #[error(transparent)]
    Draft(#[from] DraftStoreError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Corroboration(#[from] CorroborationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
