//! Identity-verification wizard.
//!
//! A subject fills in personal details, uploads identity document pages and captures
//! biometrics across a fixed sequence of gated steps. Progress is snapshotted after every
//! step so a reload resumes where the subject left off. Front pages are cross-checked
//! against the claimed details with OCR, and the finished draft becomes a pending
//! verification record for manual review.

pub mod capture;
pub mod corroboration;
pub mod domain;
pub mod draft_store;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod steps;

#[cfg(test)]
mod tests;

pub use capture::{
    ArtifactKind, ArtifactUploader, BlobStore, CaptureError, CapturedArtifact, FileBlobStore,
    InMemoryBlobStore, MediaCaptureAdapter, StorageError, StreamHandle,
};
pub use corroboration::{
    CorroborationConfig, CorroborationError, CorroborationService, FieldExtractor, OcrEngine,
    OcrError,
};
pub use domain::{
    ArtifactRef, BiometricArtifacts, BiometricKind, ClaimField, ClaimedFields,
    CorroborationResult, CorroborationStatus, DocumentArtifacts, DocumentSide, DocumentType,
    PersonalInfo, RecordId, SubjectId, VerificationDraft, VerificationRecord,
    VerificationStatus, VerificationStatusView,
};
pub use draft_store::{DraftStore, DraftStoreError, FileDraftStore, InMemoryDraftStore};
pub use repository::{
    FileVerificationRepository, InMemoryVerificationRepository, RepositoryError,
    VerificationRepository,
};
pub use router::verification_router;
pub use service::{
    CorroborationOutcome, DocumentUploadOutcome, OnboardingService, OnboardingServiceError,
    WizardEntry,
};
pub use session::WizardSession;
pub use steps::{FieldErrors, SequencerError, StepSequencer, WizardStep};
