use super::domain::{SubjectId, VerificationDraft};

/// Explicit handle on the one draft a subject is editing.
///
/// Every operation that reads or mutates wizard state takes the session rather than
/// reaching for ambient state. Finalizing consumes it, so a submitted draft cannot
/// re-enter the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardSession {
    pub subject_id: SubjectId,
    pub draft: VerificationDraft,
}

impl WizardSession {
    pub fn new(subject_id: SubjectId) -> Self {
        Self::resume(subject_id, VerificationDraft::default())
    }

    pub fn resume(subject_id: SubjectId, draft: VerificationDraft) -> Self {
        Self { subject_id, draft }
    }
}
