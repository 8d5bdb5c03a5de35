//! Wizard steps, their field rules, and the sequencer that gates navigation between them.

mod catalog;
mod rules;
mod sequencer;

pub use catalog::{BiometricStep, DocumentUploadStep, PersonalInfoStep, ReviewStep};
pub use rules::FieldErrors;
pub use sequencer::{SequencerError, StepSequencer};

use serde::{Deserialize, Serialize};

use super::domain::VerificationDraft;

/// Named wizard steps in the order the standard sequence presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalInfo,
    DocumentUpload,
    Biometric,
    Review,
}

impl WizardStep {
    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::PersonalInfo => "personal_info",
            WizardStep::DocumentUpload => "document_upload",
            WizardStep::Biometric => "biometric",
            WizardStep::Review => "review",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "personal_info" => Some(Self::PersonalInfo),
            "document_upload" => Some(Self::DocumentUpload),
            "biometric" => Some(Self::Biometric),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

/// Static description of a step for clients rendering the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub step: WizardStep,
    pub title: &'static str,
    pub required_fields: Vec<&'static str>,
}

/// Uniform shape every wizard step exposes to the sequencer.
///
/// Validation is synchronous and pure: a step inspects only the draft fields it owns and
/// returns the failures as a field map rather than an error.
pub trait VerificationStep: Send + Sync {
    fn kind(&self) -> WizardStep;
    fn validate(&self, draft: &VerificationDraft) -> Result<(), FieldErrors>;
    fn describe(&self) -> StepDescriptor;
}
