use super::super::domain::{BiometricKind, VerificationDraft};
use super::rules::{min_length, required, required_artifact, required_text, FieldErrors};
use super::{StepDescriptor, VerificationStep, WizardStep};

pub struct PersonalInfoStep;

impl VerificationStep for PersonalInfoStep {
    fn kind(&self) -> WizardStep {
        WizardStep::PersonalInfo
    }

    fn validate(&self, draft: &VerificationDraft) -> Result<(), FieldErrors> {
        let info = &draft.personal_info;
        let mut errors = FieldErrors::new();

        min_length(&mut errors, "firstName", "First name", &info.first_name, 2);
        min_length(&mut errors, "lastName", "Last name", &info.last_name, 2);
        required(
            &mut errors,
            "dateOfBirth",
            "Date of birth is required",
            info.date_of_birth.as_ref(),
        );
        min_length(&mut errors, "address", "Address", &info.address, 5);
        required_text(&mut errors, "country", "Please select a country", &info.country);
        required_text(&mut errors, "zipCode", "Zip code is required", &info.zip_code);

        errors.into_result()
    }

    fn describe(&self) -> StepDescriptor {
        StepDescriptor {
            step: self.kind(),
            title: "Personal information",
            required_fields: vec![
                "firstName",
                "lastName",
                "dateOfBirth",
                "address",
                "country",
                "zipCode",
            ],
        }
    }
}

pub struct DocumentUploadStep;

impl VerificationStep for DocumentUploadStep {
    fn kind(&self) -> WizardStep {
        WizardStep::DocumentUpload
    }

    fn validate(&self, draft: &VerificationDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let artifacts = &draft.document_artifacts;

        required_artifact(
            &mut errors,
            "documentFront",
            "Upload the front of your document",
            artifacts.front.as_ref(),
        );

        match draft.document_type {
            None => errors.insert("documentType", "Select a document type"),
            Some(document_type) if document_type.requires_back() => required_artifact(
                &mut errors,
                "documentBack",
                "Upload the back of your document",
                artifacts.back.as_ref(),
            ),
            Some(_) => {}
        }

        errors.into_result()
    }

    fn describe(&self) -> StepDescriptor {
        StepDescriptor {
            step: self.kind(),
            title: "Identity document",
            required_fields: vec!["documentType", "documentFront", "documentBack"],
        }
    }
}

pub struct BiometricStep;

impl BiometricStep {
    fn field(kind: BiometricKind) -> &'static str {
        match kind {
            BiometricKind::Face => "face",
            BiometricKind::Fingerprint => "fingerprint",
            BiometricKind::LivePhoto => "livePhoto",
        }
    }

    fn message(kind: BiometricKind) -> &'static str {
        match kind {
            BiometricKind::Face => "Capture a face photo",
            BiometricKind::Fingerprint => "Register your fingerprint",
            BiometricKind::LivePhoto => "Complete the liveness check",
        }
    }
}

impl VerificationStep for BiometricStep {
    fn kind(&self) -> WizardStep {
        WizardStep::Biometric
    }

    fn validate(&self, draft: &VerificationDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for kind in BiometricKind::ALL {
            required_artifact(
                &mut errors,
                Self::field(kind),
                Self::message(kind),
                draft.biometric_artifacts.get(kind),
            );
        }
        errors.into_result()
    }

    fn describe(&self) -> StepDescriptor {
        StepDescriptor {
            step: self.kind(),
            title: "Biometric verification",
            required_fields: BiometricKind::ALL.iter().map(|kind| Self::field(*kind)).collect(),
        }
    }
}

/// Terminal step; it has nothing of its own to collect.
pub struct ReviewStep;

impl VerificationStep for ReviewStep {
    fn kind(&self) -> WizardStep {
        WizardStep::Review
    }

    fn validate(&self, _draft: &VerificationDraft) -> Result<(), FieldErrors> {
        Ok(())
    }

    fn describe(&self) -> StepDescriptor {
        StepDescriptor {
            step: self.kind(),
            title: "Review and submit",
            required_fields: Vec::new(),
        }
    }
}
