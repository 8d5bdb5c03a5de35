use super::common::*;

use crate::workflows::verification::{
    BiometricKind, DocumentType, SequencerError, StepSequencer, VerificationDraft, WizardSession,
    WizardStep,
};

fn session_with(draft: VerificationDraft) -> WizardSession {
    WizardSession::resume(subject(), draft)
}

#[test]
fn empty_personal_info_reports_every_field() {
    let sequencer = StepSequencer::standard();
    let mut session = WizardSession::new(subject());

    let error = sequencer.advance(&mut session).expect_err("blank form is incomplete");

    let SequencerError::Incomplete { step, errors } = error else {
        panic!("expected incomplete step");
    };
    assert_eq!(step, WizardStep::PersonalInfo);
    assert_eq!(errors.len(), 6);
    assert_eq!(errors.get("firstName"), Some("First name is required"));
    assert_eq!(errors.get("country"), Some("Please select a country"));
    assert_eq!(errors.get("zipCode"), Some("Zip code is required"));
    assert_eq!(session.draft.step_index, 0, "failed advance must not move the index");
}

#[test]
fn minimum_lengths_count_trimmed_characters() {
    let sequencer = StepSequencer::standard();
    let mut draft = VerificationDraft {
        personal_info: personal_info(),
        ..VerificationDraft::default()
    };
    draft.personal_info.first_name = " J ".to_string();
    draft.personal_info.address = "Rd 1".to_string();

    let errors = sequencer
        .validate_step(WizardStep::PersonalInfo, &draft)
        .expect_err("short values rejected");

    assert_eq!(
        errors.get("firstName"),
        Some("First name must be at least 2 characters")
    );
    assert_eq!(
        errors.get("address"),
        Some("Address must be at least 5 characters")
    );
    assert!(errors.get("lastName").is_none());
}

#[test]
fn advance_succeeds_exactly_when_the_current_step_validates() {
    let sequencer = StepSequencer::standard();
    let mut session = session_with(VerificationDraft {
        personal_info: personal_info(),
        ..VerificationDraft::default()
    });

    assert!(sequencer.is_step_complete(WizardStep::PersonalInfo, &session.draft));
    let next = sequencer.advance(&mut session).expect("personal info is complete");
    assert_eq!(next, WizardStep::DocumentUpload);
    assert_eq!(session.draft.step_index, 1);

    assert!(!sequencer.is_step_complete(WizardStep::DocumentUpload, &session.draft));
    assert!(matches!(
        sequencer.advance(&mut session),
        Err(SequencerError::Incomplete {
            step: WizardStep::DocumentUpload,
            ..
        })
    ));
    assert_eq!(session.draft.step_index, 1);
}

#[test]
fn validation_only_inspects_the_current_step() {
    let sequencer = StepSequencer::standard();
    let mut draft = complete_draft(DocumentType::Passport);
    draft.personal_info.first_name.clear();
    draft.step_index = 1;
    let mut session = session_with(draft);

    let next = sequencer
        .advance(&mut session)
        .expect("document step does not look at personal info");
    assert_eq!(next, WizardStep::Biometric);
}

#[test]
fn passport_needs_only_a_front_page() {
    let sequencer = StepSequencer::standard();
    let mut draft = VerificationDraft {
        document_type: Some(DocumentType::Passport),
        ..VerificationDraft::default()
    };
    draft.document_artifacts.front = Some(artifact("passport.jpg"));

    assert!(sequencer.is_step_complete(WizardStep::DocumentUpload, &draft));
}

#[test]
fn card_documents_need_both_sides() {
    let sequencer = StepSequencer::standard();
    for document_type in [DocumentType::NationalId, DocumentType::DriversLicense] {
        let mut draft = VerificationDraft {
            document_type: Some(document_type),
            ..VerificationDraft::default()
        };
        draft.document_artifacts.front = Some(artifact("front.jpg"));

        let errors = sequencer
            .validate_step(WizardStep::DocumentUpload, &draft)
            .expect_err("back side missing");
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["documentBack"]);

        draft.document_artifacts.back = Some(artifact("back.jpg"));
        assert!(sequencer.is_step_complete(WizardStep::DocumentUpload, &draft));
    }
}

#[test]
fn biometric_step_requires_all_three_artifacts() {
    let sequencer = StepSequencer::standard();
    let mut draft = complete_draft(DocumentType::Passport);
    draft.biometric_artifacts.live_photo = None;

    let errors = sequencer
        .validate_step(WizardStep::Biometric, &draft)
        .expect_err("live photo missing");
    assert_eq!(errors.get("livePhoto"), Some("Complete the liveness check"));

    draft
        .biometric_artifacts
        .set(BiometricKind::LivePhoto, artifact("live.jpg"));
    assert!(sequencer.is_step_complete(WizardStep::Biometric, &draft));
}

#[test]
fn retreat_is_refused_only_on_the_first_step() {
    let sequencer = StepSequencer::standard();
    let mut session = WizardSession::new(subject());
    assert!(matches!(
        sequencer.retreat(&mut session),
        Err(SequencerError::AtInitialStep)
    ));

    let mut session = session_with(complete_draft(DocumentType::Passport));
    assert_eq!(
        sequencer.retreat(&mut session).expect("retreat from review"),
        WizardStep::Biometric
    );
    assert_eq!(session.draft.step_index, 2);
}

#[test]
fn review_cannot_be_advanced_past() {
    let sequencer = StepSequencer::standard();
    let mut session = session_with(complete_draft(DocumentType::Passport));

    assert!(matches!(
        sequencer.advance(&mut session),
        Err(SequencerError::AtTerminalStep)
    ));
    assert_eq!(sequencer.terminal(), WizardStep::Review);
}

#[test]
fn missing_draft_always_enters_on_the_first_step() {
    let sequencer = StepSequencer::standard();

    assert_eq!(
        sequencer.entry_step(None, Some(WizardStep::Review)),
        WizardStep::PersonalInfo
    );
    assert_eq!(sequencer.entry_step(None, None), WizardStep::PersonalInfo);
}

#[test]
fn requested_step_is_capped_by_progress_and_first_incomplete_step() {
    let sequencer = StepSequencer::standard();
    let mut draft = complete_draft(DocumentType::NationalId);
    draft.document_artifacts.back = None;

    assert_eq!(
        sequencer.entry_step(Some(&draft), Some(WizardStep::Review)),
        WizardStep::DocumentUpload
    );
    assert_eq!(
        sequencer.entry_step(Some(&draft), Some(WizardStep::PersonalInfo)),
        WizardStep::PersonalInfo
    );

    let mut early = complete_draft(DocumentType::Passport);
    early.step_index = 1;
    assert_eq!(
        sequencer.entry_step(Some(&early), Some(WizardStep::Review)),
        WizardStep::DocumentUpload
    );
}

#[test]
fn finalize_readiness_requires_every_step_and_the_review_position() {
    let sequencer = StepSequencer::standard();
    let draft = complete_draft(DocumentType::Passport);
    assert!(sequencer.ready_to_finalize(&draft).is_ok());

    let mut not_on_review = draft.clone();
    not_on_review.step_index = 2;
    let errors = sequencer
        .ready_to_finalize(&not_on_review)
        .expect_err("must sit on review");
    assert!(errors.get("step").is_some());

    let mut incomplete = draft;
    incomplete.biometric_artifacts.face = None;
    incomplete.personal_info.zip_code.clear();
    let errors = sequencer
        .ready_to_finalize(&incomplete)
        .expect_err("incomplete draft");
    assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["face", "zipCode"]);
}
