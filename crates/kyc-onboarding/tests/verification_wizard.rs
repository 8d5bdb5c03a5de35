use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use kyc_onboarding::workflows::notifications::{
    InMemoryNotificationRepository, NotificationService,
};
use kyc_onboarding::workflows::verification::{
    ArtifactKind, ArtifactUploader, BiometricKind, CapturedArtifact, CorroborationConfig,
    CorroborationOutcome, CorroborationService, CorroborationStatus, DocumentSide, DocumentType,
    DraftStore, FileBlobStore, FileDraftStore, FileVerificationRepository, OcrEngine, OcrError,
    OnboardingService, SubjectId, VerificationRepository, VerificationStatus, WizardStep,
};

struct TranscriptOcr;

#[async_trait]
impl OcrEngine for TranscriptOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok("DRIVER LICENSE\nFirst Name: Amara\nCountry - Ghana".to_string())
    }
}

fn image(kind: ArtifactKind) -> CapturedArtifact {
    CapturedArtifact::new(kind, mime::IMAGE_JPEG, vec![0xff, 0xd8, 0xff, 0xdb])
}

#[tokio::test]
async fn drivers_license_wizard_survives_a_restart_and_submits() {
    let temp_dir = TempDir::new().expect("temp dir");
    let drafts_root = temp_dir.path().join("drafts");
    let blobs = Arc::new(FileBlobStore::new(temp_dir.path().join("artifacts")));
    let records_root = temp_dir.path().join("records");
    let records = Arc::new(FileVerificationRepository::new(records_root.clone()));
    let notifications = Arc::new(NotificationService::new(Arc::new(
        InMemoryNotificationRepository::default(),
    )));

    let build = |drafts: Arc<FileDraftStore>| {
        OnboardingService::new(
            drafts,
            records.clone(),
            notifications.clone(),
            ArtifactUploader::new(blobs.clone()),
            Arc::new(CorroborationService::new(
                blobs.clone(),
                Arc::new(TranscriptOcr),
                CorroborationConfig::default(),
                Duration::from_secs(5),
            )),
        )
    };

    let subject = SubjectId("amara@example.com".to_string());
    let service = build(Arc::new(FileDraftStore::new(drafts_root.clone())));

    let mut session = service
        .resume(subject.clone(), None)
        .await
        .expect("fresh wizard")
        .session;
    let info = &mut session.draft.personal_info;
    info.first_name = "Amara".to_string();
    info.last_name = "Mensah".to_string();
    info.date_of_birth = NaiveDate::from_ymd_opt(1988, 1, 30);
    info.address = "4 Independence Avenue".to_string();
    info.country = "Ghana".to_string();
    info.zip_code = "GA-144".to_string();
    assert_eq!(
        service.advance(&mut session).await.expect("personal info"),
        WizardStep::DocumentUpload
    );

    session.draft.document_type = Some(DocumentType::DriversLicense);
    let front = service
        .upload_document(&mut session, image(ArtifactKind::Document(DocumentSide::Front)))
        .await
        .expect("front uploaded");
    match front.corroboration {
        Some(CorroborationOutcome::Completed(result)) => {
            assert_eq!(result.match_score, 1.0);
            assert_eq!(result.status, CorroborationStatus::Verified);
        }
        other => panic!("unexpected corroboration outcome: {other:?}"),
    }
    assert!(
        service.advance(&mut session).await.is_err(),
        "back page still missing"
    );

    // Simulated reload: a new service over the same directory picks the draft up.
    drop(session);
    let service = build(Arc::new(FileDraftStore::new(drafts_root.clone())));
    let entry = service
        .resume(subject.clone(), Some(WizardStep::Review))
        .await
        .expect("resume");
    assert_eq!(entry.step, WizardStep::DocumentUpload);
    let mut session = entry.session;

    service
        .upload_document(&mut session, image(ArtifactKind::Document(DocumentSide::Back)))
        .await
        .expect("back uploaded");
    assert_eq!(
        service.advance(&mut session).await.expect("documents"),
        WizardStep::Biometric
    );

    for kind in BiometricKind::ALL {
        service
            .record_biometric(&mut session, image(ArtifactKind::Biometric(kind)))
            .await
            .expect("biometric uploaded");
    }
    assert_eq!(
        service.advance(&mut session).await.expect("biometrics"),
        WizardStep::Review
    );

    let record = service.finalize(session).await.expect("submitted");
    assert_eq!(record.status, VerificationStatus::Pending);
    assert_eq!(record.document_type, DocumentType::DriversLicense);
    assert_eq!(record.match_score, Some(1.0));

    let store = FileDraftStore::new(drafts_root);
    assert!(store.load(&subject).await.expect("load").is_none());
    assert_eq!(service.records_for(&subject).expect("records").len(), 1);
    assert_eq!(notifications.unread_count(&subject).expect("unread"), 1);

    // Records outlive the process that wrote them.
    drop(service);
    let reopened = FileVerificationRepository::new(records_root);
    let stored = reopened.for_subject(&subject).expect("records listed");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, record.id);
    assert_eq!(
        reopened.fetch(&record.id).expect("fetch").map(|found| found.status),
        Some(VerificationStatus::Pending)
    );
}
