use async_trait::async_trait;
use chrono::NaiveDate;
use clap::Args;
use kyc_onboarding::config::AppConfig;
use kyc_onboarding::error::AppError;
use kyc_onboarding::workflows::notifications::{
    InMemoryNotificationRepository, NotificationService,
};
use kyc_onboarding::workflows::verification::capture::{
    AuthenticatorAssertion, CameraDevice, CameraFacing, FaceDetection,
    FaceDetector, Frame, FrameSource, PlatformAuthenticator,
};
use kyc_onboarding::workflows::verification::{
    ArtifactUploader, BiometricKind, CaptureError, CorroborationOutcome,
    CorroborationService, DocumentSide, DocumentType, InMemoryBlobStore, InMemoryDraftStore,
    InMemoryVerificationRepository, MediaCaptureAdapter, OcrEngine, OcrError, OnboardingService,
    OnboardingServiceError, SequencerError, SubjectId, WizardSession,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Subject identifier used for the demo draft
    #[arg(long, default_value = "demo-subject")]
    pub(crate) subject: String,
    /// Document presented in the upload step (passport, national_id, drivers_license)
    #[arg(long, default_value = "passport", value_parser = parse_document_type)]
    pub(crate) document_type: DocumentType,
    /// Text file whose contents stand in for the OCR transcript of the front page
    #[arg(long)]
    pub(crate) ocr_text_file: Option<PathBuf>,
}

fn parse_document_type(raw: &str) -> Result<DocumentType, String> {
    DocumentType::parse(raw).ok_or_else(|| {
        format!("unknown document type '{raw}' (expected passport, national_id or drivers_license)")
    })
}

const DEFAULT_TRANSCRIPT: &str = "IDENTITY DOCUMENT\nGiven Name: Jane\nSurname: Doe\nNationality: Kenya";

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        subject,
        document_type,
        ocr_text_file,
    } = args;

    let config = AppConfig::load()?.onboarding;
    let transcript = match ocr_text_file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => DEFAULT_TRANSCRIPT.to_string(),
    };

    let blobs = Arc::new(InMemoryBlobStore::default());
    let notifications = Arc::new(NotificationService::new(Arc::new(
        InMemoryNotificationRepository::default(),
    )));
    let service = OnboardingService::new(
        Arc::new(InMemoryDraftStore::default()),
        Arc::new(InMemoryVerificationRepository::default()),
        notifications.clone(),
        ArtifactUploader::new(blobs.clone()),
        Arc::new(CorroborationService::new(
            blobs.clone(),
            Arc::new(ScriptedOcr(transcript)),
            config.corroboration,
            config.ocr_timeout,
        )),
    );
    let capture = MediaCaptureAdapter::new(
        Arc::new(ScriptedCamera),
        Arc::new(ScriptedDetector),
        Arc::new(ScriptedAuthenticator),
        config.capture_settings(),
    );

    let subject = SubjectId(subject);
    println!("Identity verification demo for {subject}");

    let entry = service.resume(subject.clone(), None).await?;
    let mut session = entry.session;
    println!("\nEntered wizard at step: {}", entry.step.label());

    report_gate(&service, &mut session).await?;

    let info = &mut session.draft.personal_info;
    info.first_name = "Jane Doe".to_string();
    info.last_name = "Doe".to_string();
    info.date_of_birth = NaiveDate::from_ymd_opt(1991, 6, 3);
    info.address = "221 Moi Avenue".to_string();
    info.country = "Kenya".to_string();
    info.zip_code = "00100".to_string();
    let step = service.advance(&mut session).await?;
    println!("Personal information accepted, moving to: {}", step.label());

    session.draft.document_type = Some(document_type);
    let document_stream = capture
        .acquire_stream(CameraFacing::Environment)
        .map_err(OnboardingServiceError::from)?;
    let mut sides = vec![DocumentSide::Front];
    if document_type.requires_back() {
        sides.push(DocumentSide::Back);
    }
    for side in sides {
        let page = capture
            .capture_document(&document_stream, side)
            .map_err(OnboardingServiceError::from)?;
        let outcome = service.upload_document(&mut session, page).await?;
        println!(
            "  - {} page of {} stored at {}",
            side.label(),
            document_type.label(),
            outcome.artifact
        );
        match outcome.corroboration {
            Some(CorroborationOutcome::Completed(result)) => {
                println!(
                    "    corroboration: {} (score {:.2}, extracted {:?})",
                    result.status.label(),
                    result.match_score,
                    result.extracted_fields
                );
            }
            Some(CorroborationOutcome::Failed { reason }) => {
                println!("    corroboration failed: {reason}");
            }
            None => {}
        }
    }
    document_stream.release();
    let step = service.advance(&mut session).await?;
    println!("Documents accepted, moving to: {}", step.label());

    let selfie_stream = capture
        .acquire_stream(CameraFacing::User)
        .map_err(OnboardingServiceError::from)?;
    let face = capture
        .capture_face(&selfie_stream, BiometricKind::Face)
        .map_err(OnboardingServiceError::from)?;
    service.record_biometric(&mut session, face).await?;

    let monitor = capture.watch_liveness(&selfie_stream);
    let mut liveness = monitor.subscribe();
    let _ = liveness.changed().await;
    let state = monitor.state();
    println!(
        "  - liveness prompt \"{}\" (face in frame: {})",
        state.prompt.instruction(),
        state.face_detected
    );
    let live_photo = capture
        .capture_face(&selfie_stream, BiometricKind::LivePhoto)
        .map_err(OnboardingServiceError::from)?;
    service.record_biometric(&mut session, live_photo).await?;
    monitor.stop();
    selfie_stream.release();

    let fingerprint = capture
        .capture_fingerprint(&subject)
        .await
        .map_err(OnboardingServiceError::from)?;
    service.record_biometric(&mut session, fingerprint).await?;

    let step = service.advance(&mut session).await?;
    println!("Biometrics captured, moving to: {}", step.label());

    let record = service.finalize(session).await?;
    let view = serde_json::to_string_pretty(&record.status_view())
        .unwrap_or_else(|_| record.id.0.clone());
    println!("\nVerification record\n{view}");

    println!("\nNotifications");
    match notifications.list(&subject) {
        Ok(inbox) => {
            for notification in inbox {
                println!("  - [{:?}] {}: {}", notification.kind, notification.title, notification.message);
            }
        }
        Err(err) => println!("  unavailable: {err}"),
    }
    println!("\nStored artifacts: {}", blobs.keys().len());

    Ok(())
}

/// Show the field errors that stop an empty form from advancing.
async fn report_gate(
    service: &OnboardingService<
        InMemoryDraftStore,
        InMemoryVerificationRepository,
        InMemoryNotificationRepository,
    >,
    session: &mut WizardSession,
) -> Result<(), AppError> {
    match service.advance(session).await {
        Err(OnboardingServiceError::Sequencer(SequencerError::Incomplete { step, errors })) => {
            println!("Advancing an empty {} form is refused:", step.label());
            for field in errors.fields() {
                println!("  - {field}: {}", errors.get(field).unwrap_or_default());
            }
            Ok(())
        }
        Err(other) => Err(other.into()),
        Ok(step) => {
            println!("Unexpectedly advanced to {}", step.label());
            Ok(())
        }
    }
}

struct ScriptedOcr(String);

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }
}

struct ScriptedCamera;

impl CameraDevice for ScriptedCamera {
    fn open(&self, facing: CameraFacing) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(ScriptedStream { facing }))
    }
}

struct ScriptedStream {
    facing: CameraFacing,
}

impl FrameSource for ScriptedStream {
    fn grab(&mut self) -> Result<Option<Frame>, CaptureError> {
        let marker = match self.facing {
            CameraFacing::User => 0x01,
            CameraFacing::Environment => 0x02,
        };
        Ok(Some(Frame {
            width: 1280,
            height: 720,
            media_type: mime::IMAGE_JPEG,
            bytes: vec![0xff, 0xd8, 0xff, 0xe0, marker],
        }))
    }

    fn stop(&mut self) {}
}

struct ScriptedDetector;

impl FaceDetector for ScriptedDetector {
    fn detect(&self, _frame: &Frame) -> Option<FaceDetection> {
        Some(FaceDetection { confidence: 0.97 })
    }
}

struct ScriptedAuthenticator;

#[async_trait]
impl PlatformAuthenticator for ScriptedAuthenticator {
    async fn get_assertion(
        &self,
        subject: &SubjectId,
        challenge: &[u8],
    ) -> Result<Option<AuthenticatorAssertion>, CaptureError> {
        Ok(Some(AuthenticatorAssertion {
            credential_id: format!("platform-{subject}").into_bytes(),
            authenticator_data: challenge.to_vec(),
            signature: vec![0x30, 0x44],
        }))
    }
}
