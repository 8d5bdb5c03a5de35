use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::process::Stdio;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use kyc_onboarding::config::OnboardingConfig;
use kyc_onboarding::workflows::notifications::{
    InMemoryNotificationRepository, NotificationService,
};
use kyc_onboarding::workflows::verification::{
    ArtifactUploader, CorroborationService, FileBlobStore, FileDraftStore,
    FileVerificationRepository, OcrEngine, OcrError, OnboardingService,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ServiceOnboarding =
    OnboardingService<FileDraftStore, FileVerificationRepository, InMemoryNotificationRepository>;
pub(crate) type ServiceNotifications = NotificationService<InMemoryNotificationRepository>;

/// Services backing the HTTP surface: drafts, artifacts and verification records on
/// disk, notifications in process memory.
pub(crate) fn build_services(
    config: &OnboardingConfig,
    ocr: Arc<dyn OcrEngine>,
) -> (Arc<ServiceOnboarding>, Arc<ServiceNotifications>) {
    let blobs = Arc::new(FileBlobStore::new(config.artifacts_dir()));
    let notifications = Arc::new(NotificationService::new(Arc::new(
        InMemoryNotificationRepository::default(),
    )));
    let corroboration = Arc::new(CorroborationService::new(
        blobs.clone(),
        ocr,
        config.corroboration,
        config.ocr_timeout,
    ));

    let onboarding = Arc::new(OnboardingService::new(
        Arc::new(FileDraftStore::new(config.drafts_dir())),
        Arc::new(FileVerificationRepository::new(config.records_dir())),
        notifications.clone(),
        ArtifactUploader::new(blobs),
        corroboration,
    ));

    (onboarding, notifications)
}

/// OCR through a locally installed `tesseract` binary, fed over stdin.
pub(crate) struct TesseractOcrEngine {
    binary: String,
}

impl TesseractOcrEngine {
    pub(crate) fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| OcrError::Unavailable(format!("{}: {err}", self.binary)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(|err| OcrError::Failed(err.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| OcrError::Failed(err.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
