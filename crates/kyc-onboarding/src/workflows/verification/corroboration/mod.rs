//! Document corroboration: OCR over an uploaded document page, then an explainable
//! label-and-substring comparison against the fields the subject claimed.

mod config;
mod extract;
mod score;

pub use config::{CorroborationConfig, DEFAULT_VERIFIED_THRESHOLD};
pub use extract::{FieldExtractor, FieldLabel};
pub use score::{classify, corroborate_text, match_score};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::capture::{BlobStore, StorageError};
use super::domain::{ArtifactRef, ClaimedFields, CorroborationResult};

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("ocr engine unavailable: {0}")]
    Unavailable(String),
    #[error("ocr engine failed: {0}")]
    Failed(String),
}

/// Optical character recognition port.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CorroborationError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error("ocr did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Runs OCR against stored document pages and scores them against claimed fields.
///
/// Each call is a single attempt. Failures are returned to the caller and never retried.
pub struct CorroborationService {
    store: Arc<dyn BlobStore>,
    ocr: Arc<dyn OcrEngine>,
    extractor: FieldExtractor,
    config: CorroborationConfig,
    timeout: Duration,
}

impl CorroborationService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        ocr: Arc<dyn OcrEngine>,
        config: CorroborationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            ocr,
            extractor: FieldExtractor::default(),
            config,
            timeout,
        }
    }

    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &CorroborationConfig {
        &self.config
    }

    pub async fn corroborate(
        &self,
        document: &ArtifactRef,
        claimed: &ClaimedFields,
    ) -> Result<CorroborationResult, CorroborationError> {
        let image = self.store.get(document).await?;

        let text = tokio::time::timeout(self.timeout, self.ocr.recognize(&image))
            .await
            .map_err(|_| {
                warn!(document = %document, timeout = ?self.timeout, "ocr timed out");
                CorroborationError::TimedOut(self.timeout)
            })??;

        let result = corroborate_text(&text, claimed, &self.extractor, &self.config);
        debug!(
            document = %document,
            score = result.match_score,
            status = result.status.label(),
            "document corroborated"
        );
        Ok(result)
    }
}
