//! Persisted draft storage.
//!
//! Each `save` writes a full snapshot under the fixed `kycFormData` key inside the
//! subject's namespace; there is no merge. Snapshots carry a schema version and any
//! snapshot that does not match the current version, or fails to decode, is discarded
//! so the wizard restarts from the first step.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::domain::{SubjectId, VerificationDraft};

pub const DRAFT_KEY: &str = "kycFormData";
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum DraftStoreError {
    #[error("draft storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft could not be serialized: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("draft storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage port for in-progress drafts. A missing draft is `Ok(None)`, never an error.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save(&self, subject: &SubjectId, draft: &VerificationDraft)
        -> Result<(), DraftStoreError>;
    async fn load(&self, subject: &SubjectId) -> Result<Option<VerificationDraft>, DraftStoreError>;
    async fn clear(&self, subject: &SubjectId) -> Result<(), DraftStoreError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    draft: &'a VerificationDraft,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    draft: serde_json::Value,
}

pub(crate) fn encode_draft(draft: &VerificationDraft) -> Result<String, DraftStoreError> {
    let envelope = EnvelopeRef {
        version: DRAFT_SCHEMA_VERSION,
        draft,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Decode a stored snapshot; stale or malformed snapshots yield `None`.
pub(crate) fn decode_draft(subject: &SubjectId, content: &str) -> Option<VerificationDraft> {
    if content.trim().is_empty() {
        return None;
    }

    let envelope: Envelope = match serde_json::from_str(content) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(subject = %subject, error = %err, "discarding unreadable draft");
            return None;
        }
    };

    if envelope.version != DRAFT_SCHEMA_VERSION {
        warn!(
            subject = %subject,
            found = envelope.version,
            expected = DRAFT_SCHEMA_VERSION,
            "discarding draft written by another schema version"
        );
        return None;
    }

    match serde_json::from_value(envelope.draft) {
        Ok(draft) => Some(draft),
        Err(err) => {
            warn!(subject = %subject, error = %err, "discarding draft with incompatible fields");
            None
        }
    }
}

/// Durable draft store keeping one JSON file per subject.
pub struct FileDraftStore {
    root: PathBuf,
}

impl FileDraftStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, subject: &SubjectId) -> PathBuf {
        self.root
            .join(subject.namespace())
            .join(format!("{DRAFT_KEY}.json"))
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn save(
        &self,
        subject: &SubjectId,
        draft: &VerificationDraft,
    ) -> Result<(), DraftStoreError> {
        let path = self.path_for(subject);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = encode_draft(draft)?;
        let mut file = fs::File::create(&path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn load(&self, subject: &SubjectId) -> Result<Option<VerificationDraft>, DraftStoreError> {
        let path = self.path_for(subject);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let draft = decode_draft(subject, &content);
        if draft.is_none() {
            self.clear(subject).await?;
        }
        Ok(draft)
    }

    async fn clear(&self, subject: &SubjectId) -> Result<(), DraftStoreError> {
        match fs::remove_file(self.path_for(subject)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local draft store holding encoded snapshots, so it exercises the same
/// versioning path as the file store.
#[derive(Default)]
pub struct InMemoryDraftStore {
    entries: Mutex<HashMap<SubjectId, String>>,
}

impl InMemoryDraftStore {
    /// Seed a raw stored value, bypassing encoding.
    pub fn insert_raw(&self, subject: SubjectId, content: impl Into<String>) {
        self.entries
            .lock()
            .expect("draft store mutex poisoned")
            .insert(subject, content.into());
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn save(
        &self,
        subject: &SubjectId,
        draft: &VerificationDraft,
    ) -> Result<(), DraftStoreError> {
        let json = encode_draft(draft)?;
        self.entries
            .lock()
            .expect("draft store mutex poisoned")
            .insert(subject.clone(), json);
        Ok(())
    }

    async fn load(&self, subject: &SubjectId) -> Result<Option<VerificationDraft>, DraftStoreError> {
        let mut entries = self.entries.lock().expect("draft store mutex poisoned");
        let Some(content) = entries.get(subject) else {
            return Ok(None);
        };
        let draft = decode_draft(subject, content);
        if draft.is_none() {
            entries.remove(subject);
        }
        Ok(draft)
    }

    async fn clear(&self, subject: &SubjectId) -> Result<(), DraftStoreError> {
        self.entries
            .lock()
            .expect("draft store mutex poisoned")
            .remove(subject);
        Ok(())
    }
}
