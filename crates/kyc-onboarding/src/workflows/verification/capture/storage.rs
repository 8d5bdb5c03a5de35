use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mime::Mime;
use tokio::fs;
use tracing::debug;

use super::super::domain::{ArtifactRef, SubjectId};
use super::{ArtifactKind, CapturedArtifact};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("artifact storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact {0} not found")]
    NotFound(ArtifactRef),
    #[error("artifact reference '{0}' is not a storage path")]
    InvalidReference(String),
    #[error("artifact storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable blob storage for captured artifacts.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<ArtifactRef, StorageError>;
    async fn get(&self, reference: &ArtifactRef) -> Result<Vec<u8>, StorageError>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<ArtifactRef, StorageError> {
        (**self).put(key, bytes).await
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Vec<u8>, StorageError> {
        (**self).get(reference).await
    }
}

/// Only plain relative paths are accepted; references arrive from callers.
fn relative_key(raw: &str) -> Result<&Path, StorageError> {
    let path = Path::new(raw);
    let plain = !raw.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(StorageError::InvalidReference(raw.to_string()))
    }
}

/// Filesystem blob store; references are paths relative to the root.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<ArtifactRef, StorageError> {
        let path = self.root.join(relative_key(key)?);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(ArtifactRef(key.to_string()))
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Vec<u8>, StorageError> {
        let path = self.root.join(relative_key(reference.as_str())?);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .expect("blob store mutex poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<ArtifactRef, StorageError> {
        relative_key(key)?;
        self.blobs
            .lock()
            .expect("blob store mutex poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(ArtifactRef(key.to_string()))
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .lock()
            .expect("blob store mutex poisoned")
            .get(reference.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.clone()))
    }
}

fn extension_for(media_type: &Mime) -> &'static str {
    let (kind, subtype) = (media_type.type_(), media_type.subtype());
    if kind == mime::IMAGE && subtype == mime::JPEG {
        "jpg"
    } else if kind == mime::IMAGE && subtype == mime::PNG {
        "png"
    } else if subtype == mime::JSON {
        "json"
    } else {
        mime_guess::get_mime_extensions(media_type)
            .and_then(|extensions| extensions.first().copied())
            .unwrap_or("bin")
    }
}

/// Key prefix under which every artifact of `kind` owned by `subject` is stored.
pub fn artifact_prefix(kind: ArtifactKind, subject: &SubjectId) -> String {
    format!("{}/{}/", kind.namespace(), subject.namespace())
}

/// Whether `reference` was stored under `subject`'s namespace for `kind`.
pub fn owned_by(reference: &ArtifactRef, kind: ArtifactKind, subject: &SubjectId) -> bool {
    reference
        .as_str()
        .strip_prefix(&artifact_prefix(kind, subject))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// Uploads artifacts under a per-subject namespace with collision-free random names.
#[derive(Clone)]
pub struct ArtifactUploader {
    store: Arc<dyn BlobStore>,
}

impl ArtifactUploader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub async fn upload(
        &self,
        subject: &SubjectId,
        artifact: &CapturedArtifact,
    ) -> Result<ArtifactRef, StorageError> {
        let key = format!(
            "{}{}-{}.{}",
            artifact_prefix(artifact.kind, subject),
            artifact.kind.slug(),
            uuid::Uuid::new_v4(),
            extension_for(&artifact.media_type),
        );
        let reference = self.store.put(&key, &artifact.bytes).await?;
        debug!(subject = %subject, artifact = %reference, "artifact stored");
        Ok(reference)
    }
}
