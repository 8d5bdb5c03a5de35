use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use super::domain::{RecordId, SubjectId, VerificationRecord};

/// Durable storage for verification records. Records are insert-only from this crate;
/// status changes belong to the review back office.
pub trait VerificationRepository: Send + Sync {
    fn insert(&self, record: VerificationRecord) -> Result<VerificationRecord, RepositoryError>;
    fn fetch(&self, id: &RecordId) -> Result<Option<VerificationRecord>, RepositoryError>;
    /// Records for one subject, newest first.
    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<VerificationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default)]
pub struct InMemoryVerificationRepository {
    records: Mutex<HashMap<RecordId, VerificationRecord>>,
}

impl VerificationRepository for InMemoryVerificationRepository {
    fn insert(&self, record: VerificationRecord) -> Result<VerificationRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record lock poisoned".into()))?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<VerificationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record lock poisoned".into()))?;
        Ok(guard.get(id).cloned())
    }

    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<VerificationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record lock poisoned".into()))?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| &record.subject_id == subject)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// Durable repository keeping one JSON document per record under `root`.
pub struct FileVerificationRepository {
    root: PathBuf,
}

impl FileVerificationRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Record ids become file names, so only plain `[A-Za-z0-9-]` ids are addressable.
    fn path_for(&self, id: &RecordId) -> Option<PathBuf> {
        let plain = !id.0.is_empty()
            && id
                .0
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        plain.then(|| self.root.join(format!("{}.json", id.0)))
    }

    fn read(&self, path: &std::path::Path) -> Result<Option<VerificationRecord>, RepositoryError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(unavailable(err)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable verification record");
                Ok(None)
            }
        }
    }
}

fn unavailable(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

impl VerificationRepository for FileVerificationRepository {
    fn insert(&self, record: VerificationRecord) -> Result<VerificationRecord, RepositoryError> {
        let path = self.path_for(&record.id).ok_or_else(|| {
            RepositoryError::Unavailable(format!("record id '{}' cannot be stored", record.id))
        })?;
        let json = serde_json::to_vec_pretty(&record).map_err(unavailable)?;

        fs::create_dir_all(&self.root).map_err(unavailable)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(RepositoryError::Conflict)
            }
            Err(err) => return Err(unavailable(err)),
        };

        if let Err(err) = file.write_all(&json).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(unavailable(err));
        }
        Ok(record)
    }

    fn fetch(&self, id: &RecordId) -> Result<Option<VerificationRecord>, RepositoryError> {
        match self.path_for(id) {
            Some(path) => self.read(&path),
            None => Ok(None),
        }
    }

    fn for_subject(&self, subject: &SubjectId) -> Result<Vec<VerificationRecord>, RepositoryError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(unavailable(err)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(unavailable)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = self.read(&path)? {
                if &record.subject_id == subject {
                    records.push(record);
                }
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
