use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{ApplicationId, JobApplication};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: JobApplication) -> Result<JobApplication, RepositoryError>;
    /// Overwrite an existing record. Last write wins.
    fn update(&self, record: JobApplication) -> Result<JobApplication, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError>;
    fn remove(&self, id: &ApplicationId) -> Result<JobApplication, RepositoryError>;
    fn all(&self) -> Result<Vec<JobApplication>, RepositoryError>;
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

type Records = HashMap<ApplicationId, JobApplication>;

/// Process-local store, optionally mirrored to a JSON snapshot file after
/// every write. The file is written synchronously under the store lock, so
/// async callers run writes on a blocking thread.
#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<Records>>,
    snapshot: Option<PathBuf>,
}

impl InMemoryApplicationRepository {
    /// Open a snapshot-backed store, loading the file if it already exists.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let records = load_snapshot(&path)?;
        tracing::debug!(path = %path.display(), records = records.len(), "loaded snapshot");
        Ok(Self {
            records: Arc::new(Mutex::new(records)),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    /// Persist while the caller still holds the lock, so the file never lags
    /// behind a later write.
    fn persist(&self, records: &Records) -> Result<(), RepositoryError> {
        match &self.snapshot {
            Some(path) => write_snapshot(path, records),
            None => Ok(()),
        }
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: JobApplication) -> Result<JobApplication, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        if let Err(err) = self.persist(&guard) {
            guard.remove(&record.id);
            return Err(err);
        }
        Ok(record)
    }

    fn update(&self, record: JobApplication) -> Result<JobApplication, RepositoryError> {
        let mut guard = self.lock()?;
        let Some(previous) = guard.insert(record.id, record.clone()) else {
            guard.remove(&record.id);
            return Err(RepositoryError::NotFound);
        };
        if let Err(err) = self.persist(&guard) {
            guard.insert(previous.id, previous);
            return Err(err);
        }
        Ok(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &ApplicationId) -> Result<JobApplication, RepositoryError> {
        let mut guard = self.lock()?;
        let removed = guard.remove(id).ok_or(RepositoryError::NotFound)?;
        if let Err(err) = self.persist(&guard) {
            guard.insert(removed.id, removed);
            return Err(err);
        }
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.values().cloned().collect())
    }
}

fn load_snapshot(path: &Path) -> Result<Records, RepositoryError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Records::new()),
        Err(err) => return Err(unavailable(path, err)),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Records::new());
    }
    let records: Vec<JobApplication> =
        serde_json::from_slice(&raw).map_err(|err| unavailable(path, err))?;
    Ok(records.into_iter().map(|record| (record.id, record)).collect())
}

fn write_snapshot(path: &Path, records: &Records) -> Result<(), RepositoryError> {
    let mut ordered: Vec<&JobApplication> = records.values().collect();
    ordered.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.id.cmp(&right.id))
    });
    let body = serde_json::to_vec_pretty(&ordered).map_err(|err| unavailable(path, err))?;

    // Write beside the target and rename so readers never see a torn file.
    let staging = path.with_extension("json.tmp");
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| unavailable(parent, err))?;
    }
    fs::write(&staging, body).map_err(|err| unavailable(&staging, err))?;
    fs::rename(&staging, path).map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "snapshot rename failed");
        unavailable(path, err)
    })
}

fn unavailable(path: &Path, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {err}", path.display()))
}
