#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ValveError;
use crate::job::model::Job;

/// Fixed storage key; the file store names its blob after it.
pub const STORAGE_KEY: &str = "valve_jobs";

/// The whole job collection is the unit of persistence.
pub trait JobStore {
    /// Missing or corrupt data loads as an empty list. Only a failed read is an error.
    fn load_all(&self) -> Result<Vec<Job>, ValveError>;

    /// Replaces the persisted set. Readers never observe a partial write.
    fn save_all(&self, jobs: &[Job]) -> Result<(), ValveError>;

    fn clear(&self) -> Result<(), ValveError>;
}

impl<S: JobStore + ?Sized> JobStore for &S {
    fn load_all(&self) -> Result<Vec<Job>, ValveError> {
        (**self).load_all()
    }

    fn save_all(&self, jobs: &[Job]) -> Result<(), ValveError> {
        (**self).save_all(jobs)
    }

    fn clear(&self) -> Result<(), ValveError> {
        (**self).clear()
    }
}

#[derive(Debug, Clone)]
pub struct FileJobStore {
    path: PathBuf,
}

impl FileJobStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store rooted in a directory, using the fixed storage key as file name.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{STORAGE_KEY}.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), ValveError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ValveError::storage(parent, e))?;
        }
        Ok(())
    }

    fn keep_corrupt_copy(&self) {
        let backup = self.path.with_extension("json.corrupt");
        if let Err(e) = std::fs::copy(&self.path, &backup) {
            warn!(path = %backup.display(), error = %e, "failed to keep copy of corrupt job store");
        } else {
            warn!(path = %backup.display(), "kept copy of corrupt job store");
        }
    }
}

impl JobStore for FileJobStore {
    fn load_all(&self) -> Result<Vec<Job>, ValveError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "job store not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(ValveError::storage(&self.path, e)),
        };
        match decode_blob(&data) {
            Some(jobs) => {
                debug!(path = %self.path.display(), count = jobs.len(), "loaded jobs");
                Ok(jobs)
            }
            None => {
                warn!(path = %self.path.display(), "job store is corrupt, treating as empty");
                self.keep_corrupt_copy();
                Ok(Vec::new())
            }
        }
    }

    fn save_all(&self, jobs: &[Job]) -> Result<(), ValveError> {
        self.ensure_parent()?;
        let data = serde_json::to_vec_pretty(jobs)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &data).map_err(|e| ValveError::storage(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(ValveError::storage(&self.path, e));
        }
        debug!(path = %self.path.display(), count = jobs.len(), "saved jobs");
        Ok(())
    }

    fn clear(&self) -> Result<(), ValveError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared job store");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ValveError::storage(&self.path, e)),
        }
    }
}

/// Keeps the serialized blob in memory, so it exercises the same codec as the
/// file store. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw bytes, valid or not.
    #[must_use]
    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl JobStore for MemoryJobStore {
    fn load_all(&self) -> Result<Vec<Job>, ValveError> {
        let guard = self.lock();
        let Some(data) = guard.as_deref() else {
            return Ok(Vec::new());
        };
        Ok(decode_blob(data).unwrap_or_else(|| {
            warn!("in-memory job store is corrupt, treating as empty");
            Vec::new()
        }))
    }

    fn save_all(&self, jobs: &[Job]) -> Result<(), ValveError> {
        let data = serde_json::to_vec(jobs)?;
        *self.lock() = Some(data);
        Ok(())
    }

    fn clear(&self) -> Result<(), ValveError> {
        *self.lock() = None;
        Ok(())
    }
}

fn decode_blob(data: &[u8]) -> Option<Vec<Job>> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Some(Vec::new());
    }
    match serde_json::from_slice::<Vec<Job>>(data) {
        Ok(jobs) => Some(jobs),
        Err(e) => {
            warn!(error = %e, "failed to decode job blob");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::model::Priority;
    use time::macros::datetime;

    fn sample() -> Vec<Job> {
        vec![
            Job {
                id: "job-1".to_owned(),
                valve_id: "VLV-001".to_owned(),
                description: "Replace valve seat and stem".to_owned(),
                priority: Priority::High,
                assigned_to: Some("John Smith".to_owned()),
                notes: Some("expedite".to_owned()),
                percent_complete: 45,
                created_at: datetime!(2024-03-01 09:15:30.250 UTC),
                updated_at: datetime!(2024-03-02 11:00 UTC),
                estimated_completion: Some(datetime!(2024-03-10 0:00 UTC)),
            },
            Job {
                id: "job-2".to_owned(),
                valve_id: "VLV-002".to_owned(),
                description: "Pressure test".to_owned(),
                priority: Priority::Low,
                assigned_to: None,
                notes: None,
                percent_complete: 0,
                created_at: datetime!(2024-03-01 0:00 +02:00),
                updated_at: datetime!(2024-03-01 0:00 +02:00),
                estimated_completion: None,
            },
        ]
    }

    #[test]
    fn file_store_round_trips_all_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::in_dir(dir.path());
        let jobs = sample();

        store.save_all(&jobs).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, jobs);
        assert!(loaded[1].estimated_completion.is_none());
        assert!(loaded[1].assigned_to.is_none());
        assert!(!dir.path().join("valve_jobs.json.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::new(dir.path().join("nested").join("jobs.json"));
        assert!(store.load_all().unwrap().is_empty());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_loads_empty_and_keeps_copy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::in_dir(dir.path());
        std::fs::write(store.path(), b"{not json").unwrap();

        assert!(store.load_all().unwrap().is_empty());
        assert!(dir.path().join("valve_jobs.json.corrupt").exists());
    }

    #[test]
    fn clear_removes_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileJobStore::in_dir(dir.path());
        store.save_all(&sample()).unwrap();
        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn memory_store_round_trips_and_tolerates_garbage() {
        let store = MemoryJobStore::new();
        store.save_all(&sample()).unwrap();
        assert_eq!(store.load_all().unwrap(), sample());
        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());

        let bad = MemoryJobStore::with_blob("[{\"id\": 3}]");
        assert!(bad.load_all().unwrap().is_empty());
    }
}
