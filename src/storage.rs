use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Pending submissions awaiting delivery to the grading endpoint.
pub const PENDING_SUBMISSIONS_KEY: &str = "durrah_pending_submissions";
/// Submissions that exhausted their retry budget and need manual attention.
pub const PARKED_SUBMISSIONS_KEY: &str = "durrah_parked_submissions";
/// Payment ledger (all PaySky payment records for this device).
pub const PAYMENTS_KEY: &str = "durrah_payments";
/// Licenses generated from completed payments.
pub const LICENSES_KEY: &str = "durrah_licenses";

pub fn exam_state_key(exam_id: &str) -> String {
    format!("durrah_exam_{}_state", exam_id)
}

pub fn exam_submitted_key(exam_id: &str) -> String {
    format!("durrah_exam_{}_submitted", exam_id)
}

pub fn subscription_key(entity_id: &str) -> String {
    format!("durrah_subscription_{}", entity_id)
}

/// JSON-file-backed key/value store. Keys match the ones the web client kept
/// in localStorage, so state written by either side stays readable.
///
/// Access is read-modify-write with no cross-process coordination: the store
/// is owned by a single agent process per machine and writers race as
/// last-writer-wins. In-process writers are serialized by the mutex.
#[derive(Clone)]
pub struct LocalStore {
    path: PathBuf,
    entries: Arc<Mutex<BTreeMap<String, JsonValue>>>,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| Error::Storage(format!("Corrupt store at {:?}: {}", path, e)))?
            }
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entries = self.lock()?;
        match entries.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.persist(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock()?;
        entries.remove(key);
        self.persist(&entries)
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, JsonValue>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("Store mutex poisoned".to_string()))
    }

    /// Rewrites the whole file on every mutation, via a temp file and rename
    /// so a crash mid-write cannot truncate the store.
    fn persist(&self, entries: &BTreeMap<String, JsonValue>) -> Result<()> {
        let raw = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
