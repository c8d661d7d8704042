//! JSON file counter store
//!
//! Keeps the whole counter table in memory and writes it through to a JSON
//! file on every change. Writes go to a temporary file that is then renamed
//! over the target, so a crash never leaves a half-written table behind.

use anyhow::{Context, Result};
use quotagate::{CounterSnapshot, CounterStore, Identity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Counter store persisted to a JSON file
pub struct JsonFileStore {
    path: PathBuf,
    data: BTreeMap<String, CounterSnapshot>,
}

impl JsonFileStore {
    /// Open the store at `path`, reading existing counters if the file exists
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = if path.exists() {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read counter file {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("Invalid counter file {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        tracing::info!(
            "Opened counter file {} with {} identities",
            path.display(),
            data.len()
        );

        Ok(JsonFileStore { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn persist(&self) -> Result<(), String> {
        let bytes = serde_json::to_vec_pretty(&self.data).map_err(|e| e.to_string())?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)
            .map_err(|e| format!("write {}: {e}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| format!("rename to {}: {e}", self.path.display()))
    }

    // The in-memory table only changes if the file write succeeded
    fn write(&mut self, key: String, snapshot: CounterSnapshot) -> Result<(), String> {
        let previous = self.data.insert(key.clone(), snapshot);

        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => self.data.insert(key, previous),
                None => self.data.remove(&key),
            };
            tracing::error!("Counter file write failed: {}", e);
            return Err(e);
        }

        Ok(())
    }
}

impl CounterStore for JsonFileStore {
    fn load(&mut self, identity: &Identity) -> Result<CounterSnapshot, String> {
        let key = identity.storage_key();
        if let Some(snapshot) = self.data.get(&key) {
            return Ok(snapshot.clone());
        }

        let snapshot = CounterSnapshot::default();
        self.write(key, snapshot.clone())?;
        Ok(snapshot)
    }

    fn save(&mut self, identity: &Identity, snapshot: CounterSnapshot) -> Result<(), String> {
        self.write(identity.storage_key(), snapshot)
    }

    fn compare_and_swap(
        &mut self,
        identity: &Identity,
        old: &CounterSnapshot,
        new: CounterSnapshot,
    ) -> Result<bool, String> {
        let key = identity.storage_key();
        let matches = match self.data.get(&key) {
            Some(current) => current == old,
            None => *old == CounterSnapshot::default(),
        };

        if !matches {
            return Ok(false);
        }

        self.write(key, new)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quotagate::{Entitlements, PlanTable, RequestContext};
    use tempfile::TempDir;

    fn counters_file() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        (dir, path)
    }

    #[test]
    fn test_counters_survive_reopen() {
        let (_dir, path) = counters_file();
        let identity = Identity::Account("42".into());

        {
            let store = JsonFileStore::open(&path).unwrap();
            let mut engine = Entitlements::new(store, PlanTable::default());
            let ctx = RequestContext::new(identity.clone(), "free", Utc::now());
            assert!(engine.commit_generation(&ctx).unwrap().is_allowed());
        }

        let mut reopened = JsonFileStore::open(&path).unwrap();
        let snapshot = reopened.load(&identity).unwrap();

        assert_eq!(snapshot.generations_lifetime, 1);
        assert_eq!(snapshot.generations_today, 1);
        assert!(snapshot.last_generation_at.is_some());
    }

    #[test]
    fn test_load_creates_record_on_disk() {
        let (_dir, path) = counters_file();
        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.is_empty());

        store.load(&Identity::Guest("g".into())).unwrap();
        assert_eq!(store.len(), 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("guest:g"));
    }

    #[test]
    fn test_compare_and_swap_rejects_stale_snapshot() {
        let (_dir, path) = counters_file();
        let mut store = JsonFileStore::open(&path).unwrap();
        let identity = Identity::Guest("g".into());

        let fresh = store.load(&identity).unwrap();
        let one = CounterSnapshot {
            generations_lifetime: 1,
            ..fresh.clone()
        };
        let two = CounterSnapshot {
            generations_lifetime: 2,
            ..fresh.clone()
        };

        assert!(store.compare_and_swap(&identity, &fresh, one.clone()).unwrap());
        assert!(!store.compare_and_swap(&identity, &fresh, two).unwrap());
        assert_eq!(store.load(&identity).unwrap(), one);
    }

    #[test]
    fn test_failed_write_leaves_counters_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("missing").join("counters.json")).unwrap();
        let identity = Identity::Guest("g".into());

        // Parent directory does not exist, so every write fails
        assert!(store.load(&identity).is_err());
        assert!(store.is_empty());
        assert!(
            store
                .save(&identity, CounterSnapshot::default())
                .is_err()
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let (_dir, path) = counters_file();
        std::fs::write(&path, b"not json").unwrap();
        assert!(JsonFileStore::open(&path).is_err());
    }
}
