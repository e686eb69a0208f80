//! Persisted list of previously searched cities.

use skycast_core::StorageError;

use crate::storage::KeyValueStore;
use crate::types::RecentLocation;

/// Storage key holding the JSON array of recent locations.
pub const RECENT_LOCATIONS_KEY: &str = "searchedLocations";

/// Reads and writes the whole recent list on every call.
///
/// De-duplication compares the full record (`cityName` and `searchedAt`),
/// so the same city searched twice at different times is stored twice.
/// Not safe against concurrent writers.
#[derive(Debug)]
pub struct RecentLocationsStore<S> {
    storage: S,
}

impl<S: KeyValueStore> RecentLocationsStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stored entries in insertion order. A missing key, unreadable storage
    /// or corrupt JSON all give an empty list.
    pub fn load(&self) -> Vec<RecentLocation> {
        self.read().unwrap_or_else(|e| {
            tracing::warn!("Failed to read recent locations: {}", e);
            Vec::new()
        })
    }

    /// Append `entry` unless an equal record is already stored.
    ///
    /// Returns whether the list changed. A failed read aborts without
    /// writing, so stored history is never replaced by a partial list.
    pub fn append(&self, entry: RecentLocation) -> Result<bool, StorageError> {
        let mut entries = self.read()?;
        if entries.contains(&entry) {
            tracing::debug!("Recent location '{}' already stored", entry.city_name);
            return Ok(false);
        }

        entries.push(entry);
        self.write(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_item(RECENT_LOCATIONS_KEY)?;
        tracing::info!("Cleared recent locations");
        Ok(())
    }

    /// Like `load`, but storage failures are returned. Corrupt JSON still
    /// counts as empty so the next write can replace it.
    fn read(&self) -> Result<Vec<RecentLocation>, StorageError> {
        let Some(raw) = self.storage.get_item(RECENT_LOCATIONS_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Discarding unreadable recent locations: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn write(&self, entries: &[RecentLocation]) -> Result<(), StorageError> {
        let json = serde_json::to_string(entries)?;
        self.storage.set_item(RECENT_LOCATIONS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose reads can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("read failed".into()));
            }
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }
    }

    fn store() -> RecentLocationsStore<MemoryStore> {
        RecentLocationsStore::new(MemoryStore::new())
    }

    #[test]
    fn test_load_empty_when_absent() {
        assert!(store().load().is_empty());
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let recent = store();
        assert!(recent.append(RecentLocation::new("Lima", 1)).unwrap());
        assert!(recent.append(RecentLocation::new("Bogota", 2)).unwrap());

        let names: Vec<String> = recent.load().into_iter().map(|r| r.city_name).collect();
        assert_eq!(names, vec!["Lima", "Bogota"]);
    }

    #[test]
    fn test_append_is_idempotent() {
        let recent = store();
        let entry = RecentLocation::new("Lima", 1);
        assert!(recent.append(entry.clone()).unwrap());
        assert!(!recent.append(entry).unwrap());
        assert_eq!(recent.load().len(), 1);
    }

    #[test]
    fn test_same_city_different_time_is_kept() {
        let recent = store();
        recent.append(RecentLocation::new("Lima", 1)).unwrap();
        recent.append(RecentLocation::new("Lima", 2)).unwrap();
        assert_eq!(recent.load().len(), 2);
    }

    #[test]
    fn test_corrupt_json_loads_empty() {
        let memory = MemoryStore::new();
        memory.set_item(RECENT_LOCATIONS_KEY, "{not json").unwrap();
        let recent = RecentLocationsStore::new(memory);

        assert!(recent.load().is_empty());
        // A later append overwrites the corrupt value
        assert!(recent.append(RecentLocation::new("Quito", 5)).unwrap());
        assert_eq!(recent.load().len(), 1);
    }

    #[test]
    fn test_failed_read_keeps_history() {
        let recent = RecentLocationsStore::new(FlakyStore::default());
        recent.append(RecentLocation::new("Lima", 1)).unwrap();
        recent.append(RecentLocation::new("Oslo", 2)).unwrap();

        recent.storage().fail_reads.store(true, Ordering::SeqCst);
        assert!(recent.append(RecentLocation::new("Rome", 3)).is_err());
        assert!(recent.load().is_empty());

        recent.storage().fail_reads.store(false, Ordering::SeqCst);
        let names: Vec<String> = recent.load().into_iter().map(|r| r.city_name).collect();
        assert_eq!(names, vec!["Lima", "Oslo"]);
    }

    #[test]
    fn test_stored_format() {
        let recent = store();
        recent.append(RecentLocation::new("Oslo", 1_700_000_000_000)).unwrap();
        let raw = recent.storage().get_item(RECENT_LOCATIONS_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"[{"cityName":"Oslo","searchedAt":1700000000000}]"#);
    }

    #[test]
    fn test_clear() {
        let recent = store();
        recent.append(RecentLocation::new("Oslo", 1)).unwrap();
        recent.clear().unwrap();
        assert!(recent.load().is_empty());
    }

    #[test]
    fn test_reload_from_file_store() {
        let dir = tempfile::tempdir().unwrap();
        {
            let recent = RecentLocationsStore::new(FileStore::new(dir.path()));
            recent.append(RecentLocation::new("Accra", 10)).unwrap();
        }
        let recent = RecentLocationsStore::new(FileStore::new(dir.path()));
        assert_eq!(recent.load(), vec![RecentLocation::new("Accra", 10)]);
    }
}
