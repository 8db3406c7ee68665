//! In-memory status store.

use super::{ensure_pet_id, now, StatusStore, StoreError};
use crate::model::{AdoptionStatusRecord, NewAdoptionStatus, StatusPatch};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Records keyed by `petId`, guarded by a single mutex.
///
/// `None` once the store has been closed.
#[derive(Debug)]
pub struct MemoryStatusStore {
    records: Mutex<Option<HashMap<String, AdoptionStatusRecord>>>,
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Some(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<HashMap<String, AdoptionStatusRecord>>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Poisoned)
    }

    fn with_records<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, AdoptionStatusRecord>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let records = guard.as_mut().ok_or(StoreError::Closed)?;
        f(records)
    }
}

impl StatusStore for MemoryStatusStore {
    fn insert(&self, new: NewAdoptionStatus) -> Result<AdoptionStatusRecord, StoreError> {
        ensure_pet_id(&new.pet_id)?;
        self.with_records(|records| {
            if records.contains_key(&new.pet_id) {
                return Err(StoreError::DuplicatePetId(new.pet_id));
            }
            let record = new.into_record(now());
            records.insert(record.pet_id.clone(), record.clone());
            debug!(pet_id = %record.pet_id, "Record inserted");
            Ok(record)
        })
    }

    fn update_by_pet_id(
        &self,
        pet_id: &str,
        patch: &StatusPatch,
    ) -> Result<Option<AdoptionStatusRecord>, StoreError> {
        ensure_pet_id(pet_id)?;
        self.with_records(|records| {
            Ok(records.get_mut(pet_id).map(|record| {
                record.apply(patch, now());
                record.clone()
            }))
        })
    }

    fn find_by_pet_id(&self, pet_id: &str) -> Result<Option<AdoptionStatusRecord>, StoreError> {
        self.with_records(|records| Ok(records.get(pet_id).cloned()))
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.with_records(|records| Ok(records.len()))
    }

    fn close(&self) -> Result<(), StoreError> {
        self.lock()?.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AdoptionStatus;
    use chrono::Timelike;

    #[test]
    fn test_insert_rejects_duplicate_pet_id() {
        let store = MemoryStatusStore::new();
        store.insert(NewAdoptionStatus::new("pet123")).unwrap();
        let err = store.insert(NewAdoptionStatus::new("pet123")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePetId(id) if id == "pet123"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_update_applies_patch() {
        let store = MemoryStatusStore::new();
        let before = store
            .insert(
                NewAdoptionStatus::new("pet123")
                    .with_status(AdoptionStatus::Reserved)
                    .with_notes("initial note"),
            )
            .unwrap();
        let patch = StatusPatch::default()
            .with_status(AdoptionStatus::Adopted)
            .with_notes("Updated successfully");
        let after = store.update_by_pet_id("pet123", &patch).unwrap().unwrap();
        assert_eq!(after.status, AdoptionStatus::Adopted);
        assert_eq!(after.notes.as_deref(), Some("Updated successfully"));
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(store.find_by_pet_id("pet123").unwrap(), Some(after));
    }

    #[test]
    fn test_timestamps_have_microsecond_precision() {
        let store = MemoryStatusStore::new();
        let inserted = store.insert(NewAdoptionStatus::new("pet123")).unwrap();
        assert_eq!(inserted.updated_at.nanosecond() % 1_000, 0);
        let updated = store
            .update_by_pet_id("pet123", &StatusPatch::default())
            .unwrap()
            .unwrap();
        assert_eq!(updated.updated_at.nanosecond() % 1_000, 0);
        let wire = serde_json::to_value(&updated).unwrap();
        let fraction = wire["updatedAt"]
            .as_str()
            .unwrap()
            .rsplit_once('.')
            .map(|(_, f)| f.trim_end_matches('Z').len());
        assert!(fraction.map_or(true, |digits| digits <= 6));
    }

    #[test]
    fn test_update_missing_does_not_create() {
        let store = MemoryStatusStore::new();
        let patch = StatusPatch::default().with_status(AdoptionStatus::Adopted);
        assert!(store.update_by_pet_id("ghost", &patch).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_closed_store_fails() {
        let store = MemoryStatusStore::new();
        store.insert(NewAdoptionStatus::new("pet123")).unwrap();
        store.close().unwrap();
        store.close().unwrap();
        let err = store
            .update_by_pet_id("pet123", &StatusPatch::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
