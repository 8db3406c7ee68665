//! # Store Module
//!
//! Keyed persistence for [`AdoptionStatusRecord`]s. The only query pattern is
//! an exact match on `petId`.
//!
//! ## Backends
//!
//! - [`SqliteStatusStore`] - durable, file-backed (`rusqlite`, WAL journal)
//! - [`MemoryStatusStore`] - process-local `HashMap`, used by tests and the
//!   `memory` backend setting
//!
//! ## Lifecycle
//!
//! A store is opened once at startup, shared as `Arc<dyn StatusStore>` with
//! every handler that needs it, and closed explicitly on shutdown. After
//! [`StatusStore::close`] every operation fails with [`StoreError::Closed`].
//!
//! ## Atomicity
//!
//! [`StatusStore::update_by_pet_id`] applies to a single record atomically.
//! Concurrent updates to the same `petId` are last-write-wins.

mod memory;
mod sqlite;

pub use memory::MemoryStatusStore;
pub use sqlite::{SqliteStatusStore, SqliteStoreOptions};

use crate::config::{StoreBackend, StoreConfig};
use crate::model::{AdoptionStatusRecord, NewAdoptionStatus, StatusPatch};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised by a [`StatusStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("a record for petId '{0}' already exists")]
    DuplicatePetId(String),
    #[error("petId must not be empty")]
    InvalidPetId,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store is closed")]
    Closed,
}

/// Keyed storage for adoption status records.
pub trait StatusStore: Send + Sync {
    /// Create a record. Fails with [`StoreError::DuplicatePetId`] if one
    /// already exists for the same `petId`.
    fn insert(&self, new: NewAdoptionStatus) -> Result<AdoptionStatusRecord, StoreError>;

    /// Apply `patch` to the record for `pet_id` and refresh `updatedAt`.
    ///
    /// Returns `Ok(None)` when no record matches; nothing is created.
    fn update_by_pet_id(
        &self,
        pet_id: &str,
        patch: &StatusPatch,
    ) -> Result<Option<AdoptionStatusRecord>, StoreError>;

    fn find_by_pet_id(&self, pet_id: &str) -> Result<Option<AdoptionStatusRecord>, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<usize, StoreError>;

    /// End the store's lifecycle. Idempotent.
    fn close(&self) -> Result<(), StoreError>;
}

/// Current time at microsecond precision, the resolution every backend
/// stores and serializes.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn ensure_pet_id(pet_id: &str) -> Result<(), StoreError> {
    if pet_id.is_empty() {
        Err(StoreError::InvalidPetId)
    } else {
        Ok(())
    }
}

/// Open the backend selected by `config`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn StatusStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!(backend = "memory", "Status store opened");
            Ok(Arc::new(MemoryStatusStore::new()))
        }
        StoreBackend::Sqlite => {
            let options = SqliteStoreOptions {
                busy_timeout_ms: config.busy_timeout_ms,
            };
            let store = SqliteStatusStore::open_with(&config.path, options)?;
            info!(
                backend = "sqlite",
                path = %config.path.display(),
                "Status store opened"
            );
            Ok(Arc::new(store))
        }
    }
}
