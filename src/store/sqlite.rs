//! SQLite-backed status store.
//!
//! One table, `adoption_status`, keyed by `pet_id`. Timestamps are stored as
//! RFC 3339 text with microsecond precision.

use super::{ensure_pet_id, now, StatusStore, StoreError};
use crate::model::{AdoptionStatus, AdoptionStatusRecord, NewAdoptionStatus, StatusPatch};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS adoption_status (
    pet_id TEXT PRIMARY KEY NOT NULL,
    status TEXT NOT NULL DEFAULT 'not_adopted'
        CHECK (status IN ('not_adopted', 'reserved', 'adopted')),
    notes TEXT,
    updated_at TEXT NOT NULL
);";

const SELECT_BY_PET_ID: &str =
    "SELECT pet_id, status, notes, updated_at FROM adoption_status WHERE pet_id = ?1";

/// Connection tuning for [`SqliteStatusStore`].
#[derive(Debug, Clone, Copy)]
pub struct SqliteStoreOptions {
    pub busy_timeout_ms: u64,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// Durable store on a single SQLite connection.
///
/// The connection is `None` once the store has been closed.
#[derive(Debug)]
pub struct SqliteStatusStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

/// Raw column values before decoding.
type RawRow = (String, String, Option<String>, String);

impl SqliteStatusStore {
    /// Open (or create) the database at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(path, SqliteStoreOptions::default())
    }

    /// Open (or create) the database at `path`.
    ///
    /// Missing parent directories are created. The schema is applied on
    /// every open.
    pub fn open_with(path: impl AsRef<Path>, options: SqliteStoreOptions) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&path, flags)?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %path.display(),
            journal_mode = %journal_mode,
            busy_timeout_ms = options.busy_timeout_ms,
            "SQLite status store ready"
        );

        Ok(Self {
            path,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        f(conn)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode((pet_id, status, notes, updated_at): RawRow) -> Result<AdoptionStatusRecord, StoreError> {
    let status = status
        .parse::<AdoptionStatus>()
        .map_err(|e| StoreError::Corrupt(format!("petId '{pet_id}': {e}")))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| StoreError::Corrupt(format!("petId '{pet_id}': bad updated_at '{updated_at}': {e}")))?
        .with_timezone(&Utc);
    Ok(AdoptionStatusRecord {
        pet_id,
        status,
        notes,
        updated_at,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl StatusStore for SqliteStatusStore {
    fn insert(&self, new: NewAdoptionStatus) -> Result<AdoptionStatusRecord, StoreError> {
        ensure_pet_id(&new.pet_id)?;
        let record = new.into_record(now());
        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO adoption_status (pet_id, status, notes, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.pet_id,
                    record.status.as_str(),
                    record.notes,
                    format_timestamp(&record.updated_at)
                ],
            );
            match result {
                Ok(_) => {
                    debug!(pet_id = %record.pet_id, "Record inserted");
                    Ok(record)
                }
                Err(err) if is_unique_violation(&err) => {
                    Err(StoreError::DuplicatePetId(record.pet_id))
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn update_by_pet_id(
        &self,
        pet_id: &str,
        patch: &StatusPatch,
    ) -> Result<Option<AdoptionStatusRecord>, StoreError> {
        ensure_pet_id(pet_id)?;
        self.with_conn(|conn| {
            // IMMEDIATE takes the write lock up front so the read and the
            // write below see the same row.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(raw) = tx
                .query_row(SELECT_BY_PET_ID, params![pet_id], read_row)
                .optional()?
            else {
                tx.commit()?;
                return Ok(None);
            };

            let mut record = decode(raw)?;
            record.apply(patch, now());
            tx.execute(
                "UPDATE adoption_status SET status = ?2, notes = ?3, updated_at = ?4
                 WHERE pet_id = ?1",
                params![
                    record.pet_id,
                    record.status.as_str(),
                    record.notes,
                    format_timestamp(&record.updated_at)
                ],
            )?;
            tx.commit()?;
            debug!(pet_id = %record.pet_id, status = %record.status, "Record updated");
            Ok(Some(record))
        })
    }

    fn find_by_pet_id(&self, pet_id: &str) -> Result<Option<AdoptionStatusRecord>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(SELECT_BY_PET_ID, params![pet_id], read_row)
                .optional()?
                .map(decode)
                .transpose()
        })
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM adoption_status", [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        let Some(conn) = self.lock()?.take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
        info!(path = %self.path.display(), "SQLite status store closed");
        Ok(())
    }
}
