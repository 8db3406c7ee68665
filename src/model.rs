//! # Domain Model
//!
//! Types shared by the store, the update handler and the wire format.
//!
//! - [`AdoptionStatus`] - the three adoption states a pet can be in
//! - [`AdoptionStatusRecord`] - one persisted record, keyed by `petId`
//! - [`StatusPatch`] - a validated partial update applied to a record
//! - [`NewAdoptionStatus`] - input for creating a record
//!
//! All wire names are camelCase (`petId`, `updatedAt`) and status values are
//! snake_case (`not_adopted`, `reserved`, `adopted`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Adoption state of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionStatus {
    #[default]
    NotAdopted,
    Reserved,
    Adopted,
}

impl AdoptionStatus {
    /// All variants, in declaration order.
    pub const ALL: [AdoptionStatus; 3] = [
        AdoptionStatus::NotAdopted,
        AdoptionStatus::Reserved,
        AdoptionStatus::Adopted,
    ];

    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AdoptionStatus::NotAdopted => "not_adopted",
            AdoptionStatus::Reserved => "reserved",
            AdoptionStatus::Adopted => "adopted",
        }
    }
}

impl fmt::Display for AdoptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown adoption status '{0}', expected one of not_adopted, reserved, adopted")]
pub struct UnknownStatus(pub String);

impl FromStr for AdoptionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdoptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Persisted adoption status of one pet.
///
/// Serializes with all four fields present; `notes` is `null` when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionStatusRecord {
    pub pet_id: String,
    pub status: AdoptionStatus,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AdoptionStatusRecord {
    /// Apply a patch in place and stamp the modification time.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn apply(&mut self, patch: &StatusPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        self.updated_at = now.max(self.updated_at);
    }
}

/// Input for creating a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdoptionStatus {
    pub pet_id: String,
    #[serde(default)]
    pub status: AdoptionStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAdoptionStatus {
    /// A record for `pet_id` with the default status and no notes.
    pub fn new(pet_id: impl Into<String>) -> Self {
        Self {
            pet_id: pet_id.into(),
            status: AdoptionStatus::default(),
            notes: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: AdoptionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Materialize the record as of `now`.
    pub fn into_record(self, now: DateTime<Utc>) -> AdoptionStatusRecord {
        AdoptionStatusRecord {
            pet_id: self.pet_id,
            status: self.status,
            notes: self.notes,
            updated_at: now,
        }
    }
}

/// Partial update for a record.
///
/// Each field is independent:
///
/// | JSON            | `status`          | `notes`             |
/// |-----------------|-------------------|---------------------|
/// | field absent    | unchanged         | unchanged           |
/// | `null`          | unchanged         | cleared             |
/// | value           | overwritten       | overwritten         |
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusPatch {
    #[serde(default)]
    pub status: Option<AdoptionStatus>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub notes: Option<Option<String>>,
}

/// Keeps `null` distinct from an absent field: absent → `None` (via
/// `#[serde(default)]`), `null` → `Some(None)`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// The request body could not be turned into a [`StatusPatch`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PatchError(String);

impl StatusPatch {
    #[must_use]
    pub fn with_status(mut self, status: AdoptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(Some(notes.into()));
        self
    }

    #[must_use]
    pub fn clearing_notes(mut self) -> Self {
        self.notes = Some(None);
        self
    }

    /// `true` when the patch only refreshes `updatedAt`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none()
    }

    /// Validate a JSON request body into a patch.
    ///
    /// A missing body is an empty patch. Anything other than a JSON object,
    /// unknown fields, a status outside the enum or non-string notes are
    /// rejected.
    pub fn from_body(body: Option<&serde_json::Value>) -> Result<Self, PatchError> {
        match body {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value @ serde_json::Value::Object(_)) => {
                Self::deserialize(value).map_err(|e| PatchError(e.to_string()))
            }
            Some(_) => Err(PatchError("request body must be a JSON object".to_string())),
        }
    }
}
