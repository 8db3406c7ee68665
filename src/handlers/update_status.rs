//! `PUT /adoption/status/{petId}` (`update_status_by_pet_id`).

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::model::{AdoptionStatusRecord, StatusPatch};
use crate::store::{StatusStore, StoreError};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const OPERATION_ID: &str = "update_status_by_pet_id";
pub const PET_ID_PARAM: &str = "petId";

/// Terminal outcome of one update request.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(AdoptionStatusRecord),
    NotFound,
    Invalid(String),
    Fault(StoreError),
}

impl UpdateOutcome {
    /// HTTP rendering of the outcome.
    #[must_use]
    pub fn into_response(self) -> HandlerResponse {
        match self {
            UpdateOutcome::Updated(record) => match serde_json::to_value(&record) {
                Ok(body) => HandlerResponse::json(200, body),
                Err(e) => HandlerResponse::error(500, "Error updating status", e),
            },
            UpdateOutcome::NotFound => HandlerResponse::json(404, json!({ "message": "Pet not found" })),
            UpdateOutcome::Invalid(detail) => {
                HandlerResponse::error(400, "Invalid status update", detail)
            }
            UpdateOutcome::Fault(e) => HandlerResponse::error(500, "Error updating status", e),
        }
    }
}

/// Applies status/notes updates to the record of the pet named in the path.
///
/// The store is injected at construction; the handler holds no other state.
#[derive(Clone)]
pub struct UpdateStatusHandler {
    store: Arc<dyn StatusStore>,
}

impl UpdateStatusHandler {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Validate the request and run the update.
    ///
    /// The store is not touched unless the body is a valid patch.
    pub fn update(&self, pet_id: Option<&str>, body: Option<&serde_json::Value>) -> UpdateOutcome {
        let Some(pet_id) = pet_id.filter(|id| !id.is_empty()) else {
            return UpdateOutcome::Invalid("petId path parameter is required".to_string());
        };
        let patch = match StatusPatch::from_body(body) {
            Ok(patch) => patch,
            Err(e) => return UpdateOutcome::Invalid(e.to_string()),
        };
        debug!(pet_id = %pet_id, ?patch, "Applying status update");

        match self.store.update_by_pet_id(pet_id, &patch) {
            Ok(Some(record)) => {
                info!(pet_id = %pet_id, status = %record.status, "Adoption status updated");
                UpdateOutcome::Updated(record)
            }
            Ok(None) => {
                info!(pet_id = %pet_id, "No adoption status record for pet");
                UpdateOutcome::NotFound
            }
            Err(e) => {
                error!(pet_id = %pet_id, error = %e, "Adoption status update failed");
                UpdateOutcome::Fault(e)
            }
        }
    }

    /// Handle one dispatched request.
    pub fn handle(&self, req: &HandlerRequest) -> HandlerResponse {
        self.update(req.get_path_param(PET_ID_PARAM), req.body.as_ref())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdoptionStatus, NewAdoptionStatus};
    use crate::store::MemoryStatusStore;

    fn seeded() -> (Arc<MemoryStatusStore>, UpdateStatusHandler) {
        let store = Arc::new(MemoryStatusStore::new());
        store
            .insert(
                NewAdoptionStatus::new("pet123")
                    .with_status(AdoptionStatus::Reserved)
                    .with_notes("initial note"),
            )
            .unwrap();
        let handler = UpdateStatusHandler::new(Arc::clone(&store) as Arc<dyn StatusStore>);
        (store, handler)
    }

    #[test]
    fn test_success_returns_record() {
        let (_store, handler) = seeded();
        let body = json!({"status": "adopted", "notes": "Updated successfully"});
        let resp = handler.update(Some("pet123"), Some(&body)).into_response();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["petId"], "pet123");
        assert_eq!(resp.body["status"], "adopted");
        assert_eq!(resp.body["notes"], "Updated successfully");
        assert!(resp.body["updatedAt"].is_string());
    }

    #[test]
    fn test_missing_pet_is_404() {
        let (store, handler) = seeded();
        let body = json!({"status": "adopted"});
        let resp = handler.update(Some("ghost"), Some(&body)).into_response();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, json!({"message": "Pet not found"}));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_invalid_status_leaves_record_unchanged() {
        let (store, handler) = seeded();
        let body = json!({"status": "available"});
        let resp = handler.update(Some("pet123"), Some(&body)).into_response();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["message"], "Invalid status update");
        let record = store.find_by_pet_id("pet123").unwrap().unwrap();
        assert_eq!(record.status, AdoptionStatus::Reserved);
    }

    #[test]
    fn test_closed_store_is_500() {
        let (store, handler) = seeded();
        store.close().unwrap();
        let body = json!({"status": "adopted"});
        let resp = handler.update(Some("pet123"), Some(&body)).into_response();
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["message"], "Error updating status");
        assert_eq!(resp.body["error"], "store is closed");
    }

    #[test]
    fn test_missing_pet_id_is_invalid() {
        let (_store, handler) = seeded();
        assert!(matches!(handler.update(None, None), UpdateOutcome::Invalid(_)));
        assert!(matches!(handler.update(Some(""), None), UpdateOutcome::Invalid(_)));
    }
}
