//! # Adoption Status Service
//!
//! An OpenAPI-driven HTTP service, running on `may` coroutines, that updates
//! the adoption status record of a pet identified by its external `petId`.
//!
//! ## Overview
//!
//! One operation, `PUT /adoption/status/{petId}`, changes the record's
//! `status` (`not_adopted`, `reserved`, `adopted`) and free-text `notes`:
//!
//! - **200**: the full updated record
//!   (`{"petId", "status", "notes", "updatedAt"}`)
//! - **400**: the body is not a valid status update; nothing is written
//! - **404** `{"message": "Pet not found"}`: no record for that `petId`;
//!   nothing is created
//! - **500** `{"message": "Error updating status", "error"}`: the store failed
//!
//! ## Architecture
//!
//! - **[`spec`]** - loads `doc/openapi.yaml` into [`RouteMeta`] entries
//! - **[`router`]** - regex path matching with percent-decoded parameters
//! - **[`dispatcher`]** - handler coroutines fed over MPSC channels, with
//!   middleware around every call
//! - **[`server`]** - the `may_minihttp` service: built-in endpoints, CORS
//!   preflight, request body validation, dispatch
//! - **[`middleware`]** - CORS and request tracing
//! - **[`handlers`]** - the update handler; [`registry`] binds it by
//!   `operationId`
//! - **[`store`]** - keyed record persistence (SQLite or in-memory)
//! - **[`model`]** - records, statuses and patches
//! - **[`config`]**, **[`runtime_config`]**, **[`logging`]** - YAML plus
//!   environment configuration and `tracing` setup
//! - **[`app`]**, **[`cli`]** - wiring and the `adoption-status` binary
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as AppService<br/>(may_minihttp)
//!     participant Router
//!     participant Dispatcher
//!     participant Handler as UpdateStatusHandler<br/>(coroutine)
//!     participant Store as StatusStore
//!
//!     Client->>Server: PUT /adoption/status/pet123
//!     Server->>Server: Parse JSON body
//!     alt Malformed JSON or schema violation
//!         Server-->>Client: 400 Invalid request body
//!     end
//!     Server->>Router: route(PUT, path)
//!     alt No route
//!         Router-->>Client: 404 Not Found
//!     end
//!     Router-->>Server: RouteMatch {petId: "pet123"}
//!     Server->>Dispatcher: dispatch(route_match, body)
//!     Dispatcher->>Handler: HandlerRequest via channel
//!     Handler->>Store: update_by_pet_id(pet123, patch)
//!     alt No record
//!         Store-->>Handler: None
//!         Handler-->>Client: 404 Pet not found
//!     end
//!     Store-->>Handler: updated record
//!     Handler-->>Dispatcher: 200 + record
//!     Dispatcher->>Dispatcher: middleware after hooks (tracing, CORS)
//!     Dispatcher-->>Client: HTTP response
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use adoption_status::config::AppConfig;
//! use adoption_status::store::open_store;
//!
//! # fn main() -> anyhow::Result<()> {
//! adoption_status::runtime_config::RuntimeConfig::from_env().apply();
//! let config = AppConfig::load("config/config.yaml")?;
//! let store = open_store(&config.store)?;
//! let handle = adoption_status::app::serve(&config, &store)?;
//! handle.wait_ready()?;
//! # handle.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime Considerations
//!
//! - All handlers run in `may` coroutines, not on an async executor
//! - Stack size is configurable via `ADOPTION_STACK_SIZE`
//! - SQLite calls block the handler coroutine for the duration of one
//!   short transaction

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod model;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod static_files;
pub mod store;

pub use config::AppConfig;
pub use model::{AdoptionStatus, AdoptionStatusRecord, NewAdoptionStatus, StatusPatch};
pub use spec::{load_spec, RouteMeta};
pub use store::{open_store, StatusStore, StoreError};
