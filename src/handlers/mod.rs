//! Request handlers, one module per OpenAPI operation.

pub mod update_status;

pub use update_status::{UpdateOutcome, UpdateStatusHandler};
