//! # CLI Module
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Run the HTTP service:
//!
//! ```bash
//! adoption-status serve --config config/config.yaml --addr 0.0.0.0:3014
//! ```
//!
//! Configuration is layered: the YAML file, then `ADOPTION_*` environment
//! variables, then the flags. On SIGINT or SIGTERM the server stops
//! accepting requests and the store is closed.
//!
//! ### `seed`
//!
//! Create a record. The HTTP API only updates existing records, so this is
//! how records come into being:
//!
//! ```bash
//! adoption-status seed --pet-id pet123 --status reserved --notes "initial note"
//! ```

mod commands;


pub use commands::{run_cli, Cli, Commands};
