use crate::app;
use crate::config::{AppConfig, StoreBackend, DEFAULT_CONFIG_PATH};
use crate::model::{AdoptionStatus, NewAdoptionStatus};
use crate::server::ServerHandle;
use crate::store::{open_store, StatusStore};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line interface for the adoption status service
#[derive(Parser, Debug)]
#[command(name = "adoption-status", version)]
#[command(about = "Adoption status service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service until SIGINT or SIGTERM
    Serve {
        /// YAML configuration file; a missing file means defaults
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Listen address, overriding `http.addr`
        #[arg(long)]
        addr: Option<String>,

        /// OpenAPI document, overriding `docs.spec_path`
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Swagger UI directory, overriding `docs.doc_dir`
        #[arg(long)]
        doc_dir: Option<PathBuf>,
    },
    /// Create the adoption status record for a pet
    Seed {
        #[arg(long)]
        pet_id: String,

        /// Initial status: not_adopted, reserved or adopted
        #[arg(long, default_value_t = AdoptionStatus::NotAdopted)]
        status: AdoptionStatus,

        #[arg(long)]
        notes: Option<String>,

        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

impl Commands {
    /// Effective configuration: file, then environment, then flags.
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        match self {
            Commands::Serve {
                config,
                addr,
                spec,
                doc_dir,
            } => {
                let mut cfg = AppConfig::load(config)
                    .with_context(|| format!("failed to load config {}", config.display()))?;
                if let Some(addr) = addr {
                    cfg.http.addr = addr.clone();
                }
                if let Some(spec) = spec {
                    cfg.docs.spec_path = spec.clone();
                }
                if let Some(doc_dir) = doc_dir {
                    cfg.docs.doc_dir = Some(doc_dir.clone());
                }
                Ok(cfg)
            }
            Commands::Seed { config, .. } => AppConfig::load(config)
                .with_context(|| format!("failed to load config {}", config.display())),
        }
    }
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = cli.command.resolve_config()?;
    match cli.command {
        Commands::Serve { .. } => serve(&config),
        Commands::Seed {
            pet_id,
            status,
            notes,
            ..
        } => seed(&config, pet_id, status, notes),
    }
}

fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(&config.store).context("failed to open status store")?;
    let handle = app::serve(config, &store)?;
    let served = wait_for_shutdown(handle);
    close_store(&store);
    served
}

fn seed(
    config: &AppConfig,
    pet_id: String,
    status: AdoptionStatus,
    notes: Option<String>,
) -> anyhow::Result<()> {
    if config.store.backend == StoreBackend::Memory {
        warn!("Seeding the memory backend; the record is lost when this process exits");
    }
    let store = open_store(&config.store).context("failed to open status store")?;
    let mut new = NewAdoptionStatus::new(pet_id).with_status(status);
    if let Some(notes) = notes {
        new = new.with_notes(notes);
    }
    let inserted = store.insert(new);
    close_store(&store);
    let record = inserted.context("failed to create adoption status record")?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn close_store(store: &Arc<dyn StatusStore>) {
    match store.close() {
        Ok(()) => info!("Status store closed"),
        Err(e) => warn!(error = %e, "Failed to close status store"),
    }
}

/// Block until SIGINT/SIGTERM, then stop the server.
#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to register signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server terminated abnormally: {e:?}"))
}
