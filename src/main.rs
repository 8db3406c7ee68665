use adoption_status::cli::{run_cli, Cli};
use adoption_status::logging::{init_logging, LogConfig};
use adoption_status::runtime_config::RuntimeConfig;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging = init_logging(&LogConfig::from_env())?;
    RuntimeConfig::from_env().apply();
    run_cli(cli)
}
