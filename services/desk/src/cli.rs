use crate::{desk, server};
use clap::{Args, Parser, Subcommand};
use parcel_desk::config::{AppConfig, StorageConfig};
use parcel_desk::error::AppError;
use parcel_desk::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Parcel Desk",
    about = "Register, notify and hand over resident packages at the front desk",
    version
)]
struct Cli {
    /// Directory holding residents.csv and packages.csv (overrides PARCEL_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive front-desk menu (default command)
    Desk,
    /// Scan one tracking code and exit
    Scan,
    /// Print the packages waiting at the desk for one apartment
    Pending(PendingArgs),
    /// Start the read-only HTTP status service
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub(crate) struct PendingArgs {
    /// Block and apartment, e.g. 4204 for block 4, apartment 204
    pub(crate) unit: String,
    /// Emit JSON instead of the desk listing
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.data_dir {
        config.storage = StorageConfig::in_dir(dir);
    }

    telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Desk) {
        Command::Desk => desk::run(&config),
        Command::Scan => desk::scan_once(&config),
        Command::Pending(args) => desk::print_pending(&config, args),
        Command::Serve(args) => server::run(config, args),
    }
}
