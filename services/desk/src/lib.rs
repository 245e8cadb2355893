mod cli;
mod console;
mod desk;
mod infra;
mod routes;
mod server;

use parcel_desk::error::AppError;

/// Entry point for the `parcel-desk` binary. Only `serve` starts an async runtime; the blocking
/// SMS client must never run inside one.
pub fn run() -> Result<(), AppError> {
    cli::run()
}
