use crate::cli::PendingArgs;
use crate::console::{TerminalOperator, CANCEL_KEYWORD};
use crate::infra::{build_engine, open_ledger};
use parcel_desk::config::AppConfig;
use parcel_desk::error::AppError;
use parcel_desk::storage::RecordStore;
use parcel_desk::workflows::parcels::{
    render_pending, BuildingRoster, Operator, Package, PackageLifecycleEngine, PackageView,
    Resident,
};
use std::io::{self, Write};
use tracing::{error, info};

/// Interactive session: loops over the main menu until the operator quits or input ends.
pub(crate) fn run(config: &AppConfig) -> Result<(), AppError> {
    let mut engine = build_engine(config)?;
    let mut operator = TerminalOperator::stdio();
    info!(?config.environment, "parcel desk session started");
    run_menu(
        &mut engine,
        &mut operator,
        &config.notifications.building_name,
    );
    info!("parcel desk session ended");
    Ok(())
}

/// Handles a single scan, then exits.
pub(crate) fn scan_once(config: &AppConfig) -> Result<(), AppError> {
    let mut engine = build_engine(config)?;
    let mut operator = TerminalOperator::stdio();
    let outcome = engine.scan(&mut operator)?;
    info!(?outcome, "scan finished");
    Ok(())
}

pub(crate) fn print_pending(config: &AppConfig, args: PendingArgs) -> Result<(), AppError> {
    let roster = BuildingRoster::standard();
    let unit = roster.resolve(&args.unit)?;
    let ledger = open_ledger(&config.storage, roster)?;
    let pending = ledger.list_pending(&unit);

    if args.json {
        let views: Vec<PackageView> = pending.iter().map(|package| package.view()).collect();
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &views).map_err(io::Error::from)?;
        writeln!(stdout)?;
    } else {
        let packages: Vec<Package> = pending.into_iter().cloned().collect();
        let mut operator = TerminalOperator::stdio();
        operator.tell(&format!("=== Pending packages for {unit} ==="));
        render_pending(&mut operator, &packages);
    }
    Ok(())
}

pub(crate) fn run_menu<R, P>(
    engine: &mut PackageLifecycleEngine<R, P>,
    operator: &mut dyn Operator,
    building_name: &str,
) where
    R: RecordStore<Resident>,
    P: RecordStore<Package>,
{
    loop {
        operator.tell(&format!("=== {building_name} parcel desk ==="));
        operator.tell("1 - Scan a package");
        operator.tell("2 - Pending packages for an apartment");
        operator.tell("3 - Quit");
        operator.tell(&format!("Type {CANCEL_KEYWORD} at any prompt to cancel."));

        let Some(choice) = operator.ask("Select an option:") else {
            return;
        };

        let result = match choice.trim() {
            "1" => engine.scan(operator).map(|_| ()),
            "2" => engine.review_pending(operator).map(|_| ()),
            "3" => return,
            _ => {
                operator.tell("Invalid option. Try again.");
                Ok(())
            }
        };

        if let Err(err) = result {
            error!(error = %err, "desk operation failed");
            operator.tell(&format!("[ERROR] Operation failed: {err}"));
        }
    }
}
