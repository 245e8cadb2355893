use metrics_exporter_prometheus::PrometheusHandle;
use parcel_desk::clock::SystemClock;
use parcel_desk::config::{AppConfig, NotificationConfig, StorageConfig};
use parcel_desk::error::AppError;
use parcel_desk::notify::{DryRunGateway, NoticeTemplates, NotificationGateway, TwilioGateway};
use parcel_desk::storage::{CsvStore, StoreError};
use parcel_desk::workflows::parcels::{
    BuildingRoster, Package, PackageLedger, PackageLifecycleEngine, Resident, ResidentDirectory,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type DeskEngine = PackageLifecycleEngine<CsvStore<Resident>, CsvStore<Package>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) storage: StorageConfig,
    pub(crate) roster: BuildingRoster,
}

impl AppState {
    /// Fresh read of the package file; the status service never writes.
    pub(crate) fn ledger(&self) -> Result<PackageLedger<CsvStore<Package>>, StoreError> {
        open_ledger(&self.storage, self.roster.clone())
    }
}

pub(crate) fn open_ledger(
    storage: &StorageConfig,
    roster: BuildingRoster,
) -> Result<PackageLedger<CsvStore<Package>>, StoreError> {
    PackageLedger::open(
        CsvStore::new(storage.packages_path.clone()),
        roster,
        Arc::new(SystemClock),
    )
}

pub(crate) fn notification_gateway(
    config: &NotificationConfig,
) -> Result<Arc<dyn NotificationGateway>, AppError> {
    match &config.twilio {
        Some(credentials) => {
            let gateway = TwilioGateway::new(credentials.clone(), &config.twilio_api_base)?;
            info!(from = %credentials.from_number, "sending SMS through Twilio");
            Ok(Arc::new(gateway))
        }
        None => {
            warn!("TWILIO_* credentials not set, SMS notifications will only be logged");
            Ok(Arc::new(DryRunGateway))
        }
    }
}

pub(crate) fn build_engine(config: &AppConfig) -> Result<DeskEngine, AppError> {
    let roster = BuildingRoster::standard();
    let directory = ResidentDirectory::open(
        CsvStore::new(config.storage.residents_path.clone()),
        roster.clone(),
    )?;
    let ledger = open_ledger(&config.storage, roster)?;
    let gateway = notification_gateway(&config.notifications)?;

    info!(
        residents = directory.residents().len(),
        packages = ledger.len(),
        "parcel desk records loaded"
    );

    Ok(PackageLifecycleEngine::new(
        directory,
        ledger,
        gateway,
        NoticeTemplates::new(config.notifications.building_name.clone()),
    ))
}
