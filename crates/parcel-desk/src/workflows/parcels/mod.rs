//! Parcel desk workflow: scanning tracking codes, resolving recipients, and moving packages
//! from `delivered` to `collected`.

pub mod address;
pub mod directory;
pub mod domain;
pub mod engine;
pub mod ledger;

#[cfg(test)]
mod tests;

pub use address::{parse_address, AddressError, BuildingRoster};
pub use directory::{DirectoryError, ResidentDirectory};
pub use domain::{
    Package, PackageStatus, PackageView, PhoneError, PhoneNumber, Resident, TrackingCode, Unit,
    SCAN_DATETIME_FORMAT,
};
pub use engine::{
    render_pending, EngineError, Operator, PackageLifecycleEngine, PendingReview, ScanOutcome,
};
pub use ledger::{LedgerError, PackageLedger};
