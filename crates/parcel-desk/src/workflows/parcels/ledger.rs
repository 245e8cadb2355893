use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::address::{AddressError, BuildingRoster};
use super::domain::{Package, PackageStatus, PhoneNumber, TrackingCode, Unit};
use crate::clock::Clock;
use crate::storage::{RecordStore, StoreError};

/// Packages indexed by tracking code, kept in storage (insertion) order.
pub struct PackageLedger<S> {
    store: S,
    roster: BuildingRoster,
    clock: Arc<dyn Clock>,
    packages: Vec<Package>,
    index: HashMap<TrackingCode, usize>,
}

impl<S> PackageLedger<S>
where
    S: RecordStore<Package>,
{
    pub fn open(
        store: S,
        roster: BuildingRoster,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let mut ledger = Self {
            store,
            roster,
            clock,
            packages: Vec::new(),
            index: HashMap::new(),
        };
        ledger.reload()?;
        Ok(ledger)
    }

    /// Re-reads the store. When a file holds the same code more than once, the first row wins.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let packages = self.store.load()?;
        let mut index = HashMap::with_capacity(packages.len());
        for (position, package) in packages.iter().enumerate() {
            if index.contains_key(&package.tracking_code) {
                warn!(
                    tracking_code = %package.tracking_code,
                    "duplicate tracking code in ledger, keeping first entry"
                );
                continue;
            }
            index.insert(package.tracking_code.clone(), position);
        }

        debug!(packages = packages.len(), "package ledger reloaded");
        self.packages = packages;
        self.index = index;
        Ok(())
    }

    pub fn roster(&self) -> &BuildingRoster {
        &self.roster
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn find_by_tracking_code(&self, code: &TrackingCode) -> Option<&Package> {
        self.index
            .get(code)
            .and_then(|position| self.packages.get(*position))
    }

    /// Records a freshly delivered package.
    pub fn create(
        &mut self,
        tracking_code: TrackingCode,
        unit: &Unit,
        recipient: &str,
        phone: PhoneNumber,
    ) -> Result<Package, LedgerError> {
        if self.index.contains_key(&tracking_code) {
            return Err(LedgerError::DuplicateTrackingCode(tracking_code));
        }
        self.roster.check(unit)?;

        let package = Package {
            tracking_code,
            unit: unit.clone(),
            recipient: recipient.to_string(),
            phone,
            scan_datetime: self.clock.now(),
            status: PackageStatus::Delivered,
        };

        let mut next = self.packages.clone();
        next.push(package.clone());
        self.store.save(&next)?;

        self.index.insert(package.tracking_code.clone(), next.len() - 1);
        self.packages = next;

        info!(
            tracking_code = %package.tracking_code,
            unit = %package.unit,
            status = %package.status,
            "package registered"
        );
        Ok(package)
    }

    /// Moves a `delivered` package to `collected` and restamps it.
    pub fn mark_collected(&mut self, tracking_code: &TrackingCode) -> Result<Package, LedgerError> {
        let position = *self
            .index
            .get(tracking_code)
            .ok_or_else(|| LedgerError::NotFound(tracking_code.clone()))?;

        let current = self.packages[position].status;
        if current != PackageStatus::Delivered {
            return Err(LedgerError::InvalidTransition {
                tracking_code: tracking_code.clone(),
                status: current,
            });
        }

        let mut next = self.packages.clone();
        let package = &mut next[position];
        package.status = PackageStatus::Collected;
        package.scan_datetime = self.clock.now();
        let collected = package.clone();

        self.store.save(&next)?;
        self.packages = next;

        info!(
            tracking_code = %collected.tracking_code,
            unit = %collected.unit,
            status = %collected.status,
            "package collected"
        );
        Ok(collected)
    }

    /// Packages still waiting at the desk for `unit`.
    pub fn list_pending(&self, unit: &Unit) -> Vec<&Package> {
        self.packages
            .iter()
            .enumerate()
            .filter(|(position, package)| {
                package.status == PackageStatus::Delivered
                    && &package.unit == unit
                    && self.index.get(&package.tracking_code) == Some(position)
            })
            .map(|(_, package)| package)
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("package {0} is already registered")]
    DuplicateTrackingCode(TrackingCode),
    #[error("package {0} was not found")]
    NotFound(TrackingCode),
    #[error("package {tracking_code} is already {status}; no further changes are allowed")]
    InvalidTransition {
        tracking_code: TrackingCode,
        status: PackageStatus,
    },
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
