use tracing::{debug, info};

use super::address::{AddressError, BuildingRoster};
use super::domain::{PhoneError, PhoneNumber, Resident, Unit};
use crate::storage::{RecordStore, StoreError};

/// Residents known to the desk, in storage order. Registration appends; nothing is edited or
/// removed here.
pub struct ResidentDirectory<S> {
    store: S,
    roster: BuildingRoster,
    residents: Vec<Resident>,
}

impl<S> ResidentDirectory<S>
where
    S: RecordStore<Resident>,
{
    pub fn open(store: S, roster: BuildingRoster) -> Result<Self, StoreError> {
        let residents = store.load()?;
        Ok(Self {
            store,
            roster,
            residents,
        })
    }

    /// Picks up edits made to the store since the last load.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.residents = self.store.load()?;
        debug!(residents = self.residents.len(), "resident directory reloaded");
        Ok(())
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    /// Residents registered at `unit`, in the order they were added.
    pub fn find_by_unit(&self, unit: &Unit) -> Vec<&Resident> {
        self.residents
            .iter()
            .filter(|resident| &resident.unit == unit)
            .collect()
    }

    pub fn find_by_phone(&self, phone: &PhoneNumber) -> Option<&Resident> {
        self.residents
            .iter()
            .find(|resident| &resident.phone == phone)
    }

    /// Adds a resident, canonicalising `raw_phone` (11 digits) to `+55<digits>`.
    pub fn register(
        &mut self,
        name: &str,
        unit: &Unit,
        raw_phone: &str,
    ) -> Result<Resident, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::EmptyName);
        }

        let phone = PhoneNumber::from_local(raw_phone)?;
        self.roster.check(unit)?;

        if self.find_by_phone(&phone).is_some() {
            return Err(DirectoryError::DuplicatePhone(phone));
        }

        let resident = Resident {
            name: name.to_string(),
            unit: unit.clone(),
            phone,
        };

        let mut next = self.residents.clone();
        next.push(resident.clone());
        self.store.save(&next)?;
        self.residents = next;

        info!(unit = %resident.unit, phone = %resident.phone, "resident registered");
        Ok(resident)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("recipient name cannot be empty")]
    EmptyName,
    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),
    #[error("phone {0} is already registered")]
    DuplicatePhone(PhoneNumber),
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
