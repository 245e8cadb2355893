use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used for `scan_datetime` in the record files and in messages.
pub const SCAN_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Country calling code prepended to every stored phone number.
pub const COUNTRY_PREFIX: &str = "+55";

const LOCAL_PHONE_DIGITS: usize = 11;

/// Carrier-assigned parcel identifier. Always trimmed, never empty, and compared as text so
/// leading zeros and letters survive untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block and apartment designator. Construction does not validate; see
/// [`BuildingRoster`](super::address::BuildingRoster).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub block: String,
    pub apartment: String,
}

impl Unit {
    pub fn new(block: impl Into<String>, apartment: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            apartment: apartment.into(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.block, self.apartment)
    }
}

/// Phone number in canonical `+55<11 digits>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Builds a canonical number from the 11-digit local form typed by the operator.
    pub fn from_local(raw: &str) -> Result<Self, PhoneError> {
        if !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::NonNumeric);
        }
        if raw.len() != LOCAL_PHONE_DIGITS {
            return Err(PhoneError::WrongLength { length: raw.len() });
        }

        Ok(Self(format!("{COUNTRY_PREFIX}{raw}")))
    }

    /// Adopts a number read back from storage, adding the country prefix when it is missing.
    pub fn canonicalize(stored: &str) -> Self {
        let trimmed = stored.trim();
        if trimmed.starts_with(COUNTRY_PREFIX) {
            Self(trimmed.to_string())
        } else {
            Self(format!("{COUNTRY_PREFIX}{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number must contain only digits")]
    NonNumeric,
    #[error("phone number must contain exactly 11 digits, got {length}")]
    WrongLength { length: usize },
}

/// A person who can receive packages at a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub name: String,
    pub unit: Unit,
    pub phone: PhoneNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// At the front desk, waiting for the resident.
    Delivered,
    /// Picked up. Terminal.
    Collected,
}

impl PackageStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Collected => "collected",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "delivered" => Some(Self::Delivered),
            "collected" => Some(Self::Collected),
            _ => None,
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ledger entry for a single tracking code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub tracking_code: TrackingCode,
    pub unit: Unit,
    pub recipient: String,
    pub phone: PhoneNumber,
    /// Time of the most recent transition.
    pub scan_datetime: NaiveDateTime,
    pub status: PackageStatus,
}

impl Package {
    pub fn scanned_at_label(&self) -> String {
        self.scan_datetime.format(SCAN_DATETIME_FORMAT).to_string()
    }

    pub fn view(&self) -> PackageView {
        PackageView {
            tracking_code: self.tracking_code.to_string(),
            block: self.unit.block.clone(),
            apartment: self.unit.apartment.clone(),
            recipient: self.recipient.clone(),
            status: self.status.label(),
            scanned_at: self.scanned_at_label(),
        }
    }
}

/// Public representation of a package; the recipient's phone is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageView {
    pub tracking_code: String,
    pub block: String,
    pub apartment: String,
    pub recipient: String,
    pub status: &'static str,
    pub scanned_at: String,
}
