use std::ffi::OsString;
use std::fs::File;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RecordStore, StoreError};
use crate::workflows::parcels::domain::{
    Package, PackageStatus, PhoneNumber, Resident, TrackingCode, Unit, SCAN_DATETIME_FORMAT,
};

/// Mapping between a domain record and its flat, all-text CSV row.
pub trait CsvRecord: Sized {
    type Row: Serialize + DeserializeOwned;

    /// Column names, in file order.
    const HEADERS: &'static [&'static str];

    fn to_row(&self) -> Self::Row;
    fn from_row(row: Self::Row) -> Result<Self, String>;
}

/// Record set kept in a single CSV file that is rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct CsvStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> CsvStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging: OsString = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl<T: CsvRecord> CsvStore<T> {
    fn write_staged(&self, staging: &Path, records: &[T]) -> Result<(), StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(staging)
            .map_err(|err| self.csv_error(err))?;

        writer
            .write_record(T::HEADERS)
            .map_err(|err| self.csv_error(err))?;
        for record in records {
            writer
                .serialize(record.to_row())
                .map_err(|err| self.csv_error(err))?;
        }

        let file = writer
            .into_inner()
            .map_err(|err| self.io_error(err.into_error()))?;
        file.sync_all().map_err(|err| self.io_error(err))
    }
}

impl<T: CsvRecord> RecordStore<T> for CsvStore<T> {
    fn load(&self) -> Result<Vec<T>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "record file missing, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = reader
            .headers()
            .map_err(|err| self.csv_error(err))?
            .clone();

        let mut records = Vec::new();
        for result in reader.records() {
            let raw = result.map_err(|err| self.csv_error(err))?;
            let line = raw.position().map_or(0, |position| position.line());
            let row: T::Row = raw
                .deserialize(Some(&headers))
                .map_err(|err| self.csv_error(err))?;
            let record = T::from_row(row).map_err(|reason| StoreError::InvalidRecord {
                path: self.path.clone(),
                line,
                reason,
            })?;
            records.push(record);
        }

        debug!(path = %self.path.display(), records = records.len(), "loaded record file");
        Ok(records)
    }

    fn save(&self, records: &[T]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }

        let staging = self.staging_path();
        self.write_staged(&staging, records)
            .and_then(|()| std::fs::rename(&staging, &self.path).map_err(|err| self.io_error(err)))
            .map_err(|err| {
                let _ = std::fs::remove_file(&staging);
                err
            })?;
        debug!(path = %self.path.display(), records = records.len(), "saved record file");
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResidentRow {
    name: String,
    block: String,
    apartment: String,
    phone: String,
}

impl CsvRecord for Resident {
    type Row = ResidentRow;

    const HEADERS: &'static [&'static str] = &["name", "block", "apartment", "phone"];

    fn to_row(&self) -> Self::Row {
        ResidentRow {
            name: self.name.clone(),
            block: self.unit.block.clone(),
            apartment: self.unit.apartment.clone(),
            phone: self.phone.to_string(),
        }
    }

    fn from_row(row: Self::Row) -> Result<Self, String> {
        if row.phone.trim().is_empty() {
            return Err(format!("resident '{}' has no phone", row.name));
        }

        Ok(Resident {
            name: row.name,
            unit: Unit::new(row.block, row.apartment),
            phone: PhoneNumber::canonicalize(&row.phone),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackageRow {
    tracking_code: String,
    block: String,
    apartment: String,
    recipient: String,
    phone: String,
    scan_datetime: String,
    status: String,
}

impl CsvRecord for Package {
    type Row = PackageRow;

    const HEADERS: &'static [&'static str] = &[
        "tracking_code",
        "block",
        "apartment",
        "recipient",
        "phone",
        "scan_datetime",
        "status",
    ];

    fn to_row(&self) -> Self::Row {
        PackageRow {
            tracking_code: self.tracking_code.to_string(),
            block: self.unit.block.clone(),
            apartment: self.unit.apartment.clone(),
            recipient: self.recipient.clone(),
            phone: self.phone.to_string(),
            scan_datetime: self.scanned_at_label(),
            status: self.status.label().to_string(),
        }
    }

    fn from_row(row: Self::Row) -> Result<Self, String> {
        let tracking_code = TrackingCode::parse(&row.tracking_code)
            .ok_or_else(|| "tracking_code is empty".to_string())?;
        let scan_datetime = NaiveDateTime::parse_from_str(&row.scan_datetime, SCAN_DATETIME_FORMAT)
            .map_err(|err| format!("scan_datetime '{}': {err}", row.scan_datetime))?;
        let status = PackageStatus::from_label(&row.status)
            .ok_or_else(|| format!("unknown status '{}'", row.status))?;

        Ok(Package {
            tracking_code,
            unit: Unit::new(row.block, row.apartment),
            recipient: row.recipient,
            phone: PhoneNumber::canonicalize(&row.phone),
            scan_datetime,
            status,
        })
    }
}
