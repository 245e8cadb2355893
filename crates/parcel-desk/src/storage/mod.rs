//! Durable record sets behind the resident directory and the package ledger.
//!
//! Stores deal in whole sets: `load` returns every record and `save` replaces every record.
//! Indexing and business rules live in the workflow layer.

pub mod csv_file;
pub mod memory;

use std::path::PathBuf;

pub use csv_file::{CsvRecord, CsvStore};
pub use memory::MemoryStore;

/// Full-set persistence contract for one record type.
pub trait RecordStore<T>: Send + Sync {
    /// Current contents; an absent store is an empty set.
    fn load(&self) -> Result<Vec<T>, StoreError>;
    /// Overwrites the stored set with `records`.
    fn save(&self, records: &[T]) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid record in {} at line {line}: {reason}", path.display())]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
