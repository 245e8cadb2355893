use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{RecordStore, StoreError};

/// In-process record set. Clones share the same records, so a test can keep a handle while the
/// workflow owns another.
#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    records: Arc<Mutex<Vec<T>>>,
    unavailable: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn with_records(records: Vec<T>) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.records.lock() {
            *guard = records;
        }
        store
    }

    pub fn records(&self) -> Vec<T> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Replaces the contents without counting as a save, like an out-of-band edit.
    pub fn replace(&self, records: Vec<T>) {
        if let Ok(mut guard) = self.records.lock() {
            *guard = records;
        }
    }

    /// Makes every subsequent load and save fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

impl<T: Clone + Send> RecordStore<T> for MemoryStore<T> {
    fn load(&self) -> Result<Vec<T>, StoreError> {
        self.ensure_available()?;
        let guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, records: &[T]) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut guard = self
            .records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        *guard = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
