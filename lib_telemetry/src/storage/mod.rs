//! # Slot Storage
//!
//! Persistent, named string slots that outlive a single pipeline activation.
//! This is the process-side stand-in for browser `localStorage`: a plain
//! get/set surface with no expiry.
//!
//! Callers inside the pipeline never see a `StoreError`. They go through
//! [`read_slot`] and [`write_slot`], which log the failure and degrade to
//! "absent" / "not written".

use std::fmt;

use thiserror::Error;

/// Process-local slot store.
pub mod memory;
/// JSON-file backed slot store, durable across runs.
pub mod file;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors a slot store can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read or written.
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    /// The backing medium holds something that is not a slot map.
    #[error("Corrupt slot storage: {0}")]
    Corrupt(String),

    /// The store refuses all access.
    #[error("Slot storage unavailable: {0}")]
    Unavailable(String),
}

/// A named string key/value store.
///
/// Implementations must be usable from several tasks at once; the pipeline
/// itself only ever reads and then conditionally writes.
pub trait SlotStore: Send + Sync + fmt::Debug {
    /// Reads a slot. `Ok(None)` means the slot was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrites a slot.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Reads `key`, folding every storage failure into "absent".
pub fn read_slot(store: &dyn SlotStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Slot '{}' unreadable, treating as absent: {}", key, e);
            None
        }
    }
}

/// Writes `key`, logging instead of returning a failure.
///
/// Returns whether the write went through.
pub fn write_slot(store: &dyn SlotStore, key: &str, value: &str) -> bool {
    match store.set(key, value) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Slot '{}' could not be written: {}", key, e);
            false
        }
    }
}
