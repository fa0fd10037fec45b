use std::collections::HashMap;
use std::sync::Mutex;

use super::{SlotStore, StoreError};

/// Slots held in a `HashMap` for the life of the process.
///
/// Useful for embedding and tests; two pipelines sharing one `MemoryStore`
/// behave like two page loads in the same browser.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `slots`.
    pub fn with_slots<I, K, V>(slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = slots
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            slots: Mutex::new(map),
        }
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().expect("MemoryStore lock poisoned");
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().expect("MemoryStore lock poisoned");
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
