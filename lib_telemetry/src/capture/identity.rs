use uuid::Uuid;

use crate::storage::{read_slot, write_slot, SlotStore};

/// Slot holding the client identifier.
pub const CLIENT_ID_SLOT: &str = "uid";

/// Returns the stored client id, creating and persisting one if needed.
///
/// Only an absent, empty or unreadable slot triggers generation, so a flaky
/// store can hand out a new id on a later activation. A failed write is
/// logged and the fresh id is returned anyway.
pub fn resolve_client_id(store: &dyn SlotStore) -> String {
    if let Some(existing) = read_slot(store, CLIENT_ID_SLOT).filter(|id| !id.is_empty()) {
        return existing;
    }

    let fresh = Uuid::new_v4().to_string();
    if write_slot(store, CLIENT_ID_SLOT, &fresh) {
        log::info!("Generated new client id {}", fresh);
    }
    fresh
}
