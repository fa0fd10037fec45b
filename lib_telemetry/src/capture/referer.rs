//! # Referrer Tracker
//!
//! Runs once per activation and remembers where the visitor came from, but
//! only when they arrived from somewhere outside the site. Clicking around
//! inside the site never rewrites the slot.
//!
//! Hosts are compared by the part before the TLD marker (`.com` by default).
//! The referrer is a full URL (`https://www.shop.com/cart`) while the current
//! host is bare (`www.shop.com`), so the check is containment: the referrer's
//! prefix must contain the host's prefix for the visit to count as internal.

use crate::storage::{read_slot, write_slot, SlotStore};

/// Slot holding the last external referrer.
pub const REFERER_SLOT: &str = "refererName";

/// What the tracker did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefererOutcome {
    /// There was no referrer to look at.
    NoReferrer,
    /// The referrer is this site.
    Internal,
    /// External referrer, already stored.
    Unchanged,
    /// External referrer, written to the slot.
    Recorded,
    /// External referrer, but the slot could not be written.
    WriteFailed,
}

/// Everything before the first `marker`, or the whole string when the marker
/// is empty or absent.
pub fn host_prefix<'a>(value: &'a str, marker: &str) -> &'a str {
    if marker.is_empty() {
        return value;
    }
    value.split(marker).next().unwrap_or(value)
}

/// Stores `referrer` if it points outside `current_host` and differs from
/// what is already stored.
pub fn record_referer_if_changed(
    store: &dyn SlotStore,
    referrer: Option<&str>,
    current_host: &str,
    tld_marker: &str,
) -> RefererOutcome {
    let referrer = match referrer {
        Some(r) if !r.is_empty() => r,
        _ => return RefererOutcome::NoReferrer,
    };

    if host_prefix(referrer, tld_marker).contains(host_prefix(current_host, tld_marker)) {
        return RefererOutcome::Internal;
    }

    if read_slot(store, REFERER_SLOT).as_deref() == Some(referrer) {
        return RefererOutcome::Unchanged;
    }

    // No retry; `write_slot` has already logged the failure.
    if write_slot(store, REFERER_SLOT, referrer) {
        log::info!("Recorded external referrer {}", referrer);
        RefererOutcome::Recorded
    } else {
        RefererOutcome::WriteFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StoreError};

    #[derive(Debug)]
    struct ReadOnlyStore;

    impl SlotStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".into()))
        }
    }

    const HOST: &str = "www.loramodas.com";

    #[test]
    fn test_host_prefix() {
        assert_eq!(host_prefix("https://www.google.com/search", ".com"), "https://www.google");
        assert_eq!(host_prefix("shop.example.org", ".com"), "shop.example.org");
        assert_eq!(host_prefix("anything", ""), "anything");
    }

    #[test]
    fn test_no_referrer_leaves_state_alone() {
        let store = MemoryStore::new();
        assert_eq!(record_referer_if_changed(&store, None, HOST, ".com"), RefererOutcome::NoReferrer);
        assert_eq!(record_referer_if_changed(&store, Some(""), HOST, ".com"), RefererOutcome::NoReferrer);
        assert!(store.get(REFERER_SLOT).unwrap().is_none());
    }

    #[test]
    fn test_internal_navigation_never_updates() {
        let store = MemoryStore::with_slots([(REFERER_SLOT, "https://www.google.com/")]);
        let outcome = record_referer_if_changed(
            &store,
            Some("https://www.loramodas.com/products/dress"),
            HOST,
            ".com",
        );
        assert_eq!(outcome, RefererOutcome::Internal);
        assert_eq!(
            store.get(REFERER_SLOT).unwrap().as_deref(),
            Some("https://www.google.com/")
        );
    }

    #[test]
    fn test_external_referrer_is_recorded_once() {
        let store = MemoryStore::new();
        let referrer = Some("https://www.facebook.com/");

        assert_eq!(record_referer_if_changed(&store, referrer, HOST, ".com"), RefererOutcome::Recorded);
        assert_eq!(record_referer_if_changed(&store, referrer, HOST, ".com"), RefererOutcome::Unchanged);
        assert_eq!(
            store.get(REFERER_SLOT).unwrap().as_deref(),
            Some("https://www.facebook.com/")
        );
    }

    #[test]
    fn test_different_external_referrer_overwrites() {
        let store = MemoryStore::with_slots([(REFERER_SLOT, "https://www.facebook.com/")]);
        let outcome =
            record_referer_if_changed(&store, Some("https://www.tiktok.com/@shop"), HOST, ".com");
        assert_eq!(outcome, RefererOutcome::Recorded);
        assert_eq!(
            store.get(REFERER_SLOT).unwrap().as_deref(),
            Some("https://www.tiktok.com/@shop")
        );
    }

    #[test]
    fn test_failed_write_is_reported() {
        let outcome = record_referer_if_changed(
            &ReadOnlyStore,
            Some("https://www.facebook.com/"),
            HOST,
            ".com",
        );
        assert_eq!(outcome, RefererOutcome::WriteFailed);
    }
}
