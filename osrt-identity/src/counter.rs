//! Per-signer monotonic counter tracking.
//!
//! The access-key validator requires the counter carried by a key to
//! strictly exceed the largest counter previously seen from that signer.
//! Whether a future `sync(to:)`-style hook may lower the recorded counter
//! is left unspecified upstream; this implementation treats the counter as
//! strictly non-decreasing (see DESIGN.md).

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct CounterStore {
    seen: RwLock<HashMap<String, u64>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `counter` iff it strictly exceeds the
    /// largest counter previously seen from `signer`.
    pub fn check_and_advance(&self, signer: &str, counter: u64) -> bool {
        let key = signer.to_ascii_lowercase();
        let mut seen = self.seen.write().unwrap();
        let last = seen.get(&key).copied().unwrap_or(0);
        if counter > last {
            seen.insert(key, counter);
            true
        } else {
            false
        }
    }

    pub fn sync_to(&self, signer: &str, counter: u64) {
        let key = signer.to_ascii_lowercase();
        let mut seen = self.seen.write().unwrap();
        let entry = seen.entry(key).or_insert(0);
        *entry = (*entry).max(counter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_counter_from_a_signer_is_accepted() {
        let store = CounterStore::new();
        assert!(store.check_and_advance("0xabc", 1));
    }

    #[test]
    fn replayed_counter_is_rejected() {
        let store = CounterStore::new();
        assert!(store.check_and_advance("0xabc", 5));
        assert!(!store.check_and_advance("0xabc", 5));
        assert!(!store.check_and_advance("0xabc", 3));
    }

    #[test]
    fn strictly_increasing_counters_are_accepted() {
        let store = CounterStore::new();
        assert!(store.check_and_advance("0xabc", 1));
        assert!(store.check_and_advance("0xabc", 2));
        assert!(store.check_and_advance("0xabc", 100));
    }

    #[test]
    fn counters_are_independent_per_signer() {
        let store = CounterStore::new();
        assert!(store.check_and_advance("0xabc", 5));
        assert!(store.check_and_advance("0xdef", 1));
    }

    #[test]
    fn sync_to_never_lowers_recorded_counter() {
        let store = CounterStore::new();
        store.check_and_advance("0xabc", 10);
        store.sync_to("0xabc", 3);
        assert!(!store.check_and_advance("0xabc", 10));
        assert!(store.check_and_advance("0xabc", 11));
    }
}
