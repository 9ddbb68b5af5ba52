use std::collections::HashMap;

use uuid::Uuid;
use weld_kernel::CounterStore;

/// Session variable holding the last weld number handed out.
pub const WELD_NUMBER_KEY: &str = "weldNumber";

/// Sequential weld numbering over a [`CounterStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WeldCounter;

impl WeldCounter {
    /// Last number handed out, 0 if none.
    pub fn get(&self, store: &dyn CounterStore) -> u64 {
        store.get_counter(WELD_NUMBER_KEY).unwrap_or(0)
    }

    /// Hand out the next number together with its body name.
    pub fn increment(&self, store: &mut dyn CounterStore, label: &str) -> (u64, String) {
        let number = self.get(store) + 1;
        store.set_counter(WELD_NUMBER_KEY, number);
        (number, Self::name(number, label))
    }

    pub fn name(number: u64, label: &str) -> String {
        format!("Weld {number} ({label})")
    }
}

/// In-memory counter store that outlives kernel session regeneration.
#[derive(Debug, Clone, Default)]
pub struct SessionCounters {
    values: HashMap<String, u64>,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl CounterStore for SessionCounters {
    fn get_counter(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    fn set_counter(&mut self, key: &str, value: u64) {
        self.values.insert(key.to_string(), value);
    }
}

/// Weld numbers a feature received, valid while its configuration is
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub fingerprint: String,
    pub numbers: Vec<u64>,
}

/// Per-feature reservations, so re-evaluating an unchanged feature names its
/// bodies the same way instead of counting again.
#[derive(Debug, Clone, Default)]
pub struct Reservations {
    entries: HashMap<Uuid, Reservation>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers to reuse for `feature`, empty when its fingerprint changed.
    pub fn reusable(&self, feature: Uuid, fingerprint: &str) -> &[u64] {
        match self.entries.get(&feature) {
            Some(r) if r.fingerprint == fingerprint => &r.numbers,
            _ => &[],
        }
    }

    pub fn record(&mut self, feature: Uuid, fingerprint: String, numbers: Vec<u64>) {
        self.entries.insert(
            feature,
            Reservation {
                fingerprint,
                numbers,
            },
        );
    }

    pub fn get(&self, feature: Uuid) -> Option<&Reservation> {
        self.entries.get(&feature)
    }

    pub fn release(&mut self, feature: Uuid) {
        self.entries.remove(&feature);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_sequential_per_store() {
        let mut store = SessionCounters::new();
        let counter = WeldCounter;
        assert_eq!(counter.get(&store), 0);
        assert_eq!(counter.increment(&mut store, "V-Butt"), (1, "Weld 1 (V-Butt)".to_string()));
        assert_eq!(counter.increment(&mut store, "Fillet").1, "Weld 2 (Fillet)");
        assert_eq!(counter.get(&store), 2);
    }

    #[test]
    fn counting_resumes_from_stored_value() {
        let mut store = SessionCounters::new();
        store.set_counter(WELD_NUMBER_KEY, 7);
        assert_eq!(WeldCounter.increment(&mut store, "Fillet").0, 8);
        store.clear();
        assert_eq!(WeldCounter.get(&store), 0);
    }

    #[test]
    fn reservation_is_dropped_when_fingerprint_changes() {
        let id = Uuid::new_v4();
        let mut reservations = Reservations::new();
        reservations.record(id, "a".into(), vec![3, 4]);
        assert_eq!(reservations.reusable(id, "a"), &[3, 4]);
        assert!(reservations.reusable(id, "b").is_empty());
        assert!(reservations.reusable(Uuid::new_v4(), "a").is_empty());
        reservations.release(id);
        assert!(reservations.get(id).is_none());
    }
}
