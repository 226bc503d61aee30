//! Per-category count calibration.
//!
//! A reference photo with a known fruit count teaches the engine a scalar
//! correction factor per category. Factors live in the owning engine, not
//! in any global state, and survive only for the engine's lifetime.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::profile::FruitKind;

/// Correction factors keyed by category. Missing keys read as 1.0.
///
/// Interior mutability lets a shared engine calibrate and detect through
/// `&self` from multiple threads; the write lock serializes updates.
#[derive(Debug, Default)]
pub struct CalibrationStore {
    factors: RwLock<HashMap<FruitKind, f64>>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current factor for `kind`.
    pub fn factor(&self, kind: FruitKind) -> f64 {
        let map = self.factors.read().unwrap_or_else(|e| e.into_inner());
        map.get(&kind).copied().unwrap_or(1.0)
    }

    /// Learn `expected / raw` for `kind` and return the factor now in
    /// effect. Degenerate inputs (zero expected count or zero raw count)
    /// leave the store untouched.
    pub fn learn(&self, kind: FruitKind, expected: u32, raw: u32) -> f64 {
        if expected == 0 || raw == 0 {
            return self.factor(kind);
        }
        let factor = expected as f64 / raw as f64;
        let mut map = self.factors.write().unwrap_or_else(|e| e.into_inner());
        map.insert(kind, factor);
        factor
    }

    /// Apply the stored factor to a raw count.
    ///
    /// The corrected count rounds to the nearest integer and a non-zero raw
    /// count never corrects below 1.
    pub fn apply(&self, kind: FruitKind, raw: u32) -> u32 {
        let corrected = (raw as f64 * self.factor(kind)).round() as u32;
        if raw > 0 {
            corrected.max(1)
        } else {
            corrected
        }
    }

    /// Drop every learned factor.
    pub fn reset(&self) {
        let mut map = self.factors.write().unwrap_or_else(|e| e.into_inner());
        map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_categories_read_as_identity() {
        let store = CalibrationStore::new();
        assert_eq!(store.factor(FruitKind::Plum), 1.0);
        assert_eq!(store.apply(FruitKind::Plum, 7), 7);
    }

    #[test]
    fn learn_then_apply_round_trips() {
        let store = CalibrationStore::new();
        let factor = store.learn(FruitKind::Apple, 12, 4);
        assert_eq!(factor, 3.0);
        assert_eq!(store.apply(FruitKind::Apple, 4), 12);
        // Other categories stay untouched.
        assert_eq!(store.factor(FruitKind::Cherry), 1.0);
    }

    #[test]
    fn degenerate_inputs_leave_the_factor_alone() {
        let store = CalibrationStore::new();
        store.learn(FruitKind::Pear, 10, 5);
        assert_eq!(store.factor(FruitKind::Pear), 2.0);

        assert_eq!(store.learn(FruitKind::Pear, 0, 4), 2.0);
        assert_eq!(store.learn(FruitKind::Pear, 9, 0), 2.0);
        assert_eq!(store.factor(FruitKind::Pear), 2.0);
    }

    #[test]
    fn nonzero_raw_never_corrects_to_zero() {
        let store = CalibrationStore::new();
        store.learn(FruitKind::Cherry, 1, 10);
        assert_eq!(store.factor(FruitKind::Cherry), 0.1);
        assert_eq!(store.apply(FruitKind::Cherry, 2), 1);
        assert_eq!(store.apply(FruitKind::Cherry, 0), 0);
    }

    #[test]
    fn reset_restores_identity() {
        let store = CalibrationStore::new();
        store.learn(FruitKind::Apple, 6, 2);
        store.reset();
        assert_eq!(store.factor(FruitKind::Apple), 1.0);
    }

    #[test]
    fn concurrent_learn_and_apply_do_not_poison() {
        use std::sync::Arc;
        let store = Arc::new(CalibrationStore::new());
        let mut handles = Vec::new();
        for i in 1..=4u32 {
            let s = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    s.learn(FruitKind::Apple, i * 2, i);
                    let _ = s.apply(FruitKind::Apple, i);
                }
            }));
        }
        for t in handles {
            t.join().unwrap();
        }
        // Every writer stored expected/raw = 2.0.
        assert_eq!(store.factor(FruitKind::Apple), 2.0);
    }
}
