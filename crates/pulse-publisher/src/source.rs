//! Load sources.
//!
//! A load source is any supplier of a scalar reading. Readings are
//! clamped into `[0, 1]` by the publisher, so sources need not be exact.

use std::sync::atomic::{AtomicU64, Ordering};

use pulse_core::LoadValue;

/// Supplies the current load on demand.
///
/// Called once per intercepted request; implementations must not block
/// and must always return a value.
pub trait LoadSource: Send + Sync {
    fn load(&self) -> f64;
}

impl<F> LoadSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn load(&self) -> f64 {
        self()
    }
}

/// A manually-set load held in an atomic slot.
///
/// The default source for a publisher; useful for simulation and tests.
#[derive(Debug)]
pub struct StaticLoad {
    bits: AtomicU64,
}

impl StaticLoad {
    pub fn new(initial: f64) -> Self {
        Self {
            bits: AtomicU64::new(LoadValue::clamped(initial).get().to_bits()),
        }
    }

    /// Store a new reading, clamped into range.
    pub fn set(&self, value: f64) -> LoadValue {
        let clamped = LoadValue::clamped(value);
        self.bits.store(clamped.get().to_bits(), Ordering::Relaxed);
        clamped
    }

    pub fn get(&self) -> LoadValue {
        LoadValue::clamped(f64::from_bits(self.bits.load(Ordering::Relaxed)))
    }
}

impl Default for StaticLoad {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl LoadSource for StaticLoad {
    fn load(&self) -> f64 {
        self.get().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_load_defaults_to_idle() {
        assert_eq!(StaticLoad::default().load(), 0.0);
    }

    #[test]
    fn static_load_clamps() {
        let source = StaticLoad::new(0.2);
        assert_eq!(source.set(1.7).get(), 1.0);
        assert_eq!(source.load(), 1.0);
        assert_eq!(source.set(-0.2).get(), 0.0);
        assert_eq!(source.load(), 0.0);
    }

    #[test]
    fn closures_are_sources() {
        let source = || 0.42;
        assert_eq!(LoadSource::load(&source), 0.42);
    }
}
