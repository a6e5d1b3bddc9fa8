//! State shared between the cpal input callback and the control side.
//!
//! Everything here is touched from the real-time callback, so it is plain
//! atomics: no locks, no allocation.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicU64, Ordering};

/// Linear input gain, applied per sample in the callback. Range: 0.0 to 2.0.
#[derive(Debug)]
pub(crate) struct InputGain(AtomicF32);

impl InputGain {
    pub const MAX: f32 = 2.0;

    pub fn new(gain: f32) -> Self {
        Self(AtomicF32::new(Self::clamp(gain)))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, gain: f32) {
        self.0.store(Self::clamp(gain), Ordering::Relaxed);
    }

    fn clamp(gain: f32) -> f32 {
        if gain.is_finite() {
            gain.clamp(0.0, Self::MAX)
        } else {
            1.0
        }
    }
}

/// Peak absolute input level, held until the control side takes it.
#[derive(Debug, Default)]
#[repr(align(64))]
pub(crate) struct PeakMeter(AtomicF32);

impl PeakMeter {
    /// Raise the held peak to `level` if it is louder.
    #[inline]
    pub fn record(&self, level: f32) {
        self.0.fetch_max(level, Ordering::AcqRel);
    }

    /// Held peak since the last call; resets to silence.
    pub fn take(&self) -> f32 {
        self.0.swap(0.0, Ordering::AcqRel)
    }
}

/// Runs callback bodies behind `catch_unwind` and counts the ones that panicked.
///
/// A panicking block simply loses its samples; the stream keeps running and
/// the control side can see the count.
#[derive(Debug, Default)]
pub(crate) struct CallbackGuard {
    panics: AtomicU64,
}

impl CallbackGuard {
    /// Returns false if `body` panicked.
    #[inline]
    pub fn run(&self, body: impl FnOnce()) -> bool {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(body));
        if result.is_err() {
            self.panics.fetch_add(1, Ordering::Relaxed);
        }
        result.is_ok()
    }

    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_gain_is_clamped() {
        let gain = InputGain::new(5.0);
        assert_eq!(gain.get(), 2.0);
        gain.set(-1.0);
        assert_eq!(gain.get(), 0.0);
        gain.set(f32::NAN);
        assert_eq!(gain.get(), 1.0);
        gain.set(0.75);
        assert_eq!(gain.get(), 0.75);
    }

    #[test]
    fn test_peak_meter_holds_until_taken() {
        let peak = PeakMeter::default();
        peak.record(0.3);
        peak.record(0.1);
        assert_eq!(peak.take(), 0.3);
        assert_eq!(peak.take(), 0.0);
    }

    #[test]
    fn test_guard_counts_panics() {
        let guard = CallbackGuard::default();
        let mut ran = false;
        assert!(guard.run(|| ran = true));
        assert!(ran);
        assert_eq!(guard.panics(), 0);

        assert!(!guard.run(|| panic!("bad block")));
        assert!(!guard.run(|| panic!("bad block")));
        assert_eq!(guard.panics(), 2);

        // Still usable after a panic.
        assert!(guard.run(|| {}));
        assert_eq!(guard.panics(), 2);
    }
}
