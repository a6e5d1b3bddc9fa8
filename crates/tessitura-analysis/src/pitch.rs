//! Pitch estimation using the YIN algorithm
//!
//! Monophonic fundamental-frequency estimation on a single frame.
//!
//! ## Algorithm
//!
//! The YIN algorithm (de Cheveigné & Kawahara, 2002) restricted to the lag
//! window `[tau_min, tau_max]` implied by the requested frequency range:
//!
//! 1. **Difference function** - d(τ) = Σ(x[i] - x[i+τ])² for i in 0..N-τ
//! 2. **Cumulative mean normalized difference** - d'(τ) = d(τ)·τ / Σ d(k), k in tau_min..=τ
//! 3. **Absolute threshold** - the FIRST local minimum with d'(τ) below threshold
//!
//! Taking the first qualifying dip rather than the global minimum favors the
//! shortest period and avoids sub-harmonic (octave-down) errors.
//!
//! ## Performance
//!
//! O((tau_max - tau_min) × N) per frame. Working buffers are kept between
//! calls and only grow.

use tessitura_core::music::{hz_to_semitone, note_label};

/// YIN absolute threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Frames shorter than this are rejected.
pub const MIN_FRAME_SAMPLES: usize = 8;

/// Floor for the cumulative-mean denominator.
const CMND_EPSILON: f64 = 1e-12;

/// Mean-square level below which a frame is treated as silence.
const SILENCE_FLOOR: f64 = 1e-10;

/// Result of pitch estimation for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PitchEstimate {
    /// Estimated frequency in Hz (0.0 if no voiced pitch was found)
    pub frequency: f32,
    /// Confidence of the estimate (0.0 - 1.0)
    pub confidence: f32,
}

impl PitchEstimate {
    /// "No voiced pitch found".
    pub const INVALID: Self = Self {
        frequency: 0.0,
        confidence: 0.0,
    };

    pub fn new(frequency: f32, confidence: f32) -> Self {
        Self {
            frequency,
            confidence,
        }
    }

    /// Check if a pitch was found
    pub fn is_valid(&self) -> bool {
        self.frequency.is_finite()
            && self.confidence.is_finite()
            && self.frequency > 0.0
            && self.confidence > 0.0
    }

    /// Fractional MIDI semitone of the estimate, if valid
    pub fn semitone(&self) -> Option<f32> {
        self.is_valid().then(|| hz_to_semitone(self.frequency))
    }

    /// Nearest note name with sharp notation (e.g., "A4", "C#5")
    pub fn note_label(&self) -> Option<String> {
        self.semitone().map(note_label)
    }
}

/// A monophonic pitch estimator.
///
/// Implementations must not panic on bad input; they return
/// [`PitchEstimate::INVALID`] instead.
pub trait PitchEstimator: Send {
    fn estimate(
        &mut self,
        frame: &[f32],
        sample_rate: f32,
        min_hz: f32,
        max_hz: f32,
    ) -> PitchEstimate;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

impl PitchEstimator for Box<dyn PitchEstimator> {
    fn estimate(
        &mut self,
        frame: &[f32],
        sample_rate: f32,
        min_hz: f32,
        max_hz: f32,
    ) -> PitchEstimate {
        (**self).estimate(frame, sample_rate, min_hz, max_hz)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Pitch estimator using the YIN algorithm
pub struct YinEstimator {
    threshold: f32,
    interpolate: bool,

    // Reused between frames, indexed by τ - tau_min
    difference: Vec<f64>,
    cmnd: Vec<f64>,
}

impl Default for YinEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl YinEstimator {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            interpolate: false,
            difference: Vec::new(),
            cmnd: Vec::new(),
        }
    }

    /// Pre-size the working buffers for frames up to `frame_len` samples.
    pub fn with_capacity(frame_len: usize) -> Self {
        let mut estimator = Self::new();
        estimator.difference.reserve(frame_len);
        estimator.cmnd.reserve(frame_len);
        estimator
    }

    /// Set YIN threshold (0.01 - 0.5)
    ///
    /// Lower values are stricter and may miss quiet notes.
    /// Higher values are more permissive but may have false positives.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, 0.5);
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Refine the period with parabolic interpolation around the chosen lag.
    ///
    /// Off by default: the reported frequency is then exactly `sr / τ`.
    pub fn set_interpolation(&mut self, enabled: bool) {
        self.interpolate = enabled;
    }

    /// Difference function for τ in `tau_min..=tau_max`.
    fn compute_difference(&mut self, frame: &[f32], tau_min: usize, tau_max: usize) {
        let n = frame.len();
        self.difference.clear();
        self.difference.extend((tau_min..=tau_max).map(|tau| {
            frame[..n - tau]
                .iter()
                .zip(&frame[tau..])
                .map(|(&a, &b)| {
                    let diff = (a - b) as f64;
                    diff * diff
                })
                .sum::<f64>()
        }));
    }

    /// Cumulative mean normalized difference. The running sum starts at `tau_min`.
    fn compute_cmnd(&mut self, tau_min: usize) {
        self.cmnd.clear();
        let mut running = 0.0f64;
        for (i, &d) in self.difference.iter().enumerate() {
            running += d;
            let tau = (tau_min + i) as f64;
            self.cmnd.push(d * tau / running.max(CMND_EPSILON));
        }
    }

    /// First local minimum below threshold, as an index into `cmnd`.
    fn find_first_dip(&self) -> Option<usize> {
        let threshold = self.threshold as f64;
        self.cmnd
            .windows(3)
            .position(|w| w[1] < threshold && w[1] <= w[0] && w[1] <= w[2])
            .map(|i| i + 1)
    }

    /// Parabolic interpolation around index `i` of `cmnd`.
    fn refine(&self, i: usize) -> f64 {
        let (s0, s1, s2) = (self.cmnd[i - 1], self.cmnd[i], self.cmnd[i + 1]);
        let denominator = 2.0 * (2.0 * s1 - s2 - s0);
        if denominator.abs() > 1e-10 {
            ((s2 - s0) / denominator).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(
        &mut self,
        frame: &[f32],
        sample_rate: f32,
        min_hz: f32,
        max_hz: f32,
    ) -> PitchEstimate {
        if frame.len() < MIN_FRAME_SAMPLES
            || !(sample_rate.is_finite() && sample_rate > 0.0)
            || !(min_hz.is_finite() && min_hz > 0.0)
            || !(max_hz.is_finite() && max_hz > min_hz)
        {
            return PitchEstimate::INVALID;
        }

        let sr = sample_rate as f64;
        let tau_min = (sr / max_hz as f64).floor() as usize;
        let tau_max = (sr / min_hz as f64).ceil() as usize;
        let n = frame.len();
        if tau_min < 1 || tau_max >= n {
            return PitchEstimate::INVALID;
        }

        let energy = frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / n as f64;
        if !(energy > SILENCE_FLOOR) {
            return PitchEstimate::INVALID;
        }

        self.compute_difference(frame, tau_min, tau_max);
        self.compute_cmnd(tau_min);

        let Some(best) = self.find_first_dip() else {
            return PitchEstimate::INVALID;
        };

        let offset = if self.interpolate { self.refine(best) } else { 0.0 };
        let period = (tau_min + best) as f64 + offset;
        let frequency = (sr / period) as f32;
        let confidence = (1.0 - self.cmnd[best]).clamp(0.0, 1.0) as f32;

        if !frequency.is_finite() {
            return PitchEstimate::INVALID;
        }
        PitchEstimate {
            frequency,
            confidence,
        }
    }

    fn name(&self) -> &'static str {
        "yin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn generate_sine(sample_rate: f32, freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate;
                (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_detect_a220() {
        let samples = generate_sine(48000.0, 220.0, 1024);
        let mut yin = YinEstimator::new();
        let result = yin.estimate(&samples, 48000.0, 80.0, 800.0);

        assert!(result.is_valid(), "Should detect voiced signal");
        assert!(
            (result.frequency - 220.0).abs() < 2.0,
            "Expected ~220 Hz, got {} Hz",
            result.frequency
        );
        assert!(result.confidence > 0.8);
        assert_eq!(result.note_label().as_deref(), Some("A3"));
    }

    #[test]
    fn test_detect_various_frequencies() {
        let sample_rate = 44100.0;
        let test_freqs = [110.0, 196.0, 261.63, 330.0, 392.0];
        let mut yin = YinEstimator::new();

        for &freq in &test_freqs {
            let samples = generate_sine(sample_rate, freq, 2048);
            let result = yin.estimate(&samples, sample_rate, 80.0, 800.0);

            assert!(result.is_valid(), "Should detect {}Hz", freq);
            let error_percent = ((result.frequency - freq) / freq).abs() * 100.0;
            assert!(
                error_percent < 2.0,
                "Expected {}Hz, got {}Hz ({}% error)",
                freq,
                result.frequency,
                error_percent
            );
        }
    }

    #[test]
    fn test_interpolation_tightens_estimate() {
        let samples = generate_sine(44100.0, 261.63, 2048);
        let mut plain = YinEstimator::new();
        let mut refined = YinEstimator::new();
        refined.set_interpolation(true);

        let a = plain.estimate(&samples, 44100.0, 80.0, 800.0);
        let b = refined.estimate(&samples, 44100.0, 80.0, 800.0);
        assert!((b.frequency - 261.63).abs() <= (a.frequency - 261.63).abs() + 0.25);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut yin = YinEstimator::new();
        let samples = generate_sine(44100.0, 220.0, 2048);

        assert_eq!(yin.estimate(&samples[..7], 44100.0, 80.0, 800.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&[], 44100.0, 80.0, 800.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&samples, 0.0, 80.0, 800.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&samples, -44100.0, 80.0, 800.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&samples, 44100.0, 800.0, 800.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&samples, 44100.0, 800.0, 80.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&samples, 44100.0, 0.0, 800.0), PitchEstimate::INVALID);
        assert_eq!(yin.estimate(&samples, f32::NAN, 80.0, 800.0), PitchEstimate::INVALID);
        // tau_min < 1
        assert_eq!(yin.estimate(&samples, 44100.0, 80.0, 50000.0), PitchEstimate::INVALID);
        // tau_max >= N
        assert_eq!(yin.estimate(&samples[..256], 44100.0, 80.0, 800.0), PitchEstimate::INVALID);
    }

    #[test]
    fn test_silence_is_invalid() {
        let mut yin = YinEstimator::new();
        let result = yin.estimate(&[0.0; 2048], 44100.0, 80.0, 800.0);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_non_finite_samples_are_invalid() {
        let mut yin = YinEstimator::new();
        let mut samples = generate_sine(44100.0, 220.0, 2048);
        samples[100] = f32::NAN;
        assert!(!yin.estimate(&samples, 44100.0, 80.0, 800.0).is_valid());
    }

    #[test]
    fn test_buffers_are_reused() {
        let mut yin = YinEstimator::with_capacity(2048);
        let samples = generate_sine(44100.0, 220.0, 2048);
        yin.estimate(&samples, 44100.0, 80.0, 800.0);
        let cap = yin.difference.capacity();
        yin.estimate(&samples, 44100.0, 80.0, 800.0);
        assert_eq!(yin.difference.capacity(), cap);
    }

    #[test]
    fn test_threshold_clamped() {
        let mut yin = YinEstimator::new();
        yin.set_threshold(2.0);
        assert_eq!(yin.threshold(), 0.5);
        yin.set_threshold(0.0);
        assert_eq!(yin.threshold(), 0.01);
    }

    #[test]
    fn test_boxed_estimator() {
        let mut estimator: Box<dyn PitchEstimator> = Box::new(YinEstimator::new());
        let samples = generate_sine(44100.0, 220.0, 2048);
        assert!(estimator.estimate(&samples, 44100.0, 80.0, 800.0).is_valid());
        assert_eq!(estimator.name(), "yin");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Sines comfortably inside the search range land within one lag bin.
        #[test]
        fn prop_sine_within_one_bin(
            freq in 90.0f32..380.0,
            sample_rate in prop::sample::select(vec![44100.0f32, 48000.0]),
        ) {
            let (min_hz, max_hz) = (80.0f32, 800.0f32);
            let samples = generate_sine(sample_rate, freq, 2048);
            let mut yin = YinEstimator::new();
            let result = yin.estimate(&samples, sample_rate, min_hz, max_hz);

            let bin = sample_rate / (sample_rate / min_hz).ceil();
            prop_assert!(result.is_valid());
            prop_assert!(
                (result.frequency - freq).abs() <= bin,
                "f={} got={}",
                freq,
                result.frequency
            );
            prop_assert!(result.confidence > 0.8);
        }

        #[test]
        fn prop_bad_range_is_invalid(min_hz in 1.0f32..2000.0, below in 0.0f32..1000.0) {
            let samples = generate_sine(44100.0, 220.0, 1024);
            let mut yin = YinEstimator::new();
            let max_hz = min_hz - below;
            let result = yin.estimate(&samples, 44100.0, min_hz, max_hz);
            prop_assert_eq!(result, PitchEstimate::INVALID);
        }
    }
}
