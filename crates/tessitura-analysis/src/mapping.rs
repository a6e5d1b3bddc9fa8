//! Stateless pitch-to-height mapping.
//!
//! [`HeightMap`] is compiled once from a [`MappingConfig`]: the log/linear
//! switch and the power/curve switch become tagged variants, so the mapping
//! itself runs the same steps for every configuration:
//!
//! normalize → shape (curve → gamma) → lerp into the height range → gain →
//! offset → clamp.

use tessitura_core::curve::{CurveDomain, ResponseCurve};
use tessitura_core::music::{hz_to_semitone, semitone_to_hz, Note};
use tessitura_core::MappingConfig;

/// Curves flatter than this cannot be renormalized and pass `t` through.
const FLAT_CURVE_EPSILON: f32 = 1e-6;

/// How a pitch becomes a position `t` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Even spacing per semitone (log2 of frequency).
    Semitone { min: f32, max: f32 },
    /// Even spacing per Hz.
    Linear { min_hz: f32, max_hz: f32 },
}

impl Normalization {
    fn position(&self, semitone: f32) -> f32 {
        let (value, lo, hi) = match *self {
            Normalization::Semitone { min, max } => (semitone, min, max),
            Normalization::Linear { min_hz, max_hz } => (semitone_to_hz(semitone), min_hz, max_hz),
        };
        inverse_lerp(lo, hi, value)
    }
}

/// How the normalized position is bent before it is scaled to a height.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaping {
    /// `t^gamma`.
    Power { gamma: f32 },
    /// Designer curve, renormalized to `[0, 1]` from its output range, then `^gamma`.
    Curve {
        curve: ResponseCurve,
        domain: CurveDomain,
        out_lo: f32,
        out_hi: f32,
        gamma: f32,
    },
}

impl Shaping {
    fn from_config(config: &MappingConfig) -> Self {
        let gamma = config.gamma;
        let Some(curve) = config.curve.clone() else {
            return Shaping::Power { gamma };
        };
        let Some((out_lo, out_hi)) = curve.value_range() else {
            return Shaping::Power { gamma };
        };
        let domain = CurveDomain::detect(&curve);
        tracing::debug!(
            "Response curve: {} keys, {:?} domain, output [{}, {}]",
            curve.keys().len(),
            domain,
            out_lo,
            out_hi
        );
        Shaping::Curve {
            curve,
            domain,
            out_lo,
            out_hi,
            gamma,
        }
    }

    fn apply(&self, t: f32, hz: f32) -> f32 {
        match self {
            Shaping::Power { gamma } => t.powf(*gamma),
            Shaping::Curve {
                curve,
                domain,
                out_lo,
                out_hi,
                gamma,
            } => {
                let input = match domain {
                    CurveDomain::Normalized => t,
                    CurveDomain::Frequency => hz,
                };
                let span = out_hi - out_lo;
                let y = match curve.evaluate(input) {
                    Some(v) if span > FLAT_CURVE_EPSILON => (v - out_lo) / span,
                    _ => t,
                };
                y.clamp(0.0, 1.0).powf(*gamma)
            }
        }
    }
}

/// One-shot Hz → height conversion without temporal state.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    normalization: Normalization,
    shaping: Shaping,
    min_height: f32,
    max_height: f32,
    gain: f32,
    offset: f32,
    snap_step: Option<f32>,
}

impl HeightMap {
    /// Compile a mapping. The config is sanitized first.
    pub fn new(config: &MappingConfig) -> Self {
        Self::compile(&config.clone().sanitized())
    }

    /// Compile from a config that has already been sanitized.
    pub(crate) fn compile(config: &MappingConfig) -> Self {
        let normalization = if config.use_log_mapping {
            Normalization::Semitone {
                min: config.min_semitone,
                max: config.max_semitone,
            }
        } else {
            Normalization::Linear {
                min_hz: config.min_hz,
                max_hz: config.max_hz,
            }
        };

        Self {
            normalization,
            shaping: Shaping::from_config(config),
            min_height: config.min_height,
            max_height: config.max_height,
            gain: config.gain,
            offset: config.global_offset,
            snap_step: config.snap_to_semitone.then(|| config.snap_step()),
        }
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn shaping(&self) -> &Shaping {
        &self.shaping
    }

    /// Height reported before any pitch has been seen.
    pub fn rest_height(&self) -> f32 {
        self.min_height
    }

    /// `(lo, hi)` bounds of every height this map can produce.
    pub fn height_bounds(&self) -> (f32, f32) {
        (
            self.min_height.min(self.max_height),
            self.min_height.max(self.max_height),
        )
    }

    /// Round to the snapping grid, if snapping is enabled.
    pub fn snap(&self, semitone: f32) -> f32 {
        match self.snap_step {
            Some(step) => (semitone / step).round() * step,
            None => semitone,
        }
    }

    pub fn snap_step(&self) -> Option<f32> {
        self.snap_step
    }

    /// Normalized position of `semitone` in `[0, 1]`, before shaping.
    pub fn position(&self, semitone: f32) -> f32 {
        self.normalization.position(semitone)
    }

    /// Full mapping of an already rate-limited/snapped semitone to a height.
    pub fn height_for_semitone(&self, semitone: f32) -> f32 {
        let t = self.position(semitone);
        let y = self.shaping.apply(t, semitone_to_hz(semitone));
        let (lo, hi) = self.height_bounds();
        let height = lerp(self.min_height, self.max_height, y) * self.gain + self.offset;
        if height.is_finite() {
            height.clamp(lo, hi)
        } else {
            self.min_height
        }
    }

    /// Map a frequency straight to a height. Non-positive or non-finite
    /// frequencies give the rest height.
    pub fn evaluate_height(&self, hz: f32) -> f32 {
        if !(hz.is_finite() && hz > 0.0) {
            return self.min_height;
        }
        self.height_for_semitone(self.snap(hz_to_semitone(hz)))
    }

    /// Heights for a sequence of notes, e.g. to place a course.
    pub fn layout(&self, notes: &[Note]) -> Vec<f32> {
        notes
            .iter()
            .map(|note| self.evaluate_height(note.frequency()))
            .collect()
    }
}

/// Convenience wrapper: compile `config` and map one frequency.
///
/// Out-of-range config values are clamped silently; build a [`HeightMap`]
/// once to get the warnings and to reuse the compiled map.
pub fn evaluate_height(config: &MappingConfig, hz: f32) -> f32 {
    HeightMap::compile(&config.clone().clamped()).evaluate_height(hz)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Position of `value` between `lo` and `hi`, clamped to `[0, 1]`.
#[inline]
fn inverse_lerp(lo: f32, hi: f32, value: f32) -> f32 {
    let span = hi - lo;
    if span.abs() <= f32::EPSILON || !value.is_finite() {
        return 0.0;
    }
    ((value - lo) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tessitura_core::curve::CurveKey;
    use tessitura_core::music::NoteName;

    fn linear_octave() -> MappingConfig {
        MappingConfig {
            min_semitone: 60.0,
            max_semitone: 72.0,
            min_height: 0.0,
            max_height: 12.0,
            gain: 1.0,
            gamma: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_semitone_normalization() {
        let map = HeightMap::new(&linear_octave());
        assert_abs_diff_eq!(map.evaluate_height(261.6256), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(map.evaluate_height(440.0), 9.0, epsilon = 1e-3);
        assert_abs_diff_eq!(map.evaluate_height(523.2511), 12.0, epsilon = 1e-3);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let map = HeightMap::new(&linear_octave());
        assert_eq!(map.evaluate_height(50.0), 0.0);
        assert_eq!(map.evaluate_height(5000.0), 12.0);
    }

    #[test]
    fn test_invalid_frequency_gives_rest_height() {
        let map = HeightMap::new(&MappingConfig::default());
        assert_eq!(map.evaluate_height(0.0), 0.5);
        assert_eq!(map.evaluate_height(-10.0), 0.5);
        assert_eq!(map.evaluate_height(f32::NAN), 0.5);
        assert_eq!(map.evaluate_height(f32::INFINITY), 0.5);
    }

    #[test]
    fn test_one_shot_mapping_clamps_quietly() {
        let bad = MappingConfig {
            gain: f32::NAN,
            ..linear_octave()
        };
        let logs = crate::testing::capture_logs(|| {
            for _ in 0..3 {
                assert_abs_diff_eq!(evaluate_height(&bad, 440.0), 9.0, epsilon = 1e-3);
            }
        });
        assert!(!logs.contains("gain NaN"), "unexpected warnings: {}", logs);

        let logs = crate::testing::capture_logs(|| {
            HeightMap::new(&bad);
        });
        assert_eq!(logs.matches("gain NaN").count(), 1);
    }

    #[test]
    fn test_linear_hz_normalization() {
        let config = MappingConfig {
            use_log_mapping: false,
            min_hz: 100.0,
            max_hz: 500.0,
            min_height: 0.0,
            max_height: 1.0,
            gamma: 1.0,
            ..Default::default()
        };
        assert_abs_diff_eq!(evaluate_height(&config, 300.0), 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_gamma_before_gain_and_clamp_after_offset() {
        let config = MappingConfig {
            gamma: 2.0,
            gain: 1.5,
            global_offset: 1.0,
            ..linear_octave()
        };
        let map = HeightMap::new(&config);
        // t = 0.5 -> 0.25 -> 3.0 -> 4.5 -> 5.5
        assert_abs_diff_eq!(map.height_for_semitone(66.0), 5.5, epsilon = 1e-4);
        // t = 1 -> 12 * 1.5 + 1 clamps to 12
        assert_eq!(map.height_for_semitone(72.0), 12.0);
    }

    #[test]
    fn test_inverted_height_range() {
        let config = MappingConfig {
            min_height: 10.0,
            max_height: 0.0,
            ..linear_octave()
        };
        let map = HeightMap::new(&config);
        assert_eq!(map.height_bounds(), (0.0, 10.0));
        assert_abs_diff_eq!(map.height_for_semitone(60.0), 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(map.height_for_semitone(72.0), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_snap_grid() {
        let config = MappingConfig {
            snap_to_semitone: true,
            quantize_divisions: 2,
            ..linear_octave()
        };
        let map = HeightMap::new(&config);
        assert_eq!(map.snap(60.2), 60.0);
        assert_eq!(map.snap(60.3), 60.5);
        // 60.2 snaps to C4 exactly
        assert_abs_diff_eq!(map.evaluate_height(semitone_to_hz(60.2)), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_normalized_curve() {
        let config = MappingConfig {
            curve: Some(ResponseCurve::linear(0.0, 0.0, 1.0, 1.0)),
            ..linear_octave()
        };
        let map = HeightMap::new(&config);
        assert!(matches!(
            map.shaping(),
            Shaping::Curve {
                domain: CurveDomain::Normalized,
                ..
            }
        ));
        assert_abs_diff_eq!(map.height_for_semitone(63.0), 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_frequency_curve_is_renormalized() {
        // Authored in Hz with output in the designer's own units.
        let curve = ResponseCurve::linear(261.6256, 0.5, 523.2511, 6.0);
        let config = MappingConfig {
            curve: Some(curve),
            ..linear_octave()
        };
        let map = HeightMap::new(&config);
        assert!(matches!(
            map.shaping(),
            Shaping::Curve {
                domain: CurveDomain::Frequency,
                ..
            }
        ));
        assert_abs_diff_eq!(map.evaluate_height(261.6256), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(map.evaluate_height(523.2511), 12.0, epsilon = 1e-3);
        // Linear in Hz: 392.44 Hz is halfway.
        assert_abs_diff_eq!(map.evaluate_height(392.4383), 6.0, epsilon = 1e-2);
    }

    #[test]
    fn test_flat_curve_falls_back_to_position() {
        let config = MappingConfig {
            curve: Some(ResponseCurve::new(vec![
                CurveKey::new(0.0, 2.0),
                CurveKey::new(1.0, 2.0),
            ])),
            ..linear_octave()
        };
        let map = HeightMap::new(&config);
        assert_abs_diff_eq!(map.height_for_semitone(66.0), 6.0, epsilon = 1e-3);
    }

    #[test]
    fn test_default_config_stays_in_bounds() {
        let map = HeightMap::new(&MappingConfig::default());
        for hz in [20.0, 80.0, 100.0, 220.0, 440.0, 800.0, 4000.0] {
            let h = map.evaluate_height(hz);
            assert!((0.5..=6.0).contains(&h), "{} Hz -> {}", hz, h);
        }
    }

    #[test]
    fn test_layout_is_monotonic_for_scale() {
        let map = HeightMap::new(&MappingConfig::default());
        let heights = map.layout(&Note::c_major_scale());
        assert_eq!(heights.len(), 8);
        assert!(heights.windows(2).all(|w| w[1] > w[0]));

        let a4 = map.layout(&[Note::new(NoteName::A, 4)]);
        assert_abs_diff_eq!(a4[0], map.evaluate_height(440.0), epsilon = 1e-5);
    }
}
