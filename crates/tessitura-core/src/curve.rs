//! Designer-authored response curves.
//!
//! A [`ResponseCurve`] is a list of keyframes joined by cubic Hermite
//! segments, the same model animation tools use. Curves may be authored over
//! a normalized `[0, 1]` input or directly over frequency in Hz; see
//! [`CurveDomain::detect`].

use serde::{Deserialize, Serialize};

/// Slack when deciding whether a curve was authored over `[0, 1]`.
const NORMALIZED_DOMAIN_SLACK: f32 = 1e-3;

/// Samples per segment when measuring a curve's output range.
const RANGE_SAMPLES_PER_SEGMENT: usize = 16;

/// A single keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
}

impl CurveKey {
    /// Key with flat tangents.
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }
}

/// Piecewise cubic Hermite curve. Keys are kept sorted by time.
///
/// Outside the keyed range the curve holds its first/last value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct ResponseCurve {
    keys: Vec<CurveKey>,
}

impl From<Vec<CurveKey>> for ResponseCurve {
    fn from(mut keys: Vec<CurveKey>) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }
}

impl From<ResponseCurve> for Vec<CurveKey> {
    fn from(curve: ResponseCurve) -> Self {
        curve.keys
    }
}

impl ResponseCurve {
    pub fn new(keys: Vec<CurveKey>) -> Self {
        keys.into()
    }

    /// Two flat-tangent keys: slow start, slow finish.
    pub fn ease_in_out(time_start: f32, value_start: f32, time_end: f32, value_end: f32) -> Self {
        Self::new(vec![
            CurveKey::new(time_start, value_start),
            CurveKey::new(time_end, value_end),
        ])
    }

    /// Straight line between two keys.
    pub fn linear(time_start: f32, value_start: f32, time_end: f32, value_end: f32) -> Self {
        let dt = time_end - time_start;
        let slope = if dt.abs() > f32::EPSILON {
            (value_end - value_start) / dt
        } else {
            0.0
        };
        Self::new(vec![
            CurveKey {
                time: time_start,
                value: value_start,
                in_tangent: slope,
                out_tangent: slope,
            },
            CurveKey {
                time: time_end,
                value: value_end,
                in_tangent: slope,
                out_tangent: slope,
            },
        ])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(first_time, last_time)`, or `None` for an empty curve.
    pub fn time_range(&self) -> Option<(f32, f32)> {
        Some((self.keys.first()?.time, self.keys.last()?.time))
    }

    /// Evaluate at `time`. Returns `None` for an empty curve.
    pub fn evaluate(&self, time: f32) -> Option<f32> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;

        if time <= first.time {
            return Some(first.value);
        }
        if time >= last.time {
            return Some(last.value);
        }

        // First key strictly after `time`; guaranteed 1..len by the checks above.
        let upper = self.keys.partition_point(|k| k.time <= time);
        let k0 = &self.keys[upper - 1];
        let k1 = &self.keys[upper];
        Some(hermite(k0, k1, time))
    }

    /// Minimum and maximum value the curve reaches over its keyed range.
    ///
    /// Tangents can overshoot the key values, so each segment is sampled.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;

        for key in &self.keys {
            lo = lo.min(key.value);
            hi = hi.max(key.value);
        }
        for pair in self.keys.windows(2) {
            let (k0, k1) = (&pair[0], &pair[1]);
            for i in 1..RANGE_SAMPLES_PER_SEGMENT {
                let t = k0.time + (k1.time - k0.time) * i as f32 / RANGE_SAMPLES_PER_SEGMENT as f32;
                let v = hermite(k0, k1, t);
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }

        (lo <= hi).then_some((lo, hi))
    }
}

#[inline]
fn hermite(k0: &CurveKey, k1: &CurveKey, time: f32) -> f32 {
    let dt = k1.time - k0.time;
    if dt <= f32::EPSILON {
        return k1.value;
    }

    let s = (time - k0.time) / dt;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    h00 * k0.value + h10 * dt * k0.out_tangent + h01 * k1.value + h11 * dt * k1.in_tangent
}

/// What a curve's input axis means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveDomain {
    /// Input is the normalized position `t` in `[0, 1]`.
    Normalized,
    /// Input is an absolute frequency in Hz.
    Frequency,
}

impl CurveDomain {
    /// Curves whose keys all lie in `[0, 1]` are normalized; anything else
    /// was authored against frequency.
    pub fn detect(curve: &ResponseCurve) -> Self {
        match curve.time_range() {
            Some((start, end))
                if start >= -NORMALIZED_DOMAIN_SLACK && end <= 1.0 + NORMALIZED_DOMAIN_SLACK =>
            {
                CurveDomain::Normalized
            }
            Some(_) => CurveDomain::Frequency,
            None => CurveDomain::Normalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_curve() {
        let curve = ResponseCurve::new(Vec::new());
        assert!(curve.is_empty());
        assert_eq!(curve.evaluate(0.5), None);
        assert_eq!(curve.value_range(), None);
    }

    #[test]
    fn test_linear_curve() {
        let curve = ResponseCurve::linear(0.0, 0.0, 1.0, 2.0);
        assert_abs_diff_eq!(curve.evaluate(0.25).unwrap(), 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(curve.evaluate(0.5).unwrap(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ease_in_out_endpoints_and_midpoint() {
        let curve = ResponseCurve::ease_in_out(100.0, 0.5, 800.0, 6.0);
        assert_eq!(curve.evaluate(50.0), Some(0.5));
        assert_eq!(curve.evaluate(900.0), Some(6.0));
        assert_abs_diff_eq!(curve.evaluate(450.0).unwrap(), 3.25, epsilon = 1e-4);
        // Flat tangents: slow near the ends.
        let early = curve.evaluate(135.0).unwrap() - 0.5;
        let middle = curve.evaluate(485.0).unwrap() - curve.evaluate(450.0).unwrap();
        assert!(early < middle);
    }

    #[test]
    fn test_keys_sorted_on_construction() {
        let curve = ResponseCurve::new(vec![
            CurveKey::new(1.0, 1.0),
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.5, f32::NAN),
        ]);
        assert_eq!(curve.keys().len(), 2);
        assert_eq!(curve.time_range(), Some((0.0, 1.0)));
    }

    #[test]
    fn test_value_range_includes_overshoot() {
        let curve = ResponseCurve::new(vec![
            CurveKey {
                time: 0.0,
                value: 0.0,
                in_tangent: 0.0,
                out_tangent: 4.0,
            },
            CurveKey::new(1.0, 1.0),
        ]);
        let (lo, hi) = curve.value_range().unwrap();
        assert_eq!(lo, 0.0);
        assert!(hi > 1.0);
    }

    #[test]
    fn test_domain_detection() {
        assert_eq!(
            CurveDomain::detect(&ResponseCurve::linear(0.0, 0.0, 1.0, 1.0)),
            CurveDomain::Normalized
        );
        assert_eq!(
            CurveDomain::detect(&ResponseCurve::ease_in_out(100.0, 0.5, 800.0, 6.0)),
            CurveDomain::Frequency
        );
    }

    #[test]
    fn test_serde_round_trip_keeps_order() {
        let json = r#"[{"time": 1.0, "value": 2.0}, {"time": 0.0, "value": 0.0}]"#;
        let curve: ResponseCurve = serde_json::from_str(json).unwrap();
        assert_eq!(curve.time_range(), Some((0.0, 1.0)));
        let back = serde_json::to_string(&curve).unwrap();
        assert!(back.starts_with("[{\"time\":0.0"));
    }
}
