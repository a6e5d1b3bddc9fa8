//! Stateful estimate → height filter.
//!
//! Per call: confidence gate, Hz → semitone, rate limit (octave-jump
//! suppression), snap with hysteresis, [`HeightMap`] shaping, then
//! confidence-weighted smoothing against the previous height.

use crate::mapping::HeightMap;
use crate::pitch::PitchEstimate;
use tessitura_core::music::hz_to_semitone;
use tessitura_core::MappingConfig;

/// Result of one [`ToneMapper::map`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneOutput {
    pub height: f32,
    /// False when the estimate was gated out and `height` is a held value.
    pub fresh: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct MapperState {
    last_height: f32,
    /// Rate-limited position before snapping.
    last_raw_semitone: f32,
    /// Target semitone after rate limiting and snapping.
    last_semitone: f32,
    last_time: f64,
    has_last: bool,
}

/// Turns a noisy `(Hz, confidence)` stream into a stable height.
///
/// Owned by the tick consumer. State only resets by building a new mapper.
pub struct ToneMapper {
    map: HeightMap,
    confidence_threshold: f32,
    max_semitone_per_sec: f32,
    snap_hysteresis: f32,
    min_smoothing: f32,
    max_smoothing: f32,
    state: MapperState,
}

impl ToneMapper {
    pub fn new(config: &MappingConfig) -> Self {
        Self::from_sanitized(&config.clone().sanitized())
    }

    /// Build from a config that has already been sanitized.
    pub(crate) fn from_sanitized(config: &MappingConfig) -> Self {
        Self {
            map: HeightMap::compile(config),
            confidence_threshold: config.confidence_threshold,
            max_semitone_per_sec: config.max_semitone_per_sec,
            snap_hysteresis: config.snap_hysteresis,
            min_smoothing: config.min_smoothing,
            max_smoothing: config.max_smoothing,
            state: MapperState::default(),
        }
    }

    pub fn height_map(&self) -> &HeightMap {
        &self.map
    }

    /// Whether any estimate has passed the gate yet.
    pub fn has_value(&self) -> bool {
        self.state.has_last
    }

    /// Current height: last output, or the rest height before the first value.
    pub fn height(&self) -> f32 {
        if self.state.has_last {
            self.state.last_height
        } else {
            self.map.rest_height()
        }
    }

    /// Last target semitone, after rate limiting and snapping.
    pub fn last_semitone(&self) -> Option<f32> {
        self.state.has_last.then_some(self.state.last_semitone)
    }

    /// Feed one estimate observed at `now` (seconds, monotonic).
    pub fn map(&mut self, estimate: PitchEstimate, now: f64) -> ToneOutput {
        if !estimate.is_valid() || estimate.confidence < self.confidence_threshold {
            return ToneOutput {
                height: self.height(),
                fresh: false,
            };
        }

        let raw = hz_to_semitone(estimate.frequency);
        let confidence = estimate.confidence.clamp(0.0, 1.0);

        let limited = if self.state.has_last {
            let elapsed = (now - self.state.last_time).max(0.0) as f32;
            let max_step = self.max_semitone_per_sec * elapsed;
            let previous = self.state.last_raw_semitone;
            previous + (raw - previous).clamp(-max_step, max_step)
        } else {
            raw
        };

        let target = self.map.snap(limited);
        let semitone = if self.state.has_last
            && self.map.snap_step().is_some()
            && (target - self.state.last_semitone).abs() < self.snap_hysteresis
        {
            self.state.last_semitone
        } else {
            target
        };

        let target_height = self.map.height_for_semitone(semitone);
        let height = if self.state.has_last {
            let alpha = self.min_smoothing + (self.max_smoothing - self.min_smoothing) * confidence;
            self.state.last_height + (target_height - self.state.last_height) * alpha
        } else {
            target_height
        };

        self.state = MapperState {
            last_height: height,
            last_raw_semitone: limited,
            last_semitone: semitone,
            last_time: now,
            has_last: true,
        };

        ToneOutput {
            height,
            fresh: true,
        }
    }
}
