//! Pitch-to-height mapping configuration.

use crate::curve::ResponseCurve;
use crate::music::hz_to_semitone;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Smallest analysis frame, in samples.
pub const MIN_FRAME_LEN: usize = 128;

/// The sample queue always holds at least this much audio.
pub const MIN_QUEUE_SECONDS: f32 = 2.0;

/// Everything the pipeline needs to turn captured audio into a height.
///
/// Loaded once at startup and treated as read-only; swapping it is a
/// pipeline-level reconfiguration. Unknown JSON fields are ignored and missing
/// ones fall back to [`Default`]. Call [`sanitized`](Self::sanitized) before
/// use: out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    // Input
    pub sample_rate: f32,
    /// Analysis frame duration in seconds.
    pub frame_seconds: f32,
    /// Linear gain applied in the capture callback (0..2).
    pub input_gain: f32,
    /// Sample queue length in seconds (at least 2).
    pub queue_seconds: f32,

    // Detection
    pub min_hz: f32,
    pub max_hz: f32,
    pub confidence_threshold: f32,

    // Output range
    pub min_height: f32,
    pub max_height: f32,
    pub global_offset: f32,

    // Normalization
    /// Semitone-based (log2) normalization when true, linear Hz otherwise.
    pub use_log_mapping: bool,
    pub min_semitone: f32,
    pub max_semitone: f32,

    // Snapping
    pub snap_to_semitone: bool,
    /// Grid resolution: the target snaps to multiples of `1 / quantize_divisions` semitone.
    pub quantize_divisions: u32,
    /// Dead zone (semitones) around the previous snapped target.
    pub snap_hysteresis: f32,

    // Dynamics
    pub max_semitone_per_sec: f32,
    pub min_smoothing: f32,
    pub max_smoothing: f32,

    // Shaping
    pub gain: f32,
    pub gamma: f32,
    /// Replaces plain power-law shaping when present.
    pub curve: Option<ResponseCurve>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            frame_seconds: 0.046,
            input_gain: 1.0,
            queue_seconds: MIN_QUEUE_SECONDS,
            min_hz: 80.0,
            max_hz: 800.0,
            confidence_threshold: 0.85,
            min_height: 0.5,
            max_height: 6.0,
            global_offset: 0.0,
            use_log_mapping: true,
            min_semitone: hz_to_semitone(80.0),
            max_semitone: hz_to_semitone(800.0),
            snap_to_semitone: false,
            quantize_divisions: 1,
            snap_hysteresis: 0.35,
            max_semitone_per_sec: 48.0,
            min_smoothing: 0.15,
            max_smoothing: 0.6,
            gain: 1.0,
            gamma: 0.8,
            curve: None,
        }
    }
}

impl MappingConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::info!("Loaded mapping config from {}", path.display());
        Ok(config)
    }

    /// Frame length in samples (at least [`MIN_FRAME_LEN`]).
    pub fn frame_len(&self) -> usize {
        let len = (self.sample_rate * self.frame_seconds).round();
        if len.is_finite() && len > 0.0 {
            (len as usize).max(MIN_FRAME_LEN)
        } else {
            MIN_FRAME_LEN
        }
    }

    /// Sample queue capacity: at least two seconds and two frames.
    pub fn queue_capacity(&self) -> usize {
        let seconds = self.queue_seconds.max(MIN_QUEUE_SECONDS);
        let samples = (self.sample_rate * seconds).ceil();
        let samples = if samples.is_finite() && samples > 0.0 {
            samples as usize
        } else {
            0
        };
        samples.max(self.frame_len() * 2)
    }

    /// Grid step used when snapping, in semitones.
    pub fn snap_step(&self) -> f32 {
        1.0 / self.quantize_divisions.max(1) as f32
    }

    /// Strict check, reporting the first value that [`sanitized`](Self::sanitized)
    /// would have to change.
    pub fn validate(&self) -> Result<()> {
        let fixed = self.clone().clamped();
        if fixed == *self {
            return Ok(());
        }
        let detail = if fixed.sample_rate != self.sample_rate {
            format!("sample_rate {} must be positive", self.sample_rate)
        } else if (fixed.min_hz, fixed.max_hz) != (self.min_hz, self.max_hz) {
            format!(
                "frequency range [{}, {}] must satisfy 0 < min_hz < max_hz",
                self.min_hz, self.max_hz
            )
        } else if (fixed.min_semitone, fixed.max_semitone) != (self.min_semitone, self.max_semitone)
        {
            format!(
                "semitone range [{}, {}] must be finite and non-empty",
                self.min_semitone, self.max_semitone
            )
        } else if fixed.quantize_divisions != self.quantize_divisions {
            format!(
                "quantize_divisions {} must be at least 1",
                self.quantize_divisions
            )
        } else {
            "value out of range".to_string()
        };
        Err(Error::InvalidConfig(detail))
    }

    /// Clamp every field into a range the pipeline can run with.
    ///
    /// Never fails; each correction is logged at `warn` level.
    pub fn sanitized(self) -> Self {
        self.repair(&mut |msg| tracing::warn!("{msg}"))
    }

    /// Same corrections as [`sanitized`](Self::sanitized), without logging.
    pub fn clamped(self) -> Self {
        self.repair(&mut |_| {})
    }

    fn repair(mut self, report: &mut dyn FnMut(fmt::Arguments<'_>)) -> Self {
        let defaults = Self::default();

        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            report(format_args!(
                "sample_rate {} invalid, using {}",
                self.sample_rate,
                defaults.sample_rate
            ));
            self.sample_rate = defaults.sample_rate;
        }
        self.frame_seconds = clamp_field(
            report,
            "frame_seconds",
            self.frame_seconds,
            0.001,
            1.0,
            defaults.frame_seconds,
        );
        self.input_gain = clamp_field(
            report,
            "input_gain",
            self.input_gain,
            0.0,
            2.0,
            defaults.input_gain,
        );
        self.queue_seconds = clamp_field(
            report,
            "queue_seconds",
            self.queue_seconds,
            MIN_QUEUE_SECONDS,
            60.0,
            defaults.queue_seconds,
        );

        if !(self.min_hz.is_finite() && self.min_hz > 0.0) {
            report(format_args!("min_hz {} invalid, using {}", self.min_hz, defaults.min_hz));
            self.min_hz = defaults.min_hz;
        }
        if !(self.max_hz.is_finite() && self.max_hz > self.min_hz) {
            let fallback = if defaults.max_hz > self.min_hz {
                defaults.max_hz
            } else {
                self.min_hz * 2.0
            };
            report(format_args!(
                "max_hz {} must exceed min_hz {}, using {}",
                self.max_hz,
                self.min_hz,
                fallback
            ));
            self.max_hz = fallback;
        }
        self.confidence_threshold = clamp_field(
            report,
            "confidence_threshold",
            self.confidence_threshold,
            0.0,
            1.0,
            defaults.confidence_threshold,
        );

        if !self.min_height.is_finite() {
            report(format_args!(
                "min_height {} invalid, using {}",
                self.min_height,
                defaults.min_height
            ));
            self.min_height = defaults.min_height;
        }
        if !self.max_height.is_finite() {
            report(format_args!(
                "max_height {} invalid, using {}",
                self.max_height,
                defaults.max_height
            ));
            self.max_height = defaults.max_height;
        }
        if !self.global_offset.is_finite() {
            report(format_args!("global_offset {} invalid, using 0", self.global_offset));
            self.global_offset = 0.0;
        }

        if !(self.min_semitone.is_finite() && self.max_semitone.is_finite()) {
            report(format_args!(
                "semitone range [{}, {}] invalid, deriving from frequency range",
                self.min_semitone,
                self.max_semitone
            ));
            self.min_semitone = hz_to_semitone(self.min_hz);
            self.max_semitone = hz_to_semitone(self.max_hz);
        }
        if self.max_semitone < self.min_semitone {
            report(format_args!(
                "semitone range [{}, {}] inverted, swapping",
                self.min_semitone,
                self.max_semitone
            ));
            core::mem::swap(&mut self.min_semitone, &mut self.max_semitone);
        }
        if self.max_semitone - self.min_semitone < 1e-3 {
            report(format_args!(
                "semitone range [{}, {}] is empty, widening to one octave",
                self.min_semitone,
                self.max_semitone
            ));
            self.max_semitone = self.min_semitone + 12.0;
        }

        if self.quantize_divisions < 1 {
            report(format_args!("quantize_divisions 0 invalid, using 1"));
            self.quantize_divisions = 1;
        }
        self.snap_hysteresis = clamp_field(
            report,
            "snap_hysteresis",
            self.snap_hysteresis,
            0.0,
            12.0,
            defaults.snap_hysteresis,
        );

        if !(self.max_semitone_per_sec.is_finite() && self.max_semitone_per_sec > 0.0) {
            report(format_args!(
                "max_semitone_per_sec {} invalid, using {}",
                self.max_semitone_per_sec,
                defaults.max_semitone_per_sec
            ));
            self.max_semitone_per_sec = defaults.max_semitone_per_sec;
        }
        self.min_smoothing = clamp_field(
            report,
            "min_smoothing",
            self.min_smoothing,
            0.0,
            1.0,
            defaults.min_smoothing,
        );
        self.max_smoothing = clamp_field(
            report,
            "max_smoothing",
            self.max_smoothing,
            0.0,
            1.0,
            defaults.max_smoothing,
        );
        if self.min_smoothing > self.max_smoothing {
            report(format_args!(
                "min_smoothing {} exceeds max_smoothing {}, swapping",
                self.min_smoothing,
                self.max_smoothing
            ));
            core::mem::swap(&mut self.min_smoothing, &mut self.max_smoothing);
        }

        self.gain = clamp_field(report, "gain", self.gain, 0.0, 16.0, defaults.gain);
        self.gamma = clamp_field(report, "gamma", self.gamma, 0.01, 16.0, defaults.gamma);

        if self.curve.as_ref().is_some_and(ResponseCurve::is_empty) {
            report(format_args!("response curve has no keys, falling back to power shaping"));
            self.curve = None;
        }

        self
    }
}

/// Clamp `value` into `[lo, hi]`; non-finite values take `fallback`.
fn clamp_field(
    report: &mut dyn FnMut(fmt::Arguments<'_>),
    name: &str,
    value: f32,
    lo: f32,
    hi: f32,
    fallback: f32,
) -> f32 {
    if !value.is_finite() {
        report(format_args!("{name} {value} invalid, using {fallback}"));
        return fallback;
    }
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        report(format_args!("{name} {value} out of range [{lo}, {hi}], clamped to {clamped}"));
    }
    clamped
}
