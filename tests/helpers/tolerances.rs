//! Tolerance constants for pitch-tracking tests.
//!
//! Different checks need different precision levels.

/// Floating point rounding errors.
/// Use for results that should be mathematically exact.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Height mapping tolerance (log2, powf and lerp in f32).
pub const HEIGHT_EPSILON: f32 = 1e-4;

/// Relative tolerance for a live height against the one-shot mapping.
pub const CONVERGENCE_RATIO: f32 = 0.01;

/// Detected frequency tolerance for an integer-lag estimate at 48 kHz, in Hz.
/// At 220 Hz one sample of lag is about 1 Hz.
pub const FREQUENCY_TOLERANCE_HZ: f32 = 2.0;
