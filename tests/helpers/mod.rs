//! Test helpers and fixtures for tessitura integration tests
//!
//! Trackers built here are fed by a [`RollingCapture`] instead of a
//! microphone, with manual tick control.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact arithmetic
//! - `HEIGHT_EPSILON` (1e-4): Height mapping through pow/log
//! - `CONVERGENCE_RATIO` (0.01): Live tracking against the one-shot mapping

#![allow(dead_code)]

pub mod tolerances;

use std::sync::Arc;
use tessitura::prelude::*;
use tessitura::RollingBuffer;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Analysis frame length used by most tests
pub const TEST_FRAME_LEN: usize = 1024;

/// Host tick matching one frame of audio.
pub const TEST_TICK: f64 = TEST_FRAME_LEN as f64 / TEST_SAMPLE_RATE as f64;

/// Mapping config with 1024-sample frames at the test rate.
pub fn test_config() -> MappingConfig {
    MappingConfig {
        sample_rate: TEST_SAMPLE_RATE as f32,
        frame_seconds: TEST_FRAME_LEN as f32 / TEST_SAMPLE_RATE as f32,
        ..Default::default()
    }
}

/// Build a tracker over a software capture ring. No audio hardware involved.
pub fn test_tracker(config: MappingConfig) -> (Tracker, Arc<RollingBuffer>) {
    let capture = RollingCapture::new(TEST_SAMPLE_RATE, 1.0);
    let writer = capture.writer();
    let tracker = Tracker::builder()
        .config(config)
        .capture(capture)
        .build()
        .expect("Failed to create test tracker");
    (tracker, writer)
}

/// Generate a test signal: sine wave at given frequency, starting at sample `offset`.
pub fn generate_sine(
    frequency: f64,
    sample_rate: f64,
    offset: usize,
    num_samples: usize,
) -> Vec<f32> {
    (offset..offset + num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (0.5 * (2.0 * std::f64::consts::PI * frequency * t).sin()) as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Phase-continuous sine written into a capture ring chunk by chunk.
pub struct ToneFeeder {
    writer: Arc<RollingBuffer>,
    frequency: f64,
    position: usize,
}

impl ToneFeeder {
    pub fn new(writer: Arc<RollingBuffer>, frequency: f64) -> Self {
        Self {
            writer,
            frequency,
            position: 0,
        }
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Write `num_samples` more samples of the tone.
    pub fn feed(&mut self, num_samples: usize) {
        let chunk = generate_sine(
            self.frequency,
            TEST_SAMPLE_RATE as f64,
            self.position,
            num_samples,
        );
        self.position += num_samples;
        self.writer.push_slice(&chunk);
    }
}
