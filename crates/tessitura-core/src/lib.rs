//! Real-time capture plumbing and shared types for pitch-to-height tracking.
//!
//! # Primary API
//!
//! - [`SampleQueue`]: lock-free SPSC queue between capture and analysis
//! - [`CaptureDevice`] / [`FrameSource`]: pull new audio out of a rolling capture buffer
//! - [`MappingConfig`]: every tunable of the mapping pipeline, loadable from JSON
//! - [`ResponseCurve`]: keyframed shaping curves
//! - [`music`]: note names, semitones and frequencies
//!
//! # Feature-gated APIs
//!
//! - `"capture"`: [`CpalCapture`] microphone input via CPAL (enabled by default)

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{MappingConfig, MIN_FRAME_LEN, MIN_QUEUE_SECONDS};

pub mod curve;
pub use curve::{CurveDomain, CurveKey, ResponseCurve};

pub mod music;
pub use music::{hz_to_semitone, note_label, semitone_to_hz, Note, NoteName, A4_HZ, MIDI_A4};

mod queue;
pub use queue::{SampleConsumer, SampleProducer, SampleQueue};

pub mod capture;
pub use capture::{CaptureDevice, FrameSource, PumpStats, RollingBuffer, RollingCapture};

#[cfg(feature = "capture")]
pub use capture::{CpalCapture, InputDeviceInfo};
