//! # Tessitura - Real-time Pitch Tracking
//!
//! Turns a live monophonic voice into a smoothed, bounded height.
//!
//! ## Architecture
//!
//! Tessitura is an umbrella crate that coordinates:
//! - **tessitura-core** - Sample queue, capture sources, mapping config, response curves, note math
//! - **tessitura-analysis** - YIN pitch estimation, height mapping, tone mapping, live driver
//!
//! The pipeline per tick: capture ring → [`FrameSource`] → [`SampleQueue`] →
//! [`PitchEstimator`] → [`ToneMapper`] → [`HeightSnapshot`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use tessitura::prelude::*;
//!
//! let mut tracker = Tracker::builder()
//!     .config(MappingConfig::default())
//!     .build()?;
//! tracker.start()?;
//!
//! // Drive it from the host loop...
//! tracker.tick(1.0 / 60.0);
//!
//! // ...or let it run on its own thread.
//! let background = tracker.spawn(std::time::Duration::from_millis(10))?;
//! let handle = background.handle();
//! println!("height = {}", handle.height());
//! ```
//!
//! Without a live input, [`evaluate_height`] maps a frequency to a height in
//! one shot:
//!
//! ```
//! use tessitura::{evaluate_height, MappingConfig};
//!
//! let config = MappingConfig::default();
//! let height = evaluate_height(&config, 261.63);
//! assert!(height >= config.min_height && height <= config.max_height);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Microphone capture
//! - `capture` - CPAL input device ([`CpalCapture`])
//! - `serialization` - serde derives for estimates and snapshots
//! - `monitor` - the `tessitura-monitor` binary

/// Re-export of tessitura-core for direct access
pub use tessitura_core as core;

/// Re-export of tessitura-analysis for direct access
pub use tessitura_analysis as analysis;

// Core types
pub use tessitura_core::{
    // Capture
    CaptureDevice,
    FrameSource,
    PumpStats,
    RollingBuffer,
    RollingCapture,

    // Config and shaping
    CurveDomain,
    CurveKey,
    MappingConfig,
    ResponseCurve,

    // Music
    Note,
    NoteName,

    // Queue
    SampleConsumer,
    SampleProducer,
    SampleQueue,
};

#[cfg(feature = "capture")]
pub use tessitura_core::{CpalCapture, InputDeviceInfo};

// Analysis types
pub use tessitura_analysis::{
    evaluate_height, HeightMap, HeightSnapshot, Normalization, PitchEstimate, PitchEstimator,
    Shaping, SnapshotHandle, ToneMapper, YinEstimator,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod tracker;

pub use builder::TrackerBuilder;
pub use tracker::{BackgroundTracker, Tracker};

/// Convenience prelude for common imports
pub mod prelude {
    // Main tracker
    pub use crate::{BackgroundTracker, Tracker, TrackerBuilder};

    // Results
    pub use crate::{HeightSnapshot, PitchEstimate, SnapshotHandle};

    // Configuration
    pub use crate::{MappingConfig, ResponseCurve};

    // Estimation
    pub use crate::{PitchEstimator, YinEstimator};

    // Capture
    pub use crate::{CaptureDevice, RollingCapture};

    #[cfg(feature = "capture")]
    pub use crate::CpalCapture;
}
