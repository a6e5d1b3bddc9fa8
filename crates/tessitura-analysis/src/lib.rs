//! # Tessitura Analysis
//!
//! Turns live monophonic audio into a smoothed, bounded height.
//!
//! This crate provides:
//! - **Pitch estimation**: the [`PitchEstimator`] capability and its YIN implementation
//! - **Height mapping**: the stateless [`HeightMap`] (normalization, response curves, gamma, gain)
//! - **Tone mapping**: the stateful [`ToneMapper`] (gating, rate limiting, snapping, smoothing)
//! - **Live tracking**: [`PipelineDriver`] ticks the pipeline and publishes [`HeightSnapshot`]s
//!
//! ## Example
//!
//! ```rust
//! use tessitura_analysis::{HeightMap, PitchEstimator, YinEstimator};
//! use tessitura_core::MappingConfig;
//!
//! let sample_rate = 44100.0;
//! let samples: Vec<f32> = (0..2048)
//!     .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate).sin())
//!     .collect();
//!
//! let mut yin = YinEstimator::new();
//! let estimate = yin.estimate(&samples, sample_rate, 80.0, 800.0);
//! assert!(estimate.is_valid());
//!
//! let map = HeightMap::new(&MappingConfig::default());
//! let height = map.evaluate_height(estimate.frequency);
//! assert!((0.5..=6.0).contains(&height));
//! ```

pub mod live;
pub mod mapping;
pub mod pitch;
pub mod tone;

mod handle;

#[cfg(test)]
mod testing;

pub use handle::SnapshotHandle;
pub use live::{run_tracking_thread, HeightSnapshot, LiveState, PipelineDriver};
pub use mapping::{evaluate_height, HeightMap, Normalization, Shaping};
pub use pitch::{PitchEstimate, PitchEstimator, YinEstimator};
pub use tone::{ToneMapper, ToneOutput};
