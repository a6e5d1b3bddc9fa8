//! Builder for configuring and constructing a [`Tracker`].

use crate::{Error, Result, Tracker};
use crossbeam_channel::Sender;
use tessitura_analysis::{HeightSnapshot, PipelineDriver, PitchEstimator, YinEstimator};
use tessitura_core::{CaptureDevice, MappingConfig};

/// The mapping config is required. Estimator and capture device default to
/// YIN and the system's default input device (`"capture"` feature).
///
/// The sample rate is determined by the capture device; `config.sample_rate`
/// is replaced by it. Use `tracker.config()` after building to query the
/// effective values.
///
/// # Example
///
/// ```ignore
/// use tessitura::prelude::*;
///
/// let config = MappingConfig::from_path("mapping.json")?;
/// let mut tracker = Tracker::builder().config(config).build()?;
/// tracker.start()?;
///
/// // Once per frame of the host loop:
/// tracker.tick(dt);
/// let height = tracker.snapshot().height;
/// ```
#[derive(Default)]
pub struct TrackerBuilder {
    config: Option<MappingConfig>,
    estimator: Option<Box<dyn PitchEstimator>>,
    device: Option<Box<dyn CaptureDevice>>,
    subscriber: Option<Sender<HeightSnapshot>>,

    #[cfg(feature = "capture")]
    input_device: Option<usize>,
}

impl TrackerBuilder {
    pub fn config(mut self, config: MappingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Default: [`YinEstimator`]
    pub fn estimator(mut self, estimator: impl PitchEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    /// Feed the pipeline from `device` instead of opening a hardware input.
    pub fn capture(mut self, device: impl CaptureDevice + 'static) -> Self {
        self.device = Some(Box::new(device));
        self
    }

    /// Input device index as listed by `CpalCapture::list_input_devices`.
    /// Ignored when a device is supplied with [`capture`](Self::capture).
    #[cfg(feature = "capture")]
    pub fn input_device(mut self, index: usize) -> Self {
        self.input_device = Some(index);
        self
    }

    /// Also deliver every fresh snapshot through `sender`.
    pub fn subscriber(mut self, sender: Sender<HeightSnapshot>) -> Self {
        self.subscriber = Some(sender);
        self
    }

    pub fn build(self) -> Result<Tracker> {
        let Some(config) = self.config else {
            tracing::error!("Tracker built without a mapping config");
            return Err(Error::Core(tessitura_core::Error::MissingConfig));
        };

        let device = match self.device {
            Some(device) => device,
            None => {
                #[cfg(feature = "capture")]
                {
                    let capture = tessitura_core::CpalCapture::new(self.input_device, 1.0)?;
                    capture.set_gain(config.input_gain);
                    Box::new(capture) as Box<dyn CaptureDevice>
                }
                #[cfg(not(feature = "capture"))]
                {
                    return Err(Error::Core(tessitura_core::Error::InvalidDevice(
                        "no capture device supplied and the \"capture\" feature is disabled"
                            .to_string(),
                    )));
                }
            }
        };

        let estimator = self.estimator.unwrap_or_else(|| {
            let frame_len = config.clone().clamped().frame_len();
            Box::new(YinEstimator::with_capacity(frame_len))
        });

        let mut driver = PipelineDriver::new(config, device, estimator);
        if let Some(sender) = self.subscriber {
            driver.subscribe(sender);
        }

        Ok(Tracker::from_driver(driver))
    }
}
