//! Live pitch tracking driven by the host tick.
//!
//! [`PipelineDriver::tick`] pumps new capture data into the sample queue,
//! estimates the pitch of the newest full frame and maps it to a height.
//! Results are published via `ArcSwap` for lock-free reads from any thread.

use crate::pitch::{PitchEstimate, PitchEstimator};
use crate::tone::ToneMapper;
use arc_swap::ArcSwap;
use core::sync::atomic::{AtomicBool, Ordering};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tessitura_core::music::{hz_to_semitone, note_label};
use tessitura_core::{CaptureDevice, FrameSource, MappingConfig, SampleConsumer, SampleQueue};

/// One published tracking result.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HeightSnapshot {
    pub frequency: f32,
    pub confidence: f32,
    pub height: f32,
    /// Pipeline clock in seconds when the snapshot was taken.
    pub timestamp: f64,
}

impl HeightSnapshot {
    /// Snapshot shown before any pitch has been tracked.
    pub fn at_rest(height: f32) -> Self {
        Self {
            frequency: 0.0,
            confidence: 0.0,
            height,
            timestamp: 0.0,
        }
    }

    /// Nearest note name (e.g., "A3"), if a pitch has been tracked.
    pub fn note_label(&self) -> Option<String> {
        (self.frequency > 0.0 && self.frequency.is_finite())
            .then(|| note_label(hz_to_semitone(self.frequency)))
    }
}

/// Shared state between the tracking driver and `SnapshotHandle`.
///
/// All fields are lock-free for reads from any thread.
pub struct LiveState {
    /// Latest successfully mapped result.
    pub snapshot: ArcSwap<HeightSnapshot>,
    /// Raw estimate of the most recent frame, valid or not.
    pub estimate: ArcSwap<PitchEstimate>,
    /// Set to false to signal the tracking thread to stop.
    running: AtomicBool,
}

impl LiveState {
    pub fn new(rest_height: f32) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HeightSnapshot::at_rest(rest_height)),
            estimate: ArcSwap::from_pointee(PitchEstimate::INVALID),
            running: AtomicBool::new(true),
        }
    }

    /// Signal the tracking thread to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Allow a tracking thread to run again after `stop`.
    pub fn resume(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Check if the tracking thread should keep running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Runs one capture → queue → estimate → map step per host tick.
pub struct PipelineDriver {
    source: FrameSource<Box<dyn CaptureDevice>>,
    consumer: SampleConsumer,
    estimator: Box<dyn PitchEstimator>,
    mapper: ToneMapper,
    config: MappingConfig,
    frame: Vec<f32>,
    clock: f64,
    state: Arc<LiveState>,
    subscriber: Option<Sender<HeightSnapshot>>,
}

impl PipelineDriver {
    /// Build a driver around an already opened capture device.
    ///
    /// The device's sample rate replaces `config.sample_rate`.
    pub fn new(
        config: MappingConfig,
        device: Box<dyn CaptureDevice>,
        estimator: Box<dyn PitchEstimator>,
    ) -> Self {
        let config = Self::bind_sample_rate(config, device.sample_rate());
        let (producer, consumer) = SampleQueue::for_config(&config);
        let mapper = ToneMapper::from_sanitized(&config);
        let state = Arc::new(LiveState::new(mapper.height()));

        tracing::info!(
            "Pitch pipeline: {} estimator, {} Hz, {}-sample frames, queue of {} samples",
            estimator.name(),
            config.sample_rate,
            config.frame_len(),
            consumer.capacity()
        );

        Self {
            source: FrameSource::new(device, producer),
            consumer,
            estimator,
            mapper,
            frame: vec![0.0; config.frame_len()],
            config,
            clock: 0.0,
            state,
            subscriber: None,
        }
    }

    fn bind_sample_rate(config: MappingConfig, device_rate: u32) -> MappingConfig {
        let mut config = config.sanitized();
        let device_rate = device_rate as f32;
        if device_rate > 0.0 && device_rate != config.sample_rate {
            tracing::info!(
                "Using device sample rate {} Hz (configured {} Hz)",
                device_rate,
                config.sample_rate
            );
            config.sample_rate = device_rate;
        }
        config
    }

    /// Send every fresh snapshot to `sender` as well. Full channels skip the
    /// value; a disconnected receiver unsubscribes.
    pub fn subscribe(&mut self, sender: Sender<HeightSnapshot>) {
        self.subscriber = Some(sender);
    }

    pub fn start(&mut self) -> tessitura_core::Result<()> {
        self.source.start()
    }

    pub fn stop(&mut self) {
        self.source.stop();
    }

    pub fn is_capturing(&self) -> bool {
        self.source.is_capturing()
    }

    pub fn state(&self) -> Arc<LiveState> {
        Arc::clone(&self.state)
    }

    /// Effective (sanitized, device-rate) configuration.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn mapper(&self) -> &ToneMapper {
        &self.mapper
    }

    pub fn frame_len(&self) -> usize {
        self.frame.len()
    }

    /// Pipeline clock in seconds.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<HeightSnapshot> {
        self.state.snapshot.load_full()
    }

    /// Swap the mapping configuration. Mapper state and queued audio are
    /// discarded; the capture device keeps running.
    pub fn reconfigure(&mut self, config: MappingConfig) {
        let config = Self::bind_sample_rate(config, self.source.sample_rate());
        let (producer, consumer) = SampleQueue::for_config(&config);
        self.source.replace_producer(producer);
        self.consumer = consumer;
        self.mapper = ToneMapper::from_sanitized(&config);
        self.frame = vec![0.0; config.frame_len()];
        self.config = config;
        self.state
            .snapshot
            .store(Arc::new(HeightSnapshot::at_rest(self.mapper.height())));
        tracing::info!("Pitch pipeline reconfigured");
    }

    /// Advance the pipeline by `elapsed` seconds.
    ///
    /// Returns true when a fresh snapshot was published. Not enough audio,
    /// no voiced pitch, or low confidence all return false and leave the
    /// previous snapshot in place.
    pub fn tick(&mut self, elapsed: f64) -> bool {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.clock += elapsed;
        }

        self.source.pump();

        // Only the newest frame matters; drop anything older.
        let frame_len = self.frame.len();
        let backlog = self.consumer.count();
        if backlog >= frame_len * 2 {
            let skipped = self.consumer.skip(backlog - frame_len);
            tracing::debug!("Skipped {} stale samples", skipped);
        }

        if !self.consumer.try_dequeue_frame(&mut self.frame) {
            return false;
        }

        let estimate = self.estimator.estimate(
            &self.frame,
            self.config.sample_rate,
            self.config.min_hz,
            self.config.max_hz,
        );
        self.state.estimate.store(Arc::new(estimate));

        let output = self.mapper.map(estimate, self.clock);
        if !output.fresh {
            return false;
        }

        let snapshot = HeightSnapshot {
            frequency: estimate.frequency,
            confidence: estimate.confidence,
            height: output.height,
            timestamp: self.clock,
        };
        self.state.snapshot.store(Arc::new(snapshot));

        if let Some(sender) = &self.subscriber {
            if let Err(TrySendError::Disconnected(_)) = sender.try_send(snapshot) {
                tracing::debug!("Snapshot subscriber disconnected");
                self.subscriber = None;
            }
        }

        true
    }
}

/// Run the tracking loop, ticking every `interval`.
///
/// This function blocks until `state.stop()` is called on the driver's
/// [`LiveState`].
pub fn run_tracking_thread(driver: &mut PipelineDriver, interval: Duration) {
    let state = driver.state();
    let mut last = Instant::now();

    while state.is_running() {
        let now = Instant::now();
        driver.tick(now.duration_since(last).as_secs_f64());
        last = now;
        std::thread::sleep(interval);
    }
}
