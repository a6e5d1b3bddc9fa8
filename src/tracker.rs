//! Tracker: owns the pitch pipeline and runs it on the host tick or a
//! background thread.

use crate::{Error, Result, TrackerBuilder};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tessitura_analysis::{
    run_tracking_thread, HeightMap, HeightSnapshot, LiveState, PipelineDriver, SnapshotHandle,
};
use tessitura_core::MappingConfig;

/// Live voice-to-height tracker.
///
/// Either call [`tick`](Self::tick) from the host loop, or hand the tracker to
/// [`spawn`](Self::spawn) and read results through a [`SnapshotHandle`].
pub struct Tracker {
    driver: PipelineDriver,
}

impl Tracker {
    /// Create a new tracker builder
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::default()
    }

    pub(crate) fn from_driver(driver: PipelineDriver) -> Self {
        Self { driver }
    }

    /// Start capturing audio.
    pub fn start(&mut self) -> Result<()> {
        self.driver.start()?;
        Ok(())
    }

    /// Stop capturing. The last snapshot stays readable.
    pub fn stop(&mut self) {
        self.driver.stop();
    }

    pub fn is_capturing(&self) -> bool {
        self.driver.is_capturing()
    }

    /// Advance the pipeline by `elapsed` seconds; true when a fresh snapshot
    /// was published.
    pub fn tick(&mut self, elapsed: f64) -> bool {
        self.driver.tick(elapsed)
    }

    pub fn snapshot(&self) -> Arc<HeightSnapshot> {
        self.driver.snapshot()
    }

    /// Read-only handle for other threads. Survives `reconfigure` and `spawn`.
    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle::new(self.driver.state())
    }

    /// Effective configuration (sanitized, device sample rate).
    pub fn config(&self) -> &MappingConfig {
        self.driver.config()
    }

    pub fn height_map(&self) -> &HeightMap {
        self.driver.mapper().height_map()
    }

    /// Swap the mapping config. Smoothing state and queued audio are reset.
    pub fn reconfigure(&mut self, config: MappingConfig) {
        self.driver.reconfigure(config);
    }

    /// Receive fresh snapshots over a bounded channel. Replaces any previous
    /// subscription; snapshots that don't fit are skipped.
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<HeightSnapshot> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        self.driver.subscribe(sender);
        receiver
    }

    /// Run the tick loop on a background thread, ticking every `interval`.
    ///
    /// Starts capture if it isn't running yet.
    pub fn spawn(self, interval: Duration) -> Result<BackgroundTracker> {
        let mut driver = self.driver;
        let state = driver.state();
        state.resume();
        if !driver.is_capturing() {
            driver.start()?;
        }

        let thread = std::thread::Builder::new()
            .name("tessitura-tracker".into())
            .spawn(move || {
                run_tracking_thread(&mut driver, interval);
                driver
            })?;

        tracing::info!("Tracking thread started ({:?} interval)", interval);
        Ok(BackgroundTracker {
            state,
            thread: Some(thread),
        })
    }
}

/// A [`Tracker`] running on its own thread. Dropping it stops the thread.
pub struct BackgroundTracker {
    state: Arc<LiveState>,
    thread: Option<JoinHandle<PipelineDriver>>,
}

impl BackgroundTracker {
    pub fn handle(&self) -> SnapshotHandle {
        SnapshotHandle::new(Arc::clone(&self.state))
    }

    pub fn snapshot(&self) -> Arc<HeightSnapshot> {
        self.state.snapshot.load_full()
    }

    /// Stop the thread and take the tracker back. Capture keeps running.
    pub fn stop(mut self) -> Result<Tracker> {
        self.state.stop();
        let thread = self.thread.take().ok_or(Error::TrackingThreadPanicked)?;
        let driver = thread.join().map_err(|_| Error::TrackingThreadPanicked)?;
        tracing::info!("Tracking thread stopped");
        Ok(Tracker::from_driver(driver))
    }
}

impl Drop for BackgroundTracker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.state.stop();
            let _ = thread.join();
        }
    }
}
