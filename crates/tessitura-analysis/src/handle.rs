//! Read-only handle onto the live tracking results

use crate::live::{HeightSnapshot, LiveState};
use crate::pitch::PitchEstimate;
use std::sync::Arc;

/// Cheap, cloneable reader for downstream consumers.
///
/// Every read is a single atomic pointer load; a reader sees either the old
/// or the new snapshot in full, never a mix.
#[derive(Clone)]
pub struct SnapshotHandle {
    live: Arc<LiveState>,
}

impl SnapshotHandle {
    pub fn new(live: Arc<LiveState>) -> Self {
        Self { live }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<HeightSnapshot> {
        self.live.snapshot.load_full()
    }

    /// Height of the latest snapshot.
    pub fn height(&self) -> f32 {
        self.live.snapshot.load().height
    }

    /// Raw estimate of the most recent frame, including rejected ones.
    pub fn latest_estimate(&self) -> Arc<PitchEstimate> {
        self.live.estimate.load_full()
    }

    /// Whether the tracking loop is still meant to run.
    pub fn is_running(&self) -> bool {
        self.live.is_running()
    }
}
