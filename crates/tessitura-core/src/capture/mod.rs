//! Audio capture sources and the pump that feeds the sample queue.

mod rolling;
pub use rolling::{RollingBuffer, RollingCapture};

#[cfg(feature = "capture")]
mod callback;
#[cfg(feature = "capture")]
mod device;
#[cfg(feature = "capture")]
pub use device::{CpalCapture, InputDeviceInfo};

use crate::queue::SampleProducer;
use crate::Result;

/// Samples moved per chunk by [`FrameSource::pump`].
pub const PUMP_CHUNK: usize = 512;

/// A capture device that records into its own rolling buffer.
///
/// The device owns a ring of [`buffer_len`](Self::buffer_len) mono samples
/// and a monotonic count of samples written. The ring offset of the write
/// head is `write_position() % buffer_len()`.
pub trait CaptureDevice: Send {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn is_capturing(&self) -> bool;

    fn sample_rate(&self) -> u32;

    /// Length of the rolling buffer in samples.
    fn buffer_len(&self) -> usize;

    /// Samples written since capture started, or `None` when not capturing.
    fn write_position(&self) -> Option<u64>;

    /// Copy samples starting at ring `offset` into `dest` without wrapping.
    /// Returns the number copied.
    fn read(&self, offset: usize, dest: &mut [f32]) -> usize;
}

impl CaptureDevice for Box<dyn CaptureDevice> {
    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_capturing(&self) -> bool {
        (**self).is_capturing()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn buffer_len(&self) -> usize {
        (**self).buffer_len()
    }

    fn write_position(&self) -> Option<u64> {
        (**self).write_position()
    }

    fn read(&self, offset: usize, dest: &mut [f32]) -> usize {
        (**self).read(offset, dest)
    }
}

/// Outcome of one [`FrameSource::pump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpStats {
    /// Samples the device produced since the previous pump.
    pub available: usize,
    /// Samples accepted by the queue.
    pub enqueued: usize,
    /// Samples dropped because the queue was full.
    pub dropped: usize,
}

/// Moves newly captured samples from a [`CaptureDevice`] into the queue.
pub struct FrameSource<D: CaptureDevice> {
    device: D,
    producer: SampleProducer,
    scratch: Box<[f32]>,
    cursor: Option<u64>,
}

impl<D: CaptureDevice> FrameSource<D> {
    pub fn new(device: D, producer: SampleProducer) -> Self {
        Self::with_chunk_size(device, producer, PUMP_CHUNK)
    }

    pub fn with_chunk_size(device: D, producer: SampleProducer, chunk: usize) -> Self {
        Self {
            device,
            producer,
            scratch: vec![0.0; chunk.max(1)].into_boxed_slice(),
            cursor: None,
        }
    }

    /// Start the device. Samples captured before the first pump are skipped.
    pub fn start(&mut self) -> Result<()> {
        self.cursor = None;
        self.device.start()?;
        tracing::info!(
            "Capture started ({} Hz, {} sample ring)",
            self.device.sample_rate(),
            self.device.buffer_len()
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        self.device.stop();
        self.cursor = None;
        tracing::info!("Capture stopped");
    }

    pub fn is_capturing(&self) -> bool {
        self.device.is_capturing()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn sample_rate(&self) -> u32 {
        self.device.sample_rate()
    }

    /// Swap in a new queue, returning the old producer.
    pub fn replace_producer(&mut self, producer: SampleProducer) -> SampleProducer {
        std::mem::replace(&mut self.producer, producer)
    }

    /// Samples dropped by the queue since it was created.
    pub fn dropped(&self) -> u64 {
        self.producer.dropped()
    }

    /// Copy everything captured since the previous pump into the queue.
    ///
    /// Never allocates. Capture not started, a position that moved backward,
    /// or a backlog within one chunk of a full ring all count as "no new
    /// data": the cursor resyncs to the device and nothing is enqueued.
    pub fn pump(&mut self) -> PumpStats {
        let Some(position) = self.device.write_position() else {
            self.cursor = None;
            return PumpStats::default();
        };
        let ring_len = self.device.buffer_len();
        if ring_len == 0 {
            return PumpStats::default();
        }

        let Some(cursor) = self.cursor else {
            // First pump after start: begin at the live edge.
            self.cursor = Some(position);
            return PumpStats::default();
        };

        if position < cursor {
            tracing::debug!("Capture position went backward ({position} < {cursor}), resyncing");
            self.cursor = Some(position);
            return PumpStats::default();
        }

        // The oldest unread slots are the next ones the writer overwrites;
        // keep one chunk of slack between the read range and the write head.
        let headroom = self.scratch.len().min(ring_len / 2).max(1);
        let available = position - cursor;
        if available > (ring_len - headroom) as u64 {
            tracing::debug!("Capture backlog of {available} fills ring of {ring_len}, resyncing");
            self.cursor = Some(position);
            return PumpStats::default();
        }

        let mut stats = PumpStats {
            available: available as usize,
            ..Default::default()
        };

        let mut remaining = available as usize;
        let mut offset = (cursor % ring_len as u64) as usize;
        while remaining > 0 {
            let n = remaining.min(self.scratch.len()).min(ring_len - offset);
            let read = self.device.read(offset, &mut self.scratch[..n]);
            if read == 0 {
                break;
            }
            let written = self.producer.enqueue(&self.scratch[..read]);
            stats.enqueued += written;
            stats.dropped += read - written;

            remaining -= read;
            offset = (offset + read) % ring_len;
        }
        // Unread samples (short device read) are skipped; the device has moved on.
        stats.dropped += remaining;

        if stats.dropped > 0 {
            tracing::debug!("Sample queue full, dropped {} samples", stats.dropped);
        }

        self.cursor = Some(position);
        stats
    }
}
