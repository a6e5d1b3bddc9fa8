//! Rolling capture ring written by the audio callback and read by the pump.

use super::CaptureDevice;
use crate::Result;
use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Fixed-length ring of samples with a monotonic write counter.
///
/// One writer (the capture callback) overwrites the oldest samples in place;
/// any number of readers may copy from it concurrently. Slots are atomics, so
/// a reader racing the writer sees either the old or the new sample, never a
/// torn value. Readers that fall a whole lap behind see overwritten data;
/// [`FrameSource`](super::FrameSource) detects that from the counter.
#[derive(Debug)]
pub struct RollingBuffer {
    slots: Box<[AtomicF32]>,
    written: AtomicU64,
    capturing: AtomicBool,
}

impl RollingBuffer {
    pub fn new(len: usize) -> Self {
        let slots = (0..len.max(1)).map(|_| AtomicF32::new(0.0)).collect();
        Self {
            slots,
            written: AtomicU64::new(0),
            capturing: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written() == 0
    }

    /// Total samples written since creation.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    /// Append samples, overwriting the oldest. Single writer only.
    #[inline]
    pub fn push_slice(&self, samples: &[f32]) {
        self.push_iter(samples.iter().copied());
    }

    /// Append samples from an iterator. Single writer only.
    #[inline]
    pub fn push_iter(&self, samples: impl Iterator<Item = f32>) {
        let len = self.slots.len() as u64;
        let start = self.written.load(Ordering::Relaxed);
        let mut n = 0u64;
        for sample in samples {
            self.slots[((start + n) % len) as usize].store(sample, Ordering::Relaxed);
            n += 1;
        }
        // Publishes the slot stores above.
        self.written.store(start + n, Ordering::Release);
    }

    /// Copy `dest.len()` samples starting at ring offset `offset`.
    ///
    /// The range must not cross the end of the ring; callers split wrapped
    /// reads themselves. Out-of-range requests are truncated.
    #[inline]
    pub fn read_into(&self, offset: usize, dest: &mut [f32]) -> usize {
        let Some(src) = self.slots.get(offset..) else {
            return 0;
        };
        let n = dest.len().min(src.len());
        for (d, s) in dest[..n].iter_mut().zip(src) {
            *d = s.load(Ordering::Relaxed);
        }
        n
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.capturing.store(capturing, Ordering::Release);
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }
}

/// A [`CaptureDevice`] fed in software through a shared [`RollingBuffer`].
///
/// Useful for file playback, synthetic signals, and tests: keep the
/// [`writer`](Self::writer) handle and push samples from any one thread.
pub struct RollingCapture {
    buffer: Arc<RollingBuffer>,
    sample_rate: u32,
}

impl RollingCapture {
    /// `seconds` of ring at `sample_rate`.
    pub fn new(sample_rate: u32, seconds: f32) -> Self {
        let len = (sample_rate as f32 * seconds.max(0.01)).ceil() as usize;
        Self::with_len(sample_rate, len)
    }

    pub fn with_len(sample_rate: u32, len: usize) -> Self {
        Self {
            buffer: Arc::new(RollingBuffer::new(len)),
            sample_rate,
        }
    }

    /// Shared handle for the single writer.
    pub fn writer(&self) -> Arc<RollingBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl CaptureDevice for RollingCapture {
    fn start(&mut self) -> Result<()> {
        self.buffer.set_capturing(true);
        Ok(())
    }

    fn stop(&mut self) {
        self.buffer.set_capturing(false);
    }

    fn is_capturing(&self) -> bool {
        self.buffer.is_capturing()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn write_position(&self) -> Option<u64> {
        self.buffer
            .is_capturing()
            .then(|| self.buffer.written())
    }

    fn read(&self, offset: usize, dest: &mut [f32]) -> usize {
        self.buffer.read_into(offset, dest)
    }
}
