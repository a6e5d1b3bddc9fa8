//! Lock-free single-producer/single-consumer sample queue.
//!
//! Bridges the capture side (audio callback or [`FrameSource`](crate::FrameSource))
//! and the tick consumer. Construction hands out exactly one
//! [`SampleProducer`] and one [`SampleConsumer`]; neither can be cloned, so a
//! second writer or reader cannot exist.
//!
//! Both directions clip instead of failing: a full queue drops the newest
//! samples (the producer never blocks), and a short read just returns fewer
//! samples.

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared by both halves.
#[derive(Debug, Default)]
struct QueueMeta {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    dequeued: AtomicU64,
}

/// Producer half. Owned by the capture side.
pub struct SampleProducer {
    prod: HeapProd<f32>,
    meta: Arc<QueueMeta>,
}

impl SampleProducer {
    /// Append as much of `chunk` as fits. Returns the number written; the
    /// rest is dropped.
    #[inline]
    pub fn enqueue(&mut self, chunk: &[f32]) -> usize {
        let written = self.prod.push_slice(chunk);
        self.meta.enqueued.fetch_add(written as u64, Ordering::Relaxed);
        let dropped = chunk.len() - written;
        if dropped > 0 {
            self.meta.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
        }
        written
    }

    /// Samples currently queued.
    pub fn count(&self) -> usize {
        self.prod.occupied_len()
    }

    pub fn free_space(&self) -> usize {
        self.prod.vacant_len()
    }

    pub fn capacity(&self) -> usize {
        self.prod.capacity().get()
    }

    /// Total samples rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.meta.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half. Owned by the tick consumer.
pub struct SampleConsumer {
    cons: HeapCons<f32>,
    meta: Arc<QueueMeta>,
}

impl SampleConsumer {
    /// Read up to `dest.len()` samples. Returns the number read.
    #[inline]
    pub fn dequeue(&mut self, dest: &mut [f32]) -> usize {
        let read = self.cons.pop_slice(dest);
        self.meta.dequeued.fetch_add(read as u64, Ordering::Relaxed);
        read
    }

    /// Fill `frame` completely or leave the queue untouched.
    #[inline]
    pub fn try_dequeue_frame(&mut self, frame: &mut [f32]) -> bool {
        if self.cons.occupied_len() < frame.len() {
            return false;
        }
        self.dequeue(frame) == frame.len()
    }

    /// Discard up to `count` of the oldest samples. Returns the number discarded.
    pub fn skip(&mut self, count: usize) -> usize {
        let skipped = self.cons.skip(count);
        self.meta.dequeued.fetch_add(skipped as u64, Ordering::Relaxed);
        skipped
    }

    /// Samples currently queued.
    pub fn count(&self) -> usize {
        self.cons.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cons.capacity().get()
    }

    /// Lifetime totals `(enqueued, dequeued, dropped)`.
    pub fn totals(&self) -> (u64, u64, u64) {
        (
            self.meta.enqueued.load(Ordering::Relaxed),
            self.meta.dequeued.load(Ordering::Relaxed),
            self.meta.dropped.load(Ordering::Relaxed),
        )
    }
}

/// Sample queue factory.
pub struct SampleQueue;

impl SampleQueue {
    /// Create a queue holding `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> (SampleProducer, SampleConsumer) {
        let rb = HeapRb::<f32>::new(capacity.max(1));
        let (prod, cons) = rb.split();
        let meta = Arc::new(QueueMeta::default());

        (
            SampleProducer {
                prod,
                meta: Arc::clone(&meta),
            },
            SampleConsumer { cons, meta },
        )
    }

    /// Create a queue sized from the config (at least two seconds of audio).
    pub fn for_config(config: &crate::MappingConfig) -> (SampleProducer, SampleConsumer) {
        Self::with_capacity(config.queue_capacity())
    }
}
