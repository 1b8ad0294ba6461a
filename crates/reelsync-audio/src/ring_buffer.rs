//! Lock-free single-producer single-consumer ring buffer for f32 samples.
//!
//! The mixer is the only producer; the monitor device callback or the
//! recording pipeline is the only consumer.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A SPSC ring buffer of interleaved f32 samples.
pub struct RingBuffer {
    slots: Box<[UnsafeCell<f32>]>,
    /// Slot count; one more than the usable capacity so full and empty differ.
    len: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: one producer writes only the free region between `tail` and `head`,
// one consumer reads only the filled region between `head` and `tail`. The
// regions never overlap and are published through acquire/release stores.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Create a ring buffer holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let len = capacity + 1;
        Self {
            slots: (0..len).map(|_| UnsafeCell::new(0.0)).collect(),
            len,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Maximum number of queued samples.
    pub fn capacity(&self) -> usize {
        self.len - 1
    }

    /// Samples ready to read.
    pub fn queued(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        if tail >= head {
            tail - head
        } else {
            self.len - head + tail
        }
    }

    /// Room left for writing.
    pub fn free(&self) -> usize {
        self.capacity() - self.queued()
    }

    pub fn is_empty(&self) -> bool {
        self.queued() == 0
    }

    fn slot_ptr(&self) -> *mut f32 {
        UnsafeCell::raw_get(self.slots.as_ptr())
    }

    /// Append samples. Anything that does not fit is dropped; returns the
    /// number written.
    pub fn write(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.free());
        if count == 0 {
            return 0;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        let first = (self.len - tail).min(count);

        // SAFETY: `[tail, tail + count)` (mod len) lies in the free region,
        // which the consumer never touches.
        unsafe {
            let base = self.slot_ptr();
            std::ptr::copy_nonoverlapping(data.as_ptr(), base.add(tail), first);
            std::ptr::copy_nonoverlapping(data[first..].as_ptr(), base, count - first);
        }

        self.tail.store((tail + count) % self.len, Ordering::Release);
        count
    }

    /// Pop up to `out.len()` samples; returns the number read.
    pub fn read(&self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.queued());
        if count == 0 {
            return 0;
        }
        let head = self.head.load(Ordering::Relaxed);
        let first = (self.len - head).min(count);

        // SAFETY: `[head, head + count)` (mod len) lies in the filled region,
        // which the producer never touches.
        unsafe {
            let base = self.slot_ptr() as *const f32;
            std::ptr::copy_nonoverlapping(base.add(head), out.as_mut_ptr(), first);
            std::ptr::copy_nonoverlapping(base, out[first..].as_mut_ptr(), count - first);
        }

        self.head.store((head + count) % self.len, Ordering::Release);
        count
    }

    /// Pop everything currently queued.
    pub fn drain(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.queued()];
        let n = self.read(&mut out);
        out.truncate(n);
        out
    }

    /// Discard everything queued.
    pub fn clear(&self) {
        self.head
            .store(self.tail.load(Ordering::Acquire), Ordering::Release);
    }
}
