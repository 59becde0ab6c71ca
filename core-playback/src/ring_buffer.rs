//! # Ring Buffer for Live PCM Samples
//!
//! Fixed-capacity circular buffer between the streaming transport
//! (producer) and the hardware render callback (consumer).
//!
//! ## Design
//!
//! - **Capacity**: Fixed size in interleaved samples, set at creation
//! - **Overwrite Policy**: When full, the oldest samples are dropped. A live
//!   stream favours current audio over continuity, so a slow consumer hears
//!   a jump forward rather than growing latency.
//! - **Locking**: One `parking_lot::Mutex` guards positions and storage
//!   together, so readers never see a torn update.
//!
//! ## Usage
//!
//! ```rust
//! use core_playback::ring_buffer::RingBuffer;
//!
//! let buffer = RingBuffer::new(8);
//! buffer.write(&[0.1, -0.1, 0.2, -0.2]);
//!
//! let mut output = [0.0f32; 3];
//! assert_eq!(buffer.read(&mut output), 3);
//! assert_eq!(buffer.available(), 1);
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<Mutex<RingState>>,
    capacity: usize,
}

struct RingState {
    samples: Vec<f32>,
    read_pos: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a new ring buffer holding `capacity` interleaved samples.
    ///
    /// A zero capacity is bumped to one sample so arithmetic stays defined.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(RingState {
                samples: vec![0.0; capacity],
                read_pos: 0,
                len: 0,
            })),
            capacity,
        }
    }

    /// Write samples, overwriting the oldest ones when full.
    ///
    /// Returns how many previously buffered samples were dropped.
    pub fn write(&self, samples: &[f32]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        // Only the newest `capacity` samples can survive.
        let incoming = &samples[samples.len().saturating_sub(self.capacity)..];
        let skipped = samples.len() - incoming.len();

        let mut state = self.inner.lock();
        let overflow = (state.len + incoming.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            let dropped = overflow.min(state.len);
            state.read_pos = (state.read_pos + dropped) % self.capacity;
            state.len -= dropped;
        }

        let mut write_pos = (state.read_pos + state.len) % self.capacity;
        for &sample in incoming {
            state.samples[write_pos] = sample;
            write_pos = (write_pos + 1) % self.capacity;
        }
        state.len += incoming.len();

        overflow + skipped
    }

    /// Read up to `output.len()` samples in arrival order.
    ///
    /// Returns the number of samples actually read.
    pub fn read(&self, output: &mut [f32]) -> usize {
        let mut state = self.inner.lock();
        let to_read = state.len.min(output.len());

        for (i, slot) in output.iter_mut().take(to_read).enumerate() {
            *slot = state.samples[(state.read_pos + i) % self.capacity];
        }

        state.read_pos = (state.read_pos + to_read) % self.capacity;
        state.len -= to_read;
        to_read
    }

    /// Returns the number of samples currently available to read.
    pub fn available(&self) -> usize {
        self.inner.lock().len
    }

    /// Returns the number of samples that can be written before overwriting.
    pub fn free_space(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the buffer fill percentage (0.0 to 1.0).
    pub fn fill_level(&self) -> f32 {
        self.available() as f32 / self.capacity as f32
    }

    /// Drop everything buffered.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.read_pos = 0;
        state.len = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn is_full(&self) -> bool {
        self.available() == self.capacity
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_preserves_order() {
        let buffer = RingBuffer::new(8);
        assert_eq!(buffer.write(&[1.0, 2.0, 3.0]), 0);

        let mut out = [0.0; 8];
        assert_eq!(buffer.read(&mut out), 3);
        assert_eq!(&out[..3], &[1.0, 2.0, 3.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overwrite_drops_oldest() {
        let buffer = RingBuffer::new(4);
        buffer.write(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.write(&[4.0, 5.0, 6.0]), 2);
        assert!(buffer.is_full());

        let mut out = [0.0; 4];
        assert_eq!(buffer.read(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_oversized_write_keeps_newest_tail() {
        let buffer = RingBuffer::new(3);
        buffer.write(&[9.0]);
        assert_eq!(buffer.write(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);

        let mut out = [0.0; 3];
        buffer.read(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_wraparound() {
        let buffer = RingBuffer::new(4);
        let mut out = [0.0; 3];

        buffer.write(&[1.0, 2.0, 3.0]);
        buffer.read(&mut out);
        buffer.write(&[4.0, 5.0, 6.0]);

        assert_eq!(buffer.available(), 3);
        assert_eq!(buffer.free_space(), 1);
        assert_eq!(buffer.read(&mut out), 3);
        assert_eq!(out, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_clear() {
        let buffer = RingBuffer::new(16);
        buffer.write(&[0.5; 8]);
        assert!((buffer.fill_level() - 0.5).abs() < f32::EPSILON);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.free_space(), 16);
    }
}
