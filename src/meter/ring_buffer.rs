//! Rolling sample window for metering.

use std::time::Duration;

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

use crate::format::AudioFormat;

/// A fixed-size window of the most recently written samples.
///
/// Writes overwrite the oldest samples once the window is full, so the
/// writer never waits on readers. [`snapshot`](Self::snapshot) copies the
/// window out under a short lock and is safe to call concurrently with
/// [`push`](Self::push).
///
/// # Example
///
/// ```
/// use dsp_router::meter::MeterBuffer;
///
/// let meter = MeterBuffer::new(4);
/// meter.push(&[1, 2, 3]);
/// meter.push(&[4, 5, 6]);
///
/// assert_eq!(meter.snapshot(), vec![3, 4, 5, 6]);
/// ```
pub struct MeterBuffer {
    ring: Mutex<HeapRb<i16>>,
}

impl MeterBuffer {
    /// Length of audio a window sized with [`for_format`](Self::for_format) covers.
    pub const WINDOW: Duration = Duration::from_micros(16_667);

    /// Creates a window holding `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(HeapRb::new(capacity.max(1))),
        }
    }

    /// Creates a window holding 1/60 s of audio in `format`.
    pub fn for_format(format: AudioFormat) -> Self {
        Self::new(Self::capacity_for(format))
    }

    /// Resizes the window for a new format, discarding its contents.
    pub fn reset_for(&self, format: AudioFormat) {
        *self.ring.lock() = HeapRb::new(Self::capacity_for(format));
    }

    /// Appends samples, overwriting the oldest ones if the window is full.
    pub fn push(&self, samples: &[i16]) {
        self.ring.lock().push_slice_overwrite(samples);
    }

    /// Copies the current window, oldest sample first.
    pub fn snapshot(&self) -> Vec<i16> {
        self.ring.lock().iter().copied().collect()
    }

    /// Returns the window size in samples.
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity().get()
    }

    /// Returns how many samples the window currently holds.
    pub fn len(&self) -> usize {
        self.ring.lock().occupied_len()
    }

    /// Returns `true` if nothing has been written since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity_for(format: AudioFormat) -> usize {
        format
            .samples_for_frames(format.frames_for_duration(Self::WINDOW))
            .max(1)
    }
}

impl std::fmt::Debug for MeterBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
