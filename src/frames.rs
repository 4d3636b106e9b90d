//! Interleaved audio frames shared between the router, effects and the sink.

use std::sync::Arc;

/// An ordered buffer of interleaved 16-bit samples.
///
/// `AudioFrames` is the unit of audio passed through the router. The samples
/// are stored in an `Arc<Vec<i16>>`, so the single copy taken from a caller's
/// slice can be handed to every effect connection without copying again.
///
/// The buffer always holds whole frames: `samples.len()` is a multiple of
/// `channels`.
///
/// # Example
///
/// ```
/// use dsp_router::AudioFrames;
///
/// // 3 stereo frames, plus one stray sample that does not form a full frame
/// let samples = [1i16, -1, 2, -2, 3, -3, 4];
/// let frames = AudioFrames::copy_from(&samples, 10, 2);
///
/// assert_eq!(frames.frame_count(), 3);
/// assert_eq!(frames.samples(), &[1, -1, 2, -2, 3, -3]);
///
/// let shared = frames.clone(); // Cheap clone - shares sample data
/// assert_eq!(shared.samples(), frames.samples());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrames {
    samples: Arc<Vec<i16>>,
    channels: u16,
}

impl AudioFrames {
    /// Wraps owned samples, dropping any trailing partial frame.
    pub fn new(mut samples: Vec<i16>, channels: u16) -> Self {
        let whole = whole_samples(samples.len(), usize::MAX, channels);
        samples.truncate(whole);
        Self {
            samples: Arc::new(samples),
            channels,
        }
    }

    /// Copies up to `num_frames` whole frames out of a borrowed slice.
    ///
    /// This is how callback data enters the router: the caller keeps its
    /// slice, the router keeps only the copy. If the slice is shorter than
    /// `num_frames` frames, only the complete frames present are taken.
    pub fn copy_from(samples: &[i16], num_frames: usize, channels: u16) -> Self {
        let len = whole_samples(samples.len(), num_frames, channels);
        Self {
            samples: Arc::new(samples[..len].to_vec()),
            channels,
        }
    }

    /// Returns the interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the channel count the samples are interleaved with.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the number of audio frames in this buffer.
    ///
    /// A frame contains one sample per channel.
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Returns `true` if this buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Number of samples that form complete frames, capped at `num_frames` frames.
fn whole_samples(available: usize, num_frames: usize, channels: u16) -> usize {
    if channels == 0 {
        return 0;
    }
    let channels = channels as usize;
    let frames = (available / channels).min(num_frames);
    frames * channels
}
