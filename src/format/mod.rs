//! Audio format negotiation and sample conversion.
//!
//! [`AudioFormat`] is the `(sample_rate, channels)` pair every component of
//! the routing graph must agree on. The conversion helpers are used by sinks
//! that hand samples to devices expecting floating point.

mod convert;

pub use convert::{f32_to_i16, i16_to_f32, i16_to_u16};

use std::fmt;

use crate::RouterError;

/// Sample rate and channel count of interleaved 16-bit audio.
///
/// Both fields are always positive; use [`AudioFormat::new`] to build one from
/// untrusted values.
///
/// # Example
///
/// ```
/// use dsp_router::AudioFormat;
///
/// let format = AudioFormat::new(48000, 2).unwrap();
/// assert_eq!(format.to_string(), "48000Hz/2ch");
/// assert!(AudioFormat::new(0, 2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Samples per second, per channel.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl AudioFormat {
    /// 44.1kHz stereo, the format every sink is expected to support.
    pub const DEFAULT: Self = Self {
        sample_rate: 44100,
        channels: 2,
    };

    /// Creates a format, rejecting a zero sample rate or channel count.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, RouterError> {
        if sample_rate == 0 || channels == 0 {
            return Err(RouterError::InvalidFormat {
                sample_rate,
                channels,
            });
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Number of interleaved samples needed for `frames` frames.
    #[must_use]
    pub fn samples_for_frames(&self, frames: usize) -> usize {
        frames * self.channels as usize
    }

    /// Number of frames covering `duration` at this sample rate, rounded down.
    #[must_use]
    pub fn frames_for_duration(&self, duration: std::time::Duration) -> usize {
        (f64::from(self.sample_rate) * duration.as_secs_f64()) as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz/{}ch", self.sample_rate, self.channels)
    }
}
