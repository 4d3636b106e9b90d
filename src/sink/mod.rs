//! Sink trait and implementations for the final audio output.
//!
//! An [`AudioSink`] is the device that ultimately plays the processed audio.
//! The router owns exactly one active sink at a time. The crate provides:
//!
//! - [`ChannelSink`]: Sends frames to a tokio mpsc channel
//! - [`FileSink`]: Writes frames to a WAV file
//! - `DeviceSink` (feature `device`): Plays through the default output device
//!
//! You can implement [`AudioSink`] for other outputs such as a network stream.

mod channel;
#[cfg(feature = "device")]
mod device;
mod file;

pub use channel::ChannelSink;
#[cfg(feature = "device")]
pub use device::DeviceSink;
pub use file::FileSink;

use async_trait::async_trait;

use crate::{AudioFormat, AudioFrames, SinkError};

/// The final destination for processed audio.
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability (`Mutex`, `RwLock`) if needed
/// - Only the router calls `setup`; calling it again with the same format must
///   neither glitch nor leak resources
/// - `write` runs on the audio delivery path; don't block on slow I/O there
/// - `rms_samples` may be called concurrently with `write`; keep the recent
///   samples in a [`MeterBuffer`](crate::meter::MeterBuffer)
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use dsp_router::meter::MeterBuffer;
/// use dsp_router::{AudioFormat, AudioFrames, AudioSink, SinkError};
///
/// struct PrintSink {
///     meter: MeterBuffer,
/// }
///
/// #[async_trait]
/// impl AudioSink for PrintSink {
///     fn name(&self) -> &str {
///         "print"
///     }
///
///     async fn setup(&self, format: AudioFormat) -> bool {
///         self.meter.reset_for(format);
///         format.channels <= 2
///     }
///
///     async fn write(&self, frames: &AudioFrames) -> Result<(), SinkError> {
///         println!("Received {} frames", frames.frame_count());
///         self.meter.push(frames.samples());
///         Ok(())
///     }
///
///     fn rms_samples(&self) -> Vec<i16> {
///         self.meter.snapshot()
///     }
/// }
/// ```
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Configures the sink for `format`.
    ///
    /// Returns `false` if the format is not supported. Calling it again with
    /// the format already configured returns `true` without reconfiguring.
    async fn setup(&self, format: AudioFormat) -> bool;

    /// Plays already-processed audio in the configured format.
    async fn write(&self, frames: &AudioFrames) -> Result<(), SinkError>;

    /// Returns the most recent window of written samples, for metering.
    ///
    /// An empty vector is a valid answer.
    fn rms_samples(&self) -> Vec<i16>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink that accepts a fixed set of formats and records what it was given.
    pub(crate) struct TestSink {
        name: String,
        accepted: Vec<AudioFormat>,
        pub(crate) setups: Mutex<Vec<AudioFormat>>,
        pub(crate) written: Mutex<Vec<i16>>,
        writes: AtomicUsize,
        rms_window: Mutex<Vec<i16>>,
    }

    impl TestSink {
        /// Accepts every format.
        pub(crate) fn new(name: &str) -> Self {
            Self::accepting(name, &[])
        }

        /// Accepts only `formats`; an empty slice accepts everything.
        pub(crate) fn accepting(name: &str, formats: &[AudioFormat]) -> Self {
            Self {
                name: name.to_string(),
                accepted: formats.to_vec(),
                setups: Mutex::new(Vec::new()),
                written: Mutex::new(Vec::new()),
                writes: AtomicUsize::new(0),
                rms_window: Mutex::new(Vec::new()),
            }
        }

        /// Accepts no format at all.
        pub(crate) fn rejecting(name: &str) -> Self {
            let mut sink = Self::new(name);
            sink.accepted = vec![AudioFormat {
                sample_rate: 1,
                channels: 1,
            }];
            sink
        }

        pub(crate) fn with_rms_window(self, window: Vec<i16>) -> Self {
            *self.rms_window.lock() = window;
            self
        }

        pub(crate) fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub(crate) fn last_setup(&self) -> Option<AudioFormat> {
            self.setups.lock().last().copied()
        }
    }

    #[async_trait]
    impl AudioSink for TestSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn setup(&self, format: AudioFormat) -> bool {
            let ok = self.accepted.is_empty() || self.accepted.contains(&format);
            if ok {
                self.setups.lock().push(format);
            }
            ok
        }

        async fn write(&self, frames: &AudioFrames) -> Result<(), SinkError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.written.lock().extend_from_slice(frames.samples());
            Ok(())
        }

        fn rms_samples(&self) -> Vec<i16> {
            self.rms_window.lock().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::TestSink;
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sink_lifecycle() {
        let sink = TestSink::new("test");

        assert!(sink.setup(AudioFormat::DEFAULT).await);

        let frames = AudioFrames::new(vec![0i16; 100], 2);
        sink.write(&frames).await.unwrap();
        sink.write(&frames).await.unwrap();

        assert_eq!(sink.writes(), 2);
    }

    #[tokio::test]
    async fn test_sink_name() {
        let sink = TestSink::new("my-sink");
        assert_eq!(sink.name(), "my-sink");
    }

    #[test]
    fn test_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<dyn AudioSink>>();
    }
}
