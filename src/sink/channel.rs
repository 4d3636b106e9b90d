//! Tokio mpsc channel sink implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::meter::MeterBuffer;
use crate::sink::AudioSink;
use crate::{AudioFormat, AudioFrames, SinkError};

/// A sink that forwards processed audio to a tokio mpsc channel.
///
/// Use it to hand the routed audio to your own output code, or to observe
/// the router's output in tests. Writes never wait: if the channel is full
/// the buffer is rejected with [`SinkError::WriteFailed`].
///
/// # Example
///
/// ```
/// use dsp_router::{AudioFormat, AudioFrames, ChannelSink};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<AudioFrames>(100);
/// let sink = ChannelSink::new(tx).with_supported_formats([AudioFormat::DEFAULT]);
///
/// // Hand the sink to DspRouter::set_sink, then receive frames:
/// // while let Some(frames) = rx.recv().await { ... }
/// ```
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<AudioFrames>,
    supported: Option<Vec<AudioFormat>>,
    format: RwLock<Option<AudioFormat>>,
    meter: MeterBuffer,
}

impl ChannelSink {
    /// Creates a new channel sink that accepts any format.
    ///
    /// The sender should have enough capacity to absorb bursts from the
    /// effects; a capacity of 100 is typically plenty.
    pub fn new(sender: mpsc::Sender<AudioFrames>) -> Self {
        Self::with_name("channel", sender)
    }

    /// Creates a new channel sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<AudioFrames>) -> Self {
        Self {
            name: name.into(),
            sender,
            supported: None,
            format: RwLock::new(None),
            meter: MeterBuffer::for_format(AudioFormat::DEFAULT),
        }
    }

    /// Restricts the formats `setup` accepts.
    #[must_use]
    pub fn with_supported_formats(mut self, formats: impl IntoIterator<Item = AudioFormat>) -> Self {
        self.supported = Some(formats.into_iter().collect());
        self
    }

    /// Returns the configured format, if `setup` has succeeded.
    pub fn format(&self) -> Option<AudioFormat> {
        *self.format.read()
    }

    fn supports(&self, format: AudioFormat) -> bool {
        self.supported
            .as_ref()
            .map_or(true, |formats| formats.contains(&format))
    }
}

#[async_trait]
impl AudioSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self, format: AudioFormat) -> bool {
        if !self.supports(format) {
            tracing::debug!("ChannelSink {}: rejecting {format}", self.name);
            return false;
        }

        let mut current = self.format.write();
        if *current != Some(format) {
            self.meter.reset_for(format);
            *current = Some(format);
        }
        true
    }

    async fn write(&self, frames: &AudioFrames) -> Result<(), SinkError> {
        let format = self.format().ok_or(SinkError::NotConfigured)?;
        if frames.channels() != format.channels {
            return Err(SinkError::UnsupportedFormat { format });
        }

        self.sender
            .try_send(frames.clone())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SinkError::write_failed("channel full"),
                mpsc::error::TrySendError::Closed(_) => SinkError::ChannelClosed,
            })?;

        self.meter.push(frames.samples());
        Ok(())
    }

    fn rms_samples(&self) -> Vec<i16> {
        self.meter.snapshot()
    }
}
