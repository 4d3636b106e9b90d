//! Error types for dsp-router.
//!
//! Errors are split into three categories:
//! - **Fatal errors** ([`RouterError`]): An operation on the router could not complete
//! - **Sink errors** ([`SinkError`]): A single write or setup on the output failed
//! - **Transport errors** ([`TransportError`]): One effect connection failed; the
//!   router logs it and keeps routing to the others
//!
//! Runtime issues that never escalate are also surfaced through
//! [`EventCallback`](crate::EventCallback).

use std::io;
use std::path::PathBuf;

use crate::format::AudioFormat;

/// Errors returned from the router's control surface.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The sink rejected both the active format and the fallback format.
    ///
    /// The sink was not installed; the router keeps whatever sink it had before.
    #[error("sink '{sink_name}' supports neither {requested} nor the fallback format {fallback}")]
    SinkIncompatible {
        /// Name of the rejected sink.
        sink_name: String,
        /// Format that was active when the sink was offered.
        requested: AudioFormat,
        /// Fallback format that was also rejected.
        fallback: AudioFormat,
    },

    /// A sample rate or channel count of zero was supplied.
    #[error("invalid audio format: {sample_rate}Hz, {channels} channels")]
    InvalidFormat {
        /// Requested sample rate.
        sample_rate: u32,
        /// Requested channel count.
        channels: u16,
    },

    /// An effect ID was registered more than once.
    #[error("duplicate effect ID: {effect_id}")]
    DuplicateEffectId {
        /// The duplicated effect ID.
        effect_id: String,
    },
}

/// Errors that can occur within an [`AudioSink`](crate::AudioSink) implementation.
///
/// Sink errors are recoverable - the router emits a
/// [`RouterEvent::SinkWriteFailed`](crate::RouterEvent::SinkWriteFailed) and
/// carries on with the next buffer.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// File I/O error.
    #[error("file error: {path}: {source}")]
    FileError {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The sink cannot play the given format.
    #[error("unsupported format: {format}")]
    UnsupportedFormat {
        /// The rejected format.
        format: AudioFormat,
    },

    /// The sink was written to before `setup` succeeded.
    #[error("sink not configured (call setup first)")]
    NotConfigured,

    /// The output device reported an error.
    #[error("device error: {0}")]
    Device(String),

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a file error for the given path.
    pub fn file_error(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by an [`AudioSocket`](crate::AudioSocket).
///
/// Every variant maps onto an [`io::ErrorKind`], so callers that only care
/// about the I/O category can use [`TransportError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote endpoint is gone; nothing written now will be delivered.
    #[error("audio socket disconnected")]
    Disconnected,

    /// An I/O error from the underlying transport.
    #[error("audio socket I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Returns the I/O error kind for this failure.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Disconnected => io::ErrorKind::BrokenPipe,
            Self::Io(e) => e.kind(),
        }
    }
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => e,
            TransportError::Disconnected => {
                io::Error::new(io::ErrorKind::BrokenPipe, "audio socket disconnected")
            }
        }
    }
}
