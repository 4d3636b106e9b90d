//! Audio transport between the router and external audio endpoints.
//!
//! An [`AudioSocket`] is one end of a conduit to a single remote endpoint - a
//! music provider or a DSP effect. Audio and format announcements arriving
//! from the remote side are delivered to the socket's
//! [`AudioSocketCallback`]; audio written to the socket is queued for the
//! remote side and the write returns without waiting for it to be consumed.
//!
//! ```text
//! provider ──▶ socket ──▶ DspRouter ──▶ effect sockets ──▶ effects
//!                                                            │
//!            sink ◀── DspRouter ◀── effect sockets ◀─────────┘
//! ```
//!
//! The crate ships an in-process transport, [`LocalAudioSocket`], and a
//! [`PassthroughEffect`] that echoes audio back unchanged.

mod local;
mod passthrough;

pub use local::LocalAudioSocket;
pub use passthrough::PassthroughEffect;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{AudioFormat, AudioFrames, TransportError};

/// Receives what a remote endpoint sends through an [`AudioSocket`].
///
/// Each socket invokes its callback from a single delivery task, in arrival
/// order. Different sockets deliver concurrently with each other, so one
/// callback object shared by several sockets must tolerate concurrent calls.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use dsp_router::AudioSocketCallback;
///
/// struct PrintCallback;
///
/// #[async_trait]
/// impl AudioSocketCallback for PrintCallback {
///     async fn on_audio_input(&self, frames: &[i16], num_frames: usize) {
///         println!("{num_frames} frames ({} samples)", frames.len());
///     }
///
///     async fn on_format_input(&self, channels: u16, sample_rate: u32) {
///         println!("format: {sample_rate}Hz/{channels}ch");
///     }
/// }
/// ```
#[async_trait]
pub trait AudioSocketCallback: Send + Sync {
    /// A chunk of interleaved audio arrived.
    ///
    /// `frames` is only borrowed for the duration of the call.
    async fn on_audio_input(&self, frames: &[i16], num_frames: usize);

    /// The remote endpoint announced (or changed) its format.
    async fn on_format_input(&self, channels: u16, sample_rate: u32);
}

/// One end of a bidirectional audio conduit to a single remote endpoint.
///
/// # Implementation Notes
///
/// - Writes only enqueue; they must never wait for the remote side
/// - A buffer is delivered whole or not at all
/// - Overflow handling (drop or reject) is up to the implementation and must
///   be documented on it
/// - Once the remote side is gone, writes fail with
///   [`TransportError::Disconnected`]
pub trait AudioSocket: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Queues audio for delivery to the remote endpoint.
    fn write_audio_data(&self, frames: &AudioFrames) -> Result<(), TransportError>;

    /// Announces a format to the remote endpoint.
    fn write_format_data(&self, format: AudioFormat) -> Result<(), TransportError>;

    /// Installs the callback that receives audio and formats from the remote side.
    ///
    /// Replaces any previously installed callback.
    fn set_callback(&self, callback: Arc<dyn AudioSocketCallback>);

    /// Returns `false` once the remote endpoint can no longer be reached.
    fn is_connected(&self) -> bool;
}
