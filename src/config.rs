//! Configuration types for the router and its transports.

use std::time::Duration;

use crate::format::AudioFormat;

/// Configuration for router behavior.
///
/// Use [`RouterConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use dsp_router::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig {
///     rms_poll_interval: Duration::from_millis(16),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Format the router falls back to when a new sink rejects the active one.
    ///
    /// Default: [`AudioFormat::DEFAULT`] (44.1kHz stereo)
    pub default_format: AudioFormat,

    /// Minimum time between two metering reads of the sink.
    ///
    /// `get_rms` calls that arrive sooner return the cached level.
    /// Default: zero (read the sink on every call)
    pub rms_poll_interval: Duration,

    /// Send provider audio straight to the sink when no effect is registered.
    ///
    /// When `false`, provider audio is dropped until at least one effect
    /// (for example a [`PassthroughEffect`](crate::PassthroughEffect)) exists.
    /// Default: `false`
    pub bypass_without_effects: bool,

    /// Window in which output from two different effects counts as concurrent.
    ///
    /// Only tagged effect callbacks (see
    /// [`DspRouter::dsp_callback_for`](crate::DspRouter::dsp_callback_for))
    /// are tracked.
    /// Default: 100ms
    pub fan_in_window: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_format: AudioFormat::DEFAULT,
            rms_poll_interval: Duration::ZERO,
            bypass_without_effects: false,
            fan_in_window: Duration::from_millis(100),
        }
    }
}

/// Configuration for an in-process [`LocalAudioSocket`](crate::LocalAudioSocket).
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Number of messages (audio buffers or format announcements) each
    /// endpoint queues before new audio is dropped.
    ///
    /// Default: 64
    pub capacity: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}
