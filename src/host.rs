//! Capabilities the router needs from the surrounding playback service.

use std::sync::Arc;

use crate::effect::EffectConnection;
use crate::transport::AudioSocket;
use crate::TransportError;

/// The playback service that owns the router.
///
/// Injected at construction instead of looked up globally, so a test can hand
/// the router a fake host.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use parking_lot::Mutex;
/// use dsp_router::{
///     AudioSocket, EffectConnection, LocalAudioSocket, PassthroughEffect, PlaybackHost,
///     SocketConfig, TransportError,
/// };
///
/// #[derive(Default)]
/// struct InProcessHost {
///     effects: Mutex<Vec<PassthroughEffect>>,
///     resets: AtomicU64,
/// }
///
/// impl PlaybackHost for InProcessHost {
///     fn assign_audio_socket(
///         &self,
///         connection: &EffectConnection,
///     ) -> Result<Arc<dyn AudioSocket>, TransportError> {
///         let (router_end, effect_end) =
///             LocalAudioSocket::pair(connection.id().as_str(), SocketConfig::default());
///         // A real host would hand `effect_end` to the effect process.
///         self.effects
///             .lock()
///             .push(PassthroughEffect::attach(Arc::new(effect_end)));
///         Ok(Arc::new(router_end))
///     }
///
///     fn reset_shutdown_timeout(&self) {
///         self.resets.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait PlaybackHost: Send + Sync {
    /// Creates the transport to an effect the first time audio is sent to it.
    ///
    /// Called at most once per connection. The router stores the returned
    /// socket on the connection and installs its effect-facing callback on
    /// it, so the effect's output flows back into the router.
    fn assign_audio_socket(
        &self,
        connection: &EffectConnection,
    ) -> Result<Arc<dyn AudioSocket>, TransportError>;

    /// Live audio reached the sink; postpone any idle shutdown.
    fn reset_shutdown_timeout(&self);
}
