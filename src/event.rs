//! Runtime events for monitoring the routing graph.
//!
//! Events are non-fatal notifications. The router keeps running after any of
//! them is emitted - they're for logging/metrics, not error handling.

use std::sync::Arc;

use crate::effect::EffectId;
use crate::format::AudioFormat;

/// Runtime events emitted by the router.
///
/// Use the [`EventCallback`] to log these or update metrics.
///
/// # Example
///
/// ```
/// use dsp_router::RouterEvent;
///
/// fn handle_event(event: RouterEvent) {
///     match event {
///         RouterEvent::FormatChanged { previous, current } => {
///             eprintln!("format {previous} -> {current}");
///         }
///         RouterEvent::EffectWriteFailed { effect, error } => {
///             eprintln!("effect '{effect}' failed: {error}");
///         }
///         other => eprintln!("{other:?}"),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// The provider announced a new format.
    FormatChanged {
        /// Format before the change.
        previous: AudioFormat,
        /// Format now in effect.
        current: AudioFormat,
    },

    /// A new sink rejected the active format and was configured with the
    /// fallback format instead.
    SinkFormatFallback {
        /// Name of the sink.
        sink_name: String,
        /// Format the sink rejected.
        rejected: AudioFormat,
        /// Format the sink accepted.
        fallback: AudioFormat,
    },

    /// The active sink rejected a format change announced by the provider.
    ///
    /// The sink stays installed; it may play the provider's audio incorrectly
    /// until the provider switches back or another sink is installed.
    SinkFormatRejected {
        /// Name of the sink.
        sink_name: String,
        /// Format the sink rejected.
        format: AudioFormat,
    },

    /// The playback host assigned a transport to an effect on first use.
    TransportAssigned {
        /// The effect that now has a socket.
        effect: EffectId,
    },

    /// Writing provider audio to one effect failed.
    ///
    /// The remaining effects still received the audio.
    EffectWriteFailed {
        /// The effect that could not be written to.
        effect: EffectId,
        /// Description of the error.
        error: String,
    },

    /// The active sink failed to accept processed audio.
    SinkWriteFailed {
        /// Name of the sink.
        sink_name: String,
        /// Description of the error.
        error: String,
    },

    /// Two different effects produced output within the fan-in window.
    ///
    /// Both streams are written to the sink unmixed, which only sounds right
    /// when a single effect is active at a time.
    ConcurrentEffectOutput {
        /// Effect that produced output most recently before this one.
        previous: EffectId,
        /// Effect producing output now.
        current: EffectId,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`DspRouterBuilder::on_event()`].
///
/// [`DspRouterBuilder::on_event()`]: crate::DspRouterBuilder::on_event
pub type EventCallback = Arc<dyn Fn(RouterEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use dsp_router::{event_callback, RouterEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(RouterEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
