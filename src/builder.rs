//! Builder pattern for `DspRouter`.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    event_callback, AudioFormat, DspRouter, EffectRegistry, EventCallback, PlaybackHost,
    RouterConfig, RouterEvent,
};

/// Builder for configuring a [`DspRouter`].
///
/// Use [`DspRouter::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use dsp_router::{
///     AudioFormat, AudioSocket, DspRouter, EffectConnection, EffectList, PlaybackHost,
///     TransportError,
/// };
///
/// # struct Host;
/// # impl PlaybackHost for Host {
/// #     fn assign_audio_socket(&self, _: &EffectConnection)
/// #         -> Result<Arc<dyn AudioSocket>, TransportError> {
/// #         Err(TransportError::Disconnected)
/// #     }
/// #     fn reset_shutdown_timeout(&self) {}
/// # }
/// let router = DspRouter::builder()
///     .default_format(AudioFormat::new(48000, 2).unwrap())
///     .rms_poll_interval(Duration::from_millis(16))
///     .on_event(|e| eprintln!("router event: {e:?}"))
///     .build(Arc::new(EffectList::new()), Arc::new(Host));
///
/// assert_eq!(router.format().sample_rate, 48000);
/// ```
#[must_use]
pub struct DspRouterBuilder {
    config: RouterConfig,
    event_callback: Option<EventCallback>,
}

impl Default for DspRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DspRouterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            event_callback: None,
        }
    }

    /// Set custom router configuration.
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the format the router starts with and falls back to.
    ///
    /// Default: [`AudioFormat::DEFAULT`] (44.1kHz stereo)
    pub fn default_format(mut self, format: AudioFormat) -> Self {
        self.config.default_format = format;
        self
    }

    /// Set the minimum time between two metering reads of the sink.
    pub fn rms_poll_interval(mut self, interval: Duration) -> Self {
        self.config.rms_poll_interval = interval;
        self
    }

    /// Send provider audio straight to the sink while no effect is registered.
    pub fn bypass_without_effects(mut self, bypass: bool) -> Self {
        self.config.bypass_without_effects = bypass;
        self
    }

    /// Set how close together output from two different effects must arrive
    /// to be reported as [`RouterEvent::ConcurrentEffectOutput`].
    ///
    /// Default: 100ms
    pub fn fan_in_window(mut self, window: Duration) -> Self {
        self.config.fan_in_window = window;
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include format changes, sink fallbacks and per-effect failures.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(RouterEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Builds the router around its two collaborators.
    ///
    /// `registry` lists the effects audio is sent through; `host` assigns
    /// effect sockets and receives the liveness signal.
    pub fn build(
        self,
        registry: Arc<dyn EffectRegistry>,
        host: Arc<dyn PlaybackHost>,
    ) -> Arc<DspRouter> {
        tracing::debug!(
            "DspRouterBuilder: building router, default format {}",
            self.config.default_format
        );
        Arc::new_cyclic(|self_ref| {
            DspRouter::new(
                self.config,
                registry,
                host,
                self.event_callback,
                self_ref.clone(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = DspRouterBuilder::new();
        assert_eq!(builder.config.default_format, AudioFormat::DEFAULT);
        assert!(builder.event_callback.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let builder = DspRouter::builder()
            .default_format(AudioFormat::new(48000, 1).unwrap())
            .rms_poll_interval(Duration::from_millis(16))
            .bypass_without_effects(true)
            .fan_in_window(Duration::from_millis(250))
            .on_event(|_| {});

        assert_eq!(
            builder.config.default_format,
            AudioFormat::new(48000, 1).unwrap()
        );
        assert_eq!(builder.config.rms_poll_interval, Duration::from_millis(16));
        assert!(builder.config.bypass_without_effects);
        assert_eq!(builder.config.fan_in_window, Duration::from_millis(250));
        assert!(builder.event_callback.is_some());
    }

    #[test]
    fn test_with_config_replaces_config() {
        let config = RouterConfig {
            fan_in_window: Duration::from_secs(1),
            ..Default::default()
        };
        let builder = DspRouter::builder()
            .bypass_without_effects(true)
            .with_config(config);

        assert!(!builder.config.bypass_without_effects);
        assert_eq!(builder.config.fan_in_window, Duration::from_secs(1));
    }
}
