//! The DSP router: provider audio in, effects in the middle, one sink out.

use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::effect::{EffectConnection, EffectId, EffectRegistry, SocketLookup};
use crate::meter::calculate_rms_level;
use crate::pipeline::callback::{DspCallback, ProviderCallback};
use crate::sink::AudioSink;
use crate::stats::{RouterStats, StatsCounters};
use crate::transport::{AudioSocket, AudioSocketCallback};
use crate::{
    AudioFormat, AudioFrames, DspRouterBuilder, EventCallback, PlaybackHost, RouterConfig,
    RouterError, RouterEvent, TransportError,
};

#[derive(Debug, Default)]
struct RmsCache {
    level: i32,
    polled_at: Option<Instant>,
}

/// Routes provider audio through every registered effect and on to the sink.
///
/// The router sits between three kinds of endpoints:
///
/// - **The provider** decodes music and feeds it in through
///   [`provider_callback()`](Self::provider_callback). Its format announcements
///   are authoritative and are passed on to the sink and the effects.
/// - **Effects** each receive an identical copy of every provider buffer over
///   their own [`AudioSocket`]. Sockets are assigned lazily by the
///   [`PlaybackHost`] the first time an effect has audio to receive.
/// - **The sink** plays whatever the effects send back through
///   [`dsp_callback()`](Self::dsp_callback).
///
/// Effect outputs are not mixed: every buffer an effect returns is written to
/// the sink as is, so only one effect should be producing audio at a time.
///
/// Every entry point takes `&self` and may be called concurrently from the
/// delivery tasks of different sockets.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dsp_router::{
///     AudioSocket, DspRouter, EffectConnection, EffectList, PlaybackHost, TransportError,
/// };
///
/// struct NoHost;
///
/// impl PlaybackHost for NoHost {
///     fn assign_audio_socket(
///         &self,
///         _connection: &EffectConnection,
///     ) -> Result<Arc<dyn AudioSocket>, TransportError> {
///         Err(TransportError::Disconnected)
///     }
///
///     fn reset_shutdown_timeout(&self) {}
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let router = DspRouter::builder().build(Arc::new(EffectList::new()), Arc::new(NoHost));
///
/// // No sink yet: the format is only recorded.
/// assert!(router.setup_sink(48000, 2).await);
/// assert_eq!(router.format().sample_rate, 48000);
/// assert_eq!(router.get_rms(), 0);
/// # }
/// ```
pub struct DspRouter {
    config: RouterConfig,
    registry: Arc<dyn EffectRegistry>,
    host: Arc<dyn PlaybackHost>,
    self_ref: Weak<DspRouter>,
    format: RwLock<AudioFormat>,
    sink: RwLock<Option<Arc<dyn AudioSink>>>,
    // Serializes sink swaps with format changes.
    config_lock: tokio::sync::Mutex<()>,
    rms: Mutex<RmsCache>,
    last_output: Mutex<Option<(EffectId, Instant)>>,
    event_callback: Option<EventCallback>,
    counters: StatsCounters,
}

impl DspRouter {
    /// Creates a builder for configuring a router.
    pub fn builder() -> DspRouterBuilder {
        DspRouterBuilder::new()
    }

    pub(crate) fn new(
        config: RouterConfig,
        registry: Arc<dyn EffectRegistry>,
        host: Arc<dyn PlaybackHost>,
        event_callback: Option<EventCallback>,
        self_ref: Weak<DspRouter>,
    ) -> Self {
        Self {
            format: RwLock::new(config.default_format),
            config,
            registry,
            host,
            self_ref,
            sink: RwLock::new(None),
            config_lock: tokio::sync::Mutex::new(()),
            rms: Mutex::new(RmsCache::default()),
            last_output: Mutex::new(None),
            event_callback,
            counters: StatsCounters::default(),
        }
    }

    /// Returns the router's configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Returns the authoritative audio format.
    pub fn format(&self) -> AudioFormat {
        *self.format.read()
    }

    /// Returns the name of the active sink, if one is installed.
    pub fn sink_name(&self) -> Option<String> {
        self.sink.read().as_ref().map(|sink| sink.name().to_string())
    }

    /// Returns a snapshot of the router's counters.
    pub fn stats(&self) -> RouterStats {
        self.counters.snapshot()
    }

    /// Callback to install on the provider's socket.
    ///
    /// Audio goes to [`input_provider_audio`](Self::input_provider_audio),
    /// format announcements to [`setup_sink`](Self::setup_sink).
    pub fn provider_callback(&self) -> Arc<dyn AudioSocketCallback> {
        Arc::new(ProviderCallback::new(self.self_ref.clone()))
    }

    /// Callback to install on an effect's socket.
    ///
    /// Audio goes to [`input_dsp_audio`](Self::input_dsp_audio); format
    /// announcements from effects are ignored. Sockets the router assigns
    /// itself get a [`dsp_callback_for`](Self::dsp_callback_for) callback
    /// automatically.
    pub fn dsp_callback(&self) -> Arc<dyn AudioSocketCallback> {
        Arc::new(DspCallback::new(self.self_ref.clone(), None))
    }

    /// Like [`dsp_callback`](Self::dsp_callback), but tags the output with
    /// the effect it came from.
    ///
    /// Tagged output from two different effects within
    /// [`RouterConfig::fan_in_window`] emits
    /// [`RouterEvent::ConcurrentEffectOutput`].
    pub fn dsp_callback_for(&self, effect: EffectId) -> Arc<dyn AudioSocketCallback> {
        Arc::new(DspCallback::new(self.self_ref.clone(), Some(effect)))
    }

    /// Installs `sink` as the active sink.
    ///
    /// The sink is set up with the current format. If it rejects it, the
    /// router switches to [`RouterConfig::default_format`] and tries again.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::SinkIncompatible`] if the sink rejects both
    /// formats. The previous sink and format are left in place.
    pub async fn set_sink(&self, sink: Arc<dyn AudioSink>) -> Result<(), RouterError> {
        let _guard = self.config_lock.lock().await;

        let requested = self.format();
        if sink.setup(requested).await {
            self.install_sink(sink, requested);
            return Ok(());
        }

        let fallback = self.config.default_format;
        if fallback != requested && sink.setup(fallback).await {
            tracing::warn!(
                "Router: sink '{}' rejected {requested}, falling back to {fallback}",
                sink.name()
            );
            self.emit_event(RouterEvent::SinkFormatFallback {
                sink_name: sink.name().to_string(),
                rejected: requested,
                fallback,
            });
            self.apply_format(fallback);
            self.install_sink(sink, fallback);
            return Ok(());
        }

        tracing::warn!(
            "Router: sink '{}' supports neither {requested} nor {fallback}, not installed",
            sink.name()
        );
        Err(RouterError::SinkIncompatible {
            sink_name: sink.name().to_string(),
            requested,
            fallback,
        })
    }

    /// Records a new authoritative format and reconfigures the active sink.
    ///
    /// Effects that already have a socket are told about the change. Returns
    /// the sink's answer, or `true` when no sink is installed yet. A zero
    /// sample rate or channel count is rejected with `false` and changes
    /// nothing.
    pub async fn setup_sink(&self, sample_rate: u32, channels: u16) -> bool {
        let format = match AudioFormat::new(sample_rate, channels) {
            Ok(format) => format,
            Err(e) => {
                tracing::warn!("Router: ignoring format announcement: {e}");
                return false;
            }
        };

        let _guard = self.config_lock.lock().await;
        self.apply_format(format);

        let sink = self.sink.read().clone();
        let Some(sink) = sink else {
            return true;
        };

        let accepted = sink.setup(format).await;
        if !accepted {
            tracing::warn!("Router: sink '{}' rejected {format}", sink.name());
            self.emit_event(RouterEvent::SinkFormatRejected {
                sink_name: sink.name().to_string(),
                format,
            });
        }
        accepted
    }

    /// Sends provider audio to every registered effect.
    ///
    /// `frames` holds `num_frames` interleaved frames in the current format.
    /// Each effect gets the same buffer; a failure on one effect is reported
    /// and the others are still served.
    pub async fn input_provider_audio(&self, frames: &[i16], num_frames: usize) {
        let buffer = AudioFrames::copy_from(frames, num_frames, self.format().channels);
        if buffer.is_empty() {
            return;
        }
        StatsCounters::bump(&self.counters.provider_chunks);

        let connections = self.registry.effect_connections();
        if connections.is_empty() {
            if self.config.bypass_without_effects {
                self.write_to_sink(&buffer).await;
            } else {
                StatsCounters::bump(&self.counters.dropped_without_effects);
                tracing::trace!(
                    "Router: no effects registered, dropped {} frames",
                    buffer.frame_count()
                );
            }
            return;
        }

        for connection in &connections {
            self.forward_to_effect(connection, &buffer);
        }
    }

    /// Plays audio an effect sent back.
    ///
    /// Writes it to the active sink and, once the sink has accepted it, tells
    /// the host that live audio is flowing. Without a sink the audio is
    /// discarded.
    pub async fn input_dsp_audio(&self, frames: &[i16], num_frames: usize) {
        let buffer = AudioFrames::copy_from(frames, num_frames, self.format().channels);
        if buffer.is_empty() {
            return;
        }
        self.write_to_sink(&buffer).await;
    }

    /// Returns the sink's current loudness as an RMS sample value.
    ///
    /// Reads the sink's metering window at most once per
    /// [`RouterConfig::rms_poll_interval`] and returns the cached level
    /// otherwise. Without a sink, or while the sink's window is still empty,
    /// the last computed level is returned (0 before the first one).
    pub fn get_rms(&self) -> i32 {
        let sink = self.sink.read().clone();
        let Some(sink) = sink else {
            return self.rms.lock().level;
        };

        {
            let cache = self.rms.lock();
            let due = cache
                .polled_at
                .map_or(true, |at| at.elapsed() >= self.config.rms_poll_interval);
            if !due {
                return cache.level;
            }
        }

        let window = sink.rms_samples();
        let mut cache = self.rms.lock();
        cache.polled_at = Some(Instant::now());
        if !window.is_empty() {
            cache.level = calculate_rms_level(&window);
        }
        cache.level
    }

    /// Entry point for effect output, tagged with its effect when known.
    pub(crate) async fn accept_effect_output(
        &self,
        effect: Option<&EffectId>,
        frames: &[i16],
        num_frames: usize,
    ) {
        if let Some(effect) = effect {
            self.note_effect_output(effect);
        }
        self.input_dsp_audio(frames, num_frames).await;
    }

    fn install_sink(&self, sink: Arc<dyn AudioSink>, format: AudioFormat) {
        tracing::debug!("Router: sink '{}' installed at {format}", sink.name());
        *self.sink.write() = Some(sink);
    }

    /// Makes `format` authoritative and passes it on to connected effects.
    fn apply_format(&self, format: AudioFormat) {
        let previous = std::mem::replace(&mut *self.format.write(), format);
        if previous == format {
            return;
        }

        tracing::debug!("Router: format changed {previous} -> {format}");
        self.emit_event(RouterEvent::FormatChanged {
            previous,
            current: format,
        });

        for connection in self.registry.effect_connections() {
            if let Some(socket) = connection.audio_socket() {
                if let Err(e) = socket.write_format_data(format) {
                    self.effect_failed(&connection, &e);
                }
            }
        }
    }

    fn forward_to_effect(&self, connection: &EffectConnection, buffer: &AudioFrames) {
        let lookup =
            connection.socket_or_assign(|conn| self.host.assign_audio_socket(conn));

        let socket = match lookup {
            Ok(SocketLookup::Existing(socket)) => socket,
            Ok(SocketLookup::Assigned(socket)) => {
                self.wire_assigned_socket(connection, &socket);
                socket
            }
            Ok(SocketLookup::TornDown) => return,
            Err(e) => {
                self.effect_failed(connection, &e);
                return;
            }
        };

        match socket.write_audio_data(buffer) {
            Ok(()) => {
                connection.mark_active();
                StatsCounters::bump(&self.counters.effect_writes);
            }
            Err(e) => self.effect_failed(connection, &e),
        }
    }

    /// Hooks a freshly assigned socket up to the router.
    fn wire_assigned_socket(&self, connection: &EffectConnection, socket: &Arc<dyn AudioSocket>) {
        tracing::debug!(
            "Router: assigned socket '{}' to effect {}",
            socket.name(),
            connection.id()
        );
        socket.set_callback(self.dsp_callback_for(connection.id().clone()));

        if let Err(e) = socket.write_format_data(self.format()) {
            self.effect_failed(connection, &e);
        }
        self.emit_event(RouterEvent::TransportAssigned {
            effect: connection.id().clone(),
        });
    }

    fn effect_failed(&self, connection: &EffectConnection, error: &TransportError) {
        StatsCounters::bump(&self.counters.effect_write_failures);
        tracing::warn!("Router: effect {} failed: {error}", connection.id());
        self.emit_event(RouterEvent::EffectWriteFailed {
            effect: connection.id().clone(),
            error: error.to_string(),
        });
    }

    async fn write_to_sink(&self, buffer: &AudioFrames) {
        let sink = self.sink.read().clone();
        let Some(sink) = sink else {
            StatsCounters::bump(&self.counters.dropped_without_sink);
            return;
        };

        match sink.write(buffer).await {
            Ok(()) => {
                StatsCounters::bump(&self.counters.sink_writes);
                tracing::trace!(
                    "Router: wrote {} frames to '{}'",
                    buffer.frame_count(),
                    sink.name()
                );
                self.host.reset_shutdown_timeout();
            }
            Err(e) => {
                StatsCounters::bump(&self.counters.sink_write_failures);
                tracing::warn!("Router: sink '{}' write failed: {e}", sink.name());
                self.emit_event(RouterEvent::SinkWriteFailed {
                    sink_name: sink.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn note_effect_output(&self, effect: &EffectId) {
        let now = Instant::now();
        let previous = {
            let mut last = self.last_output.lock();
            let overlapping = last.as_ref().and_then(|(prev, at)| {
                (prev != effect && now.duration_since(*at) < self.config.fan_in_window)
                    .then(|| prev.clone())
            });
            *last = Some((effect.clone(), now));
            overlapping
        };

        if let Some(previous) = previous {
            tracing::warn!(
                "Router: effects {previous} and {effect} are both producing output; streams are not mixed"
            );
            self.emit_event(RouterEvent::ConcurrentEffectOutput {
                previous,
                current: effect.clone(),
            });
        }
    }

    fn emit_event(&self, event: RouterEvent) {
        if let Some(callback) = &self.event_callback {
            callback(event);
        }
    }
}

impl std::fmt::Debug for DspRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DspRouter")
            .field("format", &self.format())
            .field("sink", &self.sink_name())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeHost;
    use super::*;
    use crate::effect::EffectList;
    use crate::sink::test_support::TestSink;
    use crate::EffectState;
    use std::time::Duration;

    struct Fixture {
        router: Arc<DspRouter>,
        effects: Arc<EffectList>,
        host: Arc<FakeHost>,
        events: Arc<Mutex<Vec<RouterEvent>>>,
    }

    fn fixture_with(builder: DspRouterBuilder) -> Fixture {
        let effects = Arc::new(EffectList::new());
        let host = Arc::new(FakeHost::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let router = builder
            .on_event(move |event| sink_events.lock().push(event))
            .build(effects.clone(), host.clone());
        Fixture {
            router,
            effects,
            host,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(DspRouter::builder())
    }

    fn add_effect(fixture: &Fixture, id: &str) -> Arc<EffectConnection> {
        let conn = Arc::new(EffectConnection::new(id, id.to_uppercase()));
        fixture.effects.add(conn.clone()).unwrap();
        conn
    }

    fn fmt(sample_rate: u32, channels: u16) -> AudioFormat {
        AudioFormat::new(sample_rate, channels).unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let f = fixture();
        assert_eq!(f.router.format(), AudioFormat::DEFAULT);
        assert_eq!(f.router.sink_name(), None);
        assert_eq!(f.router.get_rms(), 0);
        assert_eq!(f.router.stats(), RouterStats::default());
    }

    #[tokio::test]
    async fn test_set_sink_keeps_cached_rms() {
        let f = fixture();
        let loud = Arc::new(TestSink::new("loud").with_rms_window(vec![1000, -1000]));
        f.router.set_sink(loud).await.unwrap();
        let before = f.router.get_rms();
        assert_eq!(before, 1000);

        // A fresh sink with nothing written must not reset the level.
        f.router
            .set_sink(Arc::new(TestSink::new("quiet")))
            .await
            .unwrap();
        assert_eq!(f.router.get_rms(), before);
    }

    #[tokio::test]
    async fn test_set_sink_without_prior_sink_keeps_zero() {
        let f = fixture();
        assert_eq!(f.router.get_rms(), 0);
        f.router
            .set_sink(Arc::new(TestSink::accepting("s", &[fmt(48000, 2)])))
            .await
            .unwrap_err();
        f.router.set_sink(Arc::new(TestSink::new("s"))).await.unwrap();
        assert_eq!(f.router.get_rms(), 0);
    }

    #[tokio::test]
    async fn test_set_sink_uses_current_format() {
        let f = fixture();
        assert!(f.router.setup_sink(48000, 1).await);

        let sink = Arc::new(TestSink::new("speaker"));
        f.router.set_sink(sink.clone()).await.unwrap();

        assert_eq!(sink.last_setup(), Some(fmt(48000, 1)));
        assert_eq!(f.router.format(), fmt(48000, 1));
        assert_eq!(f.router.sink_name().as_deref(), Some("speaker"));
    }

    #[tokio::test]
    async fn test_set_sink_falls_back_to_default() {
        let f = fixture();
        assert!(f.router.setup_sink(96000, 6).await);

        let sink = Arc::new(TestSink::accepting("stereo", &[AudioFormat::DEFAULT]));
        f.router.set_sink(sink.clone()).await.unwrap();

        assert_eq!(f.router.format(), AudioFormat::DEFAULT);
        assert_eq!(sink.last_setup(), Some(AudioFormat::DEFAULT));
        assert!(f.events.lock().iter().any(|e| matches!(
            e,
            RouterEvent::SinkFormatFallback { rejected, fallback, .. }
                if *rejected == fmt(96000, 6) && *fallback == AudioFormat::DEFAULT
        )));
    }

    #[tokio::test]
    async fn test_set_sink_double_rejection() {
        let f = fixture();
        assert!(f.router.setup_sink(96000, 6).await);

        let result = f.router.set_sink(Arc::new(TestSink::rejecting("bad"))).await;
        match result {
            Err(RouterError::SinkIncompatible {
                sink_name,
                requested,
                fallback,
            }) => {
                assert_eq!(sink_name, "bad");
                assert_eq!(requested, fmt(96000, 6));
                assert_eq!(fallback, AudioFormat::DEFAULT);
            }
            other => panic!("expected SinkIncompatible, got {other:?}"),
        }

        assert_eq!(f.router.sink_name(), None);
        assert_eq!(f.router.format(), fmt(96000, 6));

        // Safe no-op without a sink.
        f.router.input_dsp_audio(&[1, 2, 3, 4], 2).await;
        assert_eq!(f.host.resets(), 0);
        assert_eq!(f.router.stats().dropped_without_sink, 1);
    }

    #[tokio::test]
    async fn test_set_sink_double_rejection_keeps_previous_sink() {
        let f = fixture();
        let good = Arc::new(TestSink::new("good"));
        f.router.set_sink(good.clone()).await.unwrap();

        assert!(f
            .router
            .set_sink(Arc::new(TestSink::rejecting("bad")))
            .await
            .is_err());
        assert_eq!(f.router.sink_name().as_deref(), Some("good"));

        f.router.input_dsp_audio(&[1, 2], 1).await;
        assert_eq!(good.writes(), 1);
    }

    #[tokio::test]
    async fn test_setup_sink_without_sink_records_format() {
        let f = fixture();
        assert!(f.router.setup_sink(22050, 1).await);
        assert_eq!(f.router.format(), fmt(22050, 1));
        assert!(matches!(
            f.events.lock().as_slice(),
            [RouterEvent::FormatChanged { previous, current }]
                if *previous == AudioFormat::DEFAULT && *current == fmt(22050, 1)
        ));
    }

    #[tokio::test]
    async fn test_setup_sink_reports_sink_answer() {
        let f = fixture();
        let sink = Arc::new(TestSink::accepting(
            "picky",
            &[AudioFormat::DEFAULT, fmt(48000, 2)],
        ));
        f.router.set_sink(sink.clone()).await.unwrap();

        assert!(f.router.setup_sink(48000, 2).await);
        assert_eq!(sink.last_setup(), Some(fmt(48000, 2)));

        assert!(!f.router.setup_sink(8000, 1).await);
        // The provider stays authoritative and the sink stays installed.
        assert_eq!(f.router.format(), fmt(8000, 1));
        assert_eq!(f.router.sink_name().as_deref(), Some("picky"));
        assert!(f
            .events
            .lock()
            .iter()
            .any(|e| matches!(e, RouterEvent::SinkFormatRejected { .. })));
    }

    #[tokio::test]
    async fn test_setup_sink_rejects_zero_values() {
        let f = fixture();
        assert!(!f.router.setup_sink(0, 2).await);
        assert!(!f.router.setup_sink(44100, 0).await);
        assert_eq!(f.router.format(), AudioFormat::DEFAULT);
        assert!(f.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_setup_sink_forwards_format_to_effects() {
        let f = fixture();
        add_effect(&f, "eq");
        f.router.input_provider_audio(&[0; 4], 2).await;

        assert!(f.router.setup_sink(48000, 2).await);

        let socket = f.host.socket_for("eq").unwrap();
        assert_eq!(
            *socket.formats.lock(),
            vec![AudioFormat::DEFAULT, fmt(48000, 2)]
        );
    }

    #[tokio::test]
    async fn test_fan_out_identical_to_every_effect() {
        let f = fixture();
        for id in ["eq", "comp", "reverb"] {
            add_effect(&f, id);
        }
        f.host.fail_writes_for("comp");

        let samples = [10, -10, 20, -20, 30, -30];
        f.router.input_provider_audio(&samples, 3).await;

        // The failing effect is still handed the same buffer.
        for id in ["eq", "comp", "reverb"] {
            let socket = f.host.socket_for(id).unwrap();
            assert_eq!(*socket.writes.lock(), vec![samples.to_vec()]);
        }
        assert_eq!(
            *f.host.socket_for("comp").unwrap().formats.lock(),
            vec![AudioFormat::DEFAULT]
        );

        let stats = f.router.stats();
        assert_eq!(stats.provider_chunks, 1);
        assert_eq!(stats.effect_writes, 2);
        // Format announcement and audio write both failed.
        assert_eq!(stats.effect_write_failures, 2);
    }

    #[tokio::test]
    async fn test_fan_out_continues_after_assignment_failure() {
        let f = fixture();
        add_effect(&f, "broken");
        let eq = add_effect(&f, "eq");
        f.host.refuse_assignment_for("broken");

        f.router.input_provider_audio(&[1, 2], 1).await;

        assert_eq!(f.host.socket_for("eq").unwrap().write_count(), 1);
        assert_eq!(eq.state(), EffectState::Active);
        assert!(f.events.lock().iter().any(|e| matches!(
            e,
            RouterEvent::EffectWriteFailed { effect, .. } if effect.as_str() == "broken"
        )));
    }

    #[tokio::test]
    async fn test_sockets_assigned_once() {
        let f = fixture();
        let eq = add_effect(&f, "eq");

        for _ in 0..5 {
            f.router.input_provider_audio(&[1, 2], 1).await;
        }

        assert_eq!(f.host.socket_for("eq").unwrap().write_count(), 5);
        assert_eq!(
            f.host
                .assignments
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert_eq!(eq.state(), EffectState::Active);
        let assigned = f
            .events
            .lock()
            .iter()
            .filter(|e| matches!(e, RouterEvent::TransportAssigned { .. }))
            .count();
        assert_eq!(assigned, 1);
    }

    #[tokio::test]
    async fn test_torn_down_effects_are_skipped() {
        let f = fixture();
        let eq = add_effect(&f, "eq");
        eq.tear_down();

        f.router.input_provider_audio(&[1, 2], 1).await;

        assert!(f.host.socket_for("eq").is_none());
        assert_eq!(f.router.stats().effect_writes, 0);
    }

    #[tokio::test]
    async fn test_provider_audio_dropped_without_effects() {
        let f = fixture();
        let sink = Arc::new(TestSink::new("speaker"));
        f.router.set_sink(sink.clone()).await.unwrap();

        f.router.input_provider_audio(&[1, 2], 1).await;

        assert_eq!(sink.writes(), 0);
        assert_eq!(f.router.stats().dropped_without_effects, 1);
    }

    #[tokio::test]
    async fn test_bypass_without_effects() {
        let f = fixture_with(DspRouter::builder().bypass_without_effects(true));
        let sink = Arc::new(TestSink::new("speaker"));
        f.router.set_sink(sink.clone()).await.unwrap();

        f.router.input_provider_audio(&[1, 2, 3, 4], 2).await;

        assert_eq!(*sink.written.lock(), vec![1, 2, 3, 4]);
        assert_eq!(f.host.resets(), 1);
    }

    #[tokio::test]
    async fn test_dsp_audio_writes_once_and_resets_once() {
        let f = fixture();
        let sink = Arc::new(TestSink::new("speaker"));
        f.router.set_sink(sink.clone()).await.unwrap();

        f.router.input_dsp_audio(&[5, 6, 7, 8, 9, 10], 3).await;

        assert_eq!(sink.writes(), 1);
        assert_eq!(*sink.written.lock(), vec![5, 6, 7, 8, 9, 10]);
        assert_eq!(f.host.resets(), 1);
    }

    #[tokio::test]
    async fn test_dsp_audio_honours_num_frames() {
        let f = fixture();
        let sink = Arc::new(TestSink::new("speaker"));
        f.router.set_sink(sink.clone()).await.unwrap();

        // Only the first two stereo frames count.
        f.router.input_dsp_audio(&[1, 2, 3, 4, 5, 6], 2).await;
        assert_eq!(*sink.written.lock(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_get_rms_reference_values() {
        let f = fixture();
        let constant = Arc::new(TestSink::new("dc").with_rms_window(vec![1234; 100]));
        f.router.set_sink(constant).await.unwrap();
        assert_eq!(f.router.get_rms(), 0);

        let square: Vec<i16> = (0..100).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect();
        f.router
            .set_sink(Arc::new(TestSink::new("square").with_rms_window(square)))
            .await
            .unwrap();
        assert_eq!(f.router.get_rms(), 8000);
        assert_eq!(f.router.get_rms(), 8000);
    }

    #[tokio::test]
    async fn test_get_rms_poll_interval_caches() {
        let f = fixture_with(DspRouter::builder().rms_poll_interval(Duration::from_secs(60)));
        f.router
            .set_sink(Arc::new(TestSink::new("a").with_rms_window(vec![100, -100])))
            .await
            .unwrap();
        assert_eq!(f.router.get_rms(), 100);

        f.router
            .set_sink(Arc::new(TestSink::new("b").with_rms_window(vec![900, -900])))
            .await
            .unwrap();
        // Still within the poll interval.
        assert_eq!(f.router.get_rms(), 100);
    }

    #[tokio::test]
    async fn test_tagged_output_detects_concurrent_effects() {
        let f = fixture();
        f.router.set_sink(Arc::new(TestSink::new("s"))).await.unwrap();

        let eq = f.router.dsp_callback_for(EffectId::new("eq"));
        let reverb = f.router.dsp_callback_for(EffectId::new("reverb"));

        eq.on_audio_input(&[1, 2], 1).await;
        eq.on_audio_input(&[1, 2], 1).await;
        assert!(!f
            .events
            .lock()
            .iter()
            .any(|e| matches!(e, RouterEvent::ConcurrentEffectOutput { .. })));

        reverb.on_audio_input(&[3, 4], 1).await;
        assert!(f.events.lock().iter().any(|e| matches!(
            e,
            RouterEvent::ConcurrentEffectOutput { previous, current }
                if previous.as_str() == "eq" && current.as_str() == "reverb"
        )));
    }

    #[tokio::test]
    async fn test_provider_callback_drives_router() {
        let f = fixture();
        let sink = Arc::new(TestSink::new("s"));
        f.router.set_sink(sink.clone()).await.unwrap();
        add_effect(&f, "eq");

        let provider = f.router.provider_callback();
        provider.on_format_input(1, 48000).await;
        assert_eq!(f.router.format(), fmt(48000, 1));
        assert_eq!(sink.last_setup(), Some(fmt(48000, 1)));

        provider.on_audio_input(&[7, 8, 9], 3).await;
        assert_eq!(
            *f.host.socket_for("eq").unwrap().writes.lock(),
            vec![vec![7, 8, 9]]
        );
    }

    #[tokio::test]
    async fn test_callbacks_outliving_router_are_inert() {
        let f = fixture();
        let provider = f.router.provider_callback();
        let dsp = f.router.dsp_callback();
        drop(f);

        provider.on_audio_input(&[1, 2], 1).await;
        provider.on_format_input(2, 48000).await;
        dsp.on_audio_input(&[1, 2], 1).await;
    }
}
