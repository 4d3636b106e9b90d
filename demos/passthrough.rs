//! Pass-through routing example.
//!
//! Plays a generated tone through a pass-through effect into a WAV file and
//! prints the output level while it runs.
//!
//! Run with: cargo run --example passthrough [output.wav]

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use dsp_router::meter::rms_to_dbfs;
use dsp_router::{
    AudioFormat, AudioFrames, AudioSocket, DspRouter, EffectConnection, EffectList, FileSink,
    LocalAudioSocket, PassthroughEffect, PlaybackHost, RouterEvent, SocketConfig,
    TransportError,
};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Frames per provider buffer (10ms at 48kHz).
const BUFFER_FRAMES: usize = 480;

/// Backs every effect with an in-process pass-through.
#[derive(Default)]
struct DemoHost {
    effects: Mutex<Vec<PassthroughEffect>>,
}

impl PlaybackHost for DemoHost {
    fn assign_audio_socket(
        &self,
        connection: &EffectConnection,
    ) -> Result<Arc<dyn AudioSocket>, TransportError> {
        println!("Connecting effect '{}'", connection.name());
        let (router_end, effect_end) =
            LocalAudioSocket::pair(connection.id().as_str(), SocketConfig::default());
        self.effects
            .lock()
            .push(PassthroughEffect::attach(Arc::new(effect_end)));
        Ok(Arc::new(router_end))
    }

    fn reset_shutdown_timeout(&self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "passthrough.wav".to_string());

    let effects = Arc::new(EffectList::new());
    effects.add(Arc::new(EffectConnection::new("bypass", "Pass-through")))?;

    let router = DspRouter::builder()
        .rms_poll_interval(Duration::from_millis(16))
        .on_event(|event| match event {
            RouterEvent::EffectWriteFailed { effect, error } => {
                eprintln!("Effect {effect} failed: {error}");
            }
            other => tracing::info!(?other, "router event"),
        })
        .build(effects, Arc::new(DemoHost::default()));

    let sink = Arc::new(FileSink::wav(&path));
    router.set_sink(sink.clone()).await?;

    // The provider talks to the router over its own socket.
    let (provider, router_link) = LocalAudioSocket::pair("provider", SocketConfig::default());
    router_link.set_callback(router.provider_callback());

    let format = AudioFormat::new(48000, 2)?;
    provider.write_format_data(format)?;

    println!("Playing a 440Hz tone into {path} for 2 seconds...");

    let mut phase = 0.0f32;
    let step = TAU * 440.0 / format.sample_rate as f32;
    for tick in 0..200 {
        let mut samples = Vec::with_capacity(format.samples_for_frames(BUFFER_FRAMES));
        for _ in 0..BUFFER_FRAMES {
            let value = (phase.sin() * 12_000.0) as i16;
            samples.extend_from_slice(&[value, value]);
            phase = (phase + step) % TAU;
        }
        provider.write_audio_data(&AudioFrames::new(samples, format.channels))?;

        tokio::time::sleep(Duration::from_millis(10)).await;
        if tick % 50 == 49 {
            let level = router.get_rms();
            println!("Level: {level} ({:.1} dBFS)", rms_to_dbfs(level));
        }
    }

    // Let the last buffers drain through the effect.
    tokio::time::sleep(Duration::from_millis(50)).await;
    sink.finish().await?;

    let stats = router.stats();
    println!(
        "\nDone! {} buffers in, {} written to {path}",
        stats.provider_chunks, stats.sink_writes
    );

    Ok(())
}
