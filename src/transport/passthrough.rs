//! Effect endpoint that returns its input unchanged.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::transport::{AudioSocket, AudioSocketCallback};
use crate::{AudioFormat, AudioFrames};

/// A DSP effect that sends every buffer and format straight back.
///
/// Attach it to the effect side of a socket pair to get a processing chain
/// that does nothing, for wiring up a graph before real effects exist or for
/// testing that the routing path preserves samples exactly.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dsp_router::{LocalAudioSocket, PassthroughEffect, SocketConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let (_router_end, effect_end) = LocalAudioSocket::pair("bypass", SocketConfig::default());
/// let effect = PassthroughEffect::attach(Arc::new(effect_end));
/// assert!(effect.is_connected());
/// # }
/// ```
pub struct PassthroughEffect {
    socket: Arc<dyn AudioSocket>,
}

impl PassthroughEffect {
    /// Installs the echo callback on `socket` and keeps the socket alive.
    pub fn attach(socket: Arc<dyn AudioSocket>) -> Self {
        let callback = Arc::new(EchoCallback {
            socket: Arc::downgrade(&socket),
            channels: AtomicU16::new(AudioFormat::DEFAULT.channels),
        });
        socket.set_callback(callback);
        Self { socket }
    }

    /// Returns `true` while the router side of the socket is still there.
    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }
}

/// Callback holding only a weak reference, so the socket can still be dropped.
struct EchoCallback {
    socket: Weak<dyn AudioSocket>,
    channels: AtomicU16,
}

#[async_trait]
impl AudioSocketCallback for EchoCallback {
    async fn on_audio_input(&self, frames: &[i16], num_frames: usize) {
        let Some(socket) = self.socket.upgrade() else {
            return;
        };
        let channels = self.channels.load(Ordering::Relaxed);
        let frames = AudioFrames::copy_from(frames, num_frames, channels);
        if let Err(e) = socket.write_audio_data(&frames) {
            tracing::debug!("PassthroughEffect {}: echo failed: {e}", socket.name());
        }
    }

    async fn on_format_input(&self, channels: u16, sample_rate: u32) {
        self.channels.store(channels, Ordering::Relaxed);
        let Some(socket) = self.socket.upgrade() else {
            return;
        };
        match AudioFormat::new(sample_rate, channels) {
            Ok(format) => {
                if let Err(e) = socket.write_format_data(format) {
                    tracing::debug!("PassthroughEffect {}: format echo failed: {e}", socket.name());
                }
            }
            Err(e) => tracing::warn!("PassthroughEffect {}: {e}", socket.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalAudioSocket, SocketConfig};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect {
        samples: Mutex<Vec<i16>>,
        formats: Mutex<Vec<(u16, u32)>>,
    }

    #[async_trait]
    impl AudioSocketCallback for Collect {
        async fn on_audio_input(&self, frames: &[i16], _num_frames: usize) {
            self.samples.lock().extend_from_slice(frames);
        }

        async fn on_format_input(&self, channels: u16, sample_rate: u32) {
            self.formats.lock().push((channels, sample_rate));
        }
    }

    #[tokio::test]
    async fn test_passthrough_echoes_audio_and_format() {
        let (router_end, effect_end) = LocalAudioSocket::pair("echo", SocketConfig::default());
        let _effect = PassthroughEffect::attach(Arc::new(effect_end));

        let collect = Arc::new(Collect::default());
        router_end.set_callback(collect.clone());

        router_end
            .write_format_data(AudioFormat::new(22050, 1).unwrap())
            .unwrap();
        router_end
            .write_audio_data(&AudioFrames::new(vec![10, 20, 30], 1))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while collect.samples.lock().len() < 3 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(*collect.samples.lock(), vec![10, 20, 30]);
        assert_eq!(collect.formats.lock()[0], (1, 22050));
    }
}
