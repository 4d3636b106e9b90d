//! In-process audio socket backed by tokio channels.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::transport::{AudioSocket, AudioSocketCallback};
use crate::{AudioFormat, AudioFrames, SocketConfig, TransportError};

type CallbackSlot = Option<Arc<dyn AudioSocketCallback>>;

/// Message travelling from one endpoint to the other.
enum SocketMessage {
    Audio(AudioFrames),
    Format(AudioFormat),
}

/// One endpoint of an in-process audio socket pair.
///
/// Each endpoint owns a bounded queue of incoming messages and a delivery
/// task that hands them, in order, to the endpoint's callback. Messages that
/// arrive before a callback is installed wait in the queue.
///
/// # Overflow
///
/// When the peer's queue is full, new audio is **dropped** as a whole buffer,
/// counted in [`dropped_chunks()`](Self::dropped_chunks), and the write still
/// succeeds. Format announcements are never dropped silently: a full queue
/// makes [`write_format_data`](AudioSocket::write_format_data) fail with
/// [`io::ErrorKind::WouldBlock`].
///
/// # Disconnection
///
/// Dropping or [`close()`](Self::close)-ing either endpoint disconnects both;
/// later writes from either side fail with [`TransportError::Disconnected`].
///
/// # Example
///
/// ```
/// use dsp_router::{AudioFrames, AudioSocket, LocalAudioSocket, SocketConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let (router_end, effect_end) = LocalAudioSocket::pair("eq", SocketConfig::default());
/// router_end.write_audio_data(&AudioFrames::new(vec![0; 512], 2)).unwrap();
///
/// drop(effect_end);
/// assert!(!router_end.is_connected());
/// # }
/// ```
pub struct LocalAudioSocket {
    name: String,
    outgoing: mpsc::Sender<SocketMessage>,
    callback: watch::Sender<CallbackSlot>,
    connected: Arc<AtomicBool>,
    dropped_chunks: AtomicU64,
    delivery: JoinHandle<()>,
}

impl LocalAudioSocket {
    /// Creates two connected endpoints.
    ///
    /// Audio written to one endpoint is delivered to the other endpoint's
    /// callback. Must be called from within a tokio runtime: each endpoint
    /// spawns its delivery task immediately.
    pub fn pair(name: impl Into<String>, config: SocketConfig) -> (Self, Self) {
        let name = name.into();
        let capacity = config.capacity.max(1);
        let connected = Arc::new(AtomicBool::new(true));

        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);

        tracing::debug!("LocalAudioSocket {name}: pair created, capacity={capacity}");

        // Each endpoint writes into the other's queue.
        let a = Self::endpoint(format!("{name}:a"), b_tx, a_rx, Arc::clone(&connected));
        let b = Self::endpoint(format!("{name}:b"), a_tx, b_rx, connected);
        (a, b)
    }

    fn endpoint(
        name: String,
        outgoing: mpsc::Sender<SocketMessage>,
        incoming: mpsc::Receiver<SocketMessage>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        let (callback, callback_rx) = watch::channel::<CallbackSlot>(None);
        let delivery = tokio::spawn(run_delivery(incoming, callback_rx));

        Self {
            name,
            outgoing,
            callback,
            connected,
            dropped_chunks: AtomicU64::new(0),
            delivery,
        }
    }

    /// Disconnects both endpoints.
    ///
    /// Messages already queued are still delivered.
    pub fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::debug!("LocalAudioSocket {}: closed", self.name);
        }
    }

    /// Returns how many audio buffers were dropped because the peer's queue was full.
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped_chunks.load(Ordering::Relaxed)
    }

    fn send(&self, message: SocketMessage) -> Result<(), mpsc::error::TrySendError<SocketMessage>> {
        if !self.is_connected() {
            return Err(mpsc::error::TrySendError::Closed(message));
        }
        self.outgoing.try_send(message)
    }
}

impl AudioSocket for LocalAudioSocket {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_audio_data(&self, frames: &AudioFrames) -> Result<(), TransportError> {
        match self.send(SocketMessage::Audio(frames.clone())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let total = self.dropped_chunks.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    "LocalAudioSocket {}: queue full, dropped {} frames (total dropped buffers: {})",
                    self.name,
                    frames.frame_count(),
                    total
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(TransportError::Disconnected)
            }
        }
    }

    fn write_format_data(&self, format: AudioFormat) -> Result<(), TransportError> {
        match self.send(SocketMessage::Format(format)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!("queue full, format {format} not sent"),
            ))),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(TransportError::Disconnected)
            }
        }
    }

    fn set_callback(&self, callback: Arc<dyn AudioSocketCallback>) {
        self.callback.send_replace(Some(callback));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for LocalAudioSocket {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        // The delivery task holds the receiving half of our queue; stopping it
        // makes any in-flight peer write fail instead of vanishing.
        self.delivery.abort();
    }
}

/// Delivers queued messages to the current callback until either side goes away.
async fn run_delivery(
    mut incoming: mpsc::Receiver<SocketMessage>,
    mut callback_rx: watch::Receiver<CallbackSlot>,
) {
    loop {
        let current = callback_rx.borrow_and_update().clone();
        let Some(callback) = current else {
            // Hold messages in the queue until someone listens.
            if callback_rx.changed().await.is_err() {
                break;
            }
            continue;
        };

        tokio::select! {
            biased;
            changed = callback_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            message = incoming.recv() => {
                let Some(message) = message else { break };
                match message {
                    SocketMessage::Audio(frames) => {
                        callback
                            .on_audio_input(frames.samples(), frames.frame_count())
                            .await;
                    }
                    SocketMessage::Format(format) => {
                        callback
                            .on_format_input(format.channels, format.sample_rate)
                            .await;
                    }
                }
            }
        }
    }
}
