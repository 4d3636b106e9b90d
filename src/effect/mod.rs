//! Effect connections and their transport lifecycle.
//!
//! An [`EffectConnection`] stands for one external DSP effect process. Effects
//! don't announce when they are ready, so a connection starts without a
//! transport and the router asks the [`PlaybackHost`](crate::PlaybackHost) for
//! one the first time it has audio for that effect:
//!
//! ```text
//! Registered ──first provider audio──▶ TransportAssigned ──first write ok──▶ Active
//!      │                                      │                                │
//!      └──────────────────────────── tear_down() ──────────────────────────────┴──▶ TornDown
//! ```

mod effect_id;
mod registry;

pub use effect_id::EffectId;
pub use registry::{EffectList, EffectRegistry};

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::transport::AudioSocket;
use crate::TransportError;

/// Lifecycle state of an [`EffectConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    /// Known to the registry, no transport yet.
    Registered,
    /// A socket was assigned; nothing has been written to it yet.
    TransportAssigned,
    /// At least one buffer was written to the socket.
    Active,
    /// The effect went away. The connection is never used again.
    TornDown,
}

/// How [`EffectConnection::socket_or_assign`] found the socket.
pub(crate) enum SocketLookup {
    /// The connection already had a socket.
    Existing(Arc<dyn AudioSocket>),
    /// The socket was assigned by this call.
    Assigned(Arc<dyn AudioSocket>),
    /// The connection is torn down.
    TornDown,
}

struct ConnectionState {
    state: EffectState,
    socket: Option<Arc<dyn AudioSocket>>,
}

/// One external DSP effect and the socket that reaches it.
///
/// Connections are shared as `Arc<EffectConnection>` between the registry,
/// the playback host and the router. All methods take `&self`.
///
/// # Example
///
/// ```
/// use dsp_router::{EffectConnection, EffectState};
///
/// let eq = EffectConnection::new("eq", "Graphic Equalizer");
/// assert_eq!(eq.state(), EffectState::Registered);
/// assert!(eq.audio_socket().is_none());
///
/// eq.tear_down();
/// assert_eq!(eq.state(), EffectState::TornDown);
/// ```
pub struct EffectConnection {
    id: EffectId,
    name: String,
    inner: Mutex<ConnectionState>,
    // Serializes assignment without holding `inner` across the host call,
    // so the host may still inspect the connection while assigning.
    assign_lock: Mutex<()>,
}

impl EffectConnection {
    /// Creates a registered connection with no transport.
    pub fn new(id: impl Into<EffectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inner: Mutex::new(ConnectionState {
                state: EffectState::Registered,
                socket: None,
            }),
            assign_lock: Mutex::new(()),
        }
    }

    /// Returns the effect's identifier.
    pub fn id(&self) -> &EffectId {
        &self.id
    }

    /// Returns the effect's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> EffectState {
        self.inner.lock().state
    }

    /// Returns the socket, if one has been assigned and the effect is still up.
    pub fn audio_socket(&self) -> Option<Arc<dyn AudioSocket>> {
        self.inner.lock().socket.clone()
    }

    /// Attaches a socket ahead of first use.
    ///
    /// Has no effect if the connection already has a socket or is torn down;
    /// returns whether the socket was attached.
    pub fn attach_socket(&self, socket: Arc<dyn AudioSocket>) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != EffectState::Registered {
            return false;
        }
        inner.socket = Some(socket);
        inner.state = EffectState::TransportAssigned;
        true
    }

    /// Marks the effect as gone and releases its socket.
    ///
    /// Returns the released socket so the caller can close it.
    pub fn tear_down(&self) -> Option<Arc<dyn AudioSocket>> {
        let mut inner = self.inner.lock();
        inner.state = EffectState::TornDown;
        let socket = inner.socket.take();
        tracing::debug!("Effect {}: torn down", self.id);
        socket
    }

    /// Returns the socket, asking `assign` for one if there is none yet.
    ///
    /// Concurrent callers assign at most once: the loser of the race sees the
    /// winner's socket as [`SocketLookup::Existing`].
    pub(crate) fn socket_or_assign<F>(&self, assign: F) -> Result<SocketLookup, TransportError>
    where
        F: FnOnce(&Self) -> Result<Arc<dyn AudioSocket>, TransportError>,
    {
        if let Some(lookup) = self.current_socket() {
            return Ok(lookup);
        }

        let _guard = self.assign_lock.lock();
        if let Some(lookup) = self.current_socket() {
            return Ok(lookup);
        }

        let socket = assign(self)?;

        let mut inner = self.inner.lock();
        if inner.state == EffectState::TornDown {
            return Ok(SocketLookup::TornDown);
        }
        inner.socket = Some(Arc::clone(&socket));
        inner.state = EffectState::TransportAssigned;
        Ok(SocketLookup::Assigned(socket))
    }

    /// Records that a write to the socket succeeded.
    pub(crate) fn mark_active(&self) {
        let mut inner = self.inner.lock();
        if inner.state == EffectState::TransportAssigned {
            inner.state = EffectState::Active;
        }
    }

    fn current_socket(&self) -> Option<SocketLookup> {
        let inner = self.inner.lock();
        match (&inner.socket, inner.state) {
            (_, EffectState::TornDown) => Some(SocketLookup::TornDown),
            (Some(socket), _) => Some(SocketLookup::Existing(Arc::clone(socket))),
            (None, _) => None,
        }
    }
}

impl fmt::Debug for EffectConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectConnection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::transport::AudioSocketCallback;
    use crate::{AudioFormat, AudioFrames};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Socket that records every write attempt and can be told to fail.
    pub(crate) struct RecordingSocket {
        name: String,
        pub(crate) writes: Mutex<Vec<Vec<i16>>>,
        pub(crate) formats: Mutex<Vec<AudioFormat>>,
        fail: AtomicBool,
    }

    impl RecordingSocket {
        pub(crate) fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                writes: Mutex::new(Vec::new()),
                formats: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            })
        }

        pub(crate) fn failing(name: &str) -> Arc<Self> {
            let socket = Self::new(name);
            socket.fail.store(true, Ordering::SeqCst);
            socket
        }

        pub(crate) fn write_count(&self) -> usize {
            self.writes.lock().len()
        }
    }

    impl AudioSocket for RecordingSocket {
        fn name(&self) -> &str {
            &self.name
        }

        fn write_audio_data(&self, frames: &AudioFrames) -> Result<(), TransportError> {
            self.writes.lock().push(frames.samples().to_vec());
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected);
            }
            Ok(())
        }

        fn write_format_data(&self, format: AudioFormat) -> Result<(), TransportError> {
            self.formats.lock().push(format);
            if self.fail.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected);
            }
            Ok(())
        }

        fn set_callback(&self, _callback: Arc<dyn AudioSocketCallback>) {}

        fn is_connected(&self) -> bool {
            !self.fail.load(Ordering::SeqCst)
        }
    }
}
