//! # dsp-router
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Routes live audio from a music provider through external DSP effects to a
//! single output sink.
//!
//! `dsp-router` sits in the middle of a playback graph: a provider decodes
//! audio, every registered effect receives an identical copy of it over its
//! own [`AudioSocket`], and whatever the effects send back is written to the
//! active [`AudioSink`]. The router also negotiates the audio format with the
//! sink and meters the sink's output.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dsp_router::{ChannelSink, DspRouter, EffectConnection, EffectList};
//! use tokio::sync::mpsc;
//!
//! let effects = Arc::new(EffectList::new());
//! effects.add(Arc::new(EffectConnection::new("bypass", "Pass-through")))?;
//!
//! let router = DspRouter::builder()
//!     .on_event(|e| tracing::warn!(?e, "router event"))
//!     .build(effects, host); // host: your PlaybackHost
//!
//! let (tx, mut rx) = mpsc::channel(100);
//! router.set_sink(Arc::new(ChannelSink::new(tx))).await?;
//!
//! // Wire the provider's socket to the router
//! provider_socket.set_callback(router.provider_callback());
//!
//! while let Some(frames) = rx.recv().await {
//!     println!("level: {}", router.get_rms());
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Transports**: every endpoint talks through an [`AudioSocket`]; writes
//!   only enqueue, and one delivery task per socket invokes its callback
//! - **Fan-out**: provider audio is copied once and shared by every effect
//! - **Convergence**: effect output goes straight to the sink, unmixed
//! - **Metering**: sinks keep a rolling window the router reduces to an RMS level
//!
//! Entry points take `&self` and are safe to call from the delivery tasks of
//! different sockets at the same time.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod effect;
mod error;
mod event;
pub mod format;
mod frames;
mod host;
pub mod meter;
mod pipeline;
mod sink;
mod stats;
mod transport;

pub use builder::DspRouterBuilder;
pub use config::{RouterConfig, SocketConfig};
pub use effect::{EffectConnection, EffectId, EffectList, EffectRegistry, EffectState};
pub use error::{RouterError, SinkError, TransportError};
pub use event::{event_callback, EventCallback, RouterEvent};
pub use format::AudioFormat;
pub use frames::AudioFrames;
pub use host::PlaybackHost;
pub use pipeline::DspRouter;
#[cfg(feature = "device")]
pub use sink::DeviceSink;
pub use sink::{AudioSink, ChannelSink, FileSink};
pub use stats::RouterStats;
pub use transport::{AudioSocket, AudioSocketCallback, LocalAudioSocket, PassthroughEffect};
