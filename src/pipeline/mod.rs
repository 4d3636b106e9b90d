//! The routing core.
//!
//! Audio flows from the provider through every effect and on to the sink:
//!
//! ```text
//! provider socket ─▶ ProviderCallback ─▶ DspRouter::input_provider_audio
//!                                              │ (same buffer to each effect)
//!                                              ▼
//!                                        effect sockets ─▶ effects
//!                                                             │
//! sink ◀── DspRouter::input_dsp_audio ◀── DspCallback ◀───────┘
//! ```
//!
//! The router never waits on an effect: socket writes only enqueue. The
//! only awaits on the audio path are sink writes.

mod callback;
mod router;

pub use router::DspRouter;
