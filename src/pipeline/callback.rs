//! Socket callbacks that feed the router.
//!
//! Both hold a weak reference: sockets keep their callbacks alive, and the
//! router must still be droppable while sockets exist.

use std::sync::Weak;

use async_trait::async_trait;

use crate::effect::EffectId;
use crate::pipeline::DspRouter;
use crate::transport::AudioSocketCallback;

/// Wired to the provider's socket.
pub(crate) struct ProviderCallback {
    router: Weak<DspRouter>,
}

impl ProviderCallback {
    pub(crate) fn new(router: Weak<DspRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl AudioSocketCallback for ProviderCallback {
    async fn on_audio_input(&self, frames: &[i16], num_frames: usize) {
        if let Some(router) = self.router.upgrade() {
            router.input_provider_audio(frames, num_frames).await;
        }
    }

    async fn on_format_input(&self, channels: u16, sample_rate: u32) {
        if let Some(router) = self.router.upgrade() {
            router.setup_sink(sample_rate, channels).await;
        }
    }
}

/// Wired to an effect's socket, optionally knowing which effect it serves.
pub(crate) struct DspCallback {
    router: Weak<DspRouter>,
    effect: Option<EffectId>,
}

impl DspCallback {
    pub(crate) fn new(router: Weak<DspRouter>, effect: Option<EffectId>) -> Self {
        Self { router, effect }
    }
}

#[async_trait]
impl AudioSocketCallback for DspCallback {
    async fn on_audio_input(&self, frames: &[i16], num_frames: usize) {
        if let Some(router) = self.router.upgrade() {
            router
                .accept_effect_output(self.effect.as_ref(), frames, num_frames)
                .await;
        }
    }

    async fn on_format_input(&self, channels: u16, sample_rate: u32) {
        // Effects follow the provider's format; nothing to do.
        tracing::trace!(
            "Router: ignoring format {sample_rate}Hz/{channels}ch from effect {:?}",
            self.effect
        );
    }
}
