use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use super::message::AudioMessage;
use super::AudioMessageSender;

/// Sender that forwards finished recordings into an mpsc channel
///
/// The receiving side is whatever transport owns the webhook/service
/// connection; this crate only hands the payload over.
pub struct ChannelSender {
    tx: mpsc::Sender<AudioMessage>,
}

impl ChannelSender {
    pub fn new(tx: mpsc::Sender<AudioMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl AudioMessageSender for ChannelSender {
    async fn send_audio_message(&self, message: AudioMessage) -> Result<()> {
        info!(
            fragments = message.fragments.len(),
            bytes = message.total_bytes(),
            format = %message.encoding_format,
            "forwarding voice message"
        );

        self.tx
            .send(message)
            .await
            .context("Message channel closed")?;

        Ok(())
    }
}
