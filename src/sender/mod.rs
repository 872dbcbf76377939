//! Outbound handoff of finished recordings

mod channel;
mod message;

pub use channel::ChannelSender;
pub use message::AudioMessage;

use anyhow::Result;

/// Collaborator that transmits a finished recording to the remote service
#[async_trait::async_trait]
pub trait AudioMessageSender: Send + Sync {
    /// Deliver one completed voice message; invoked at most once per session
    async fn send_audio_message(&self, message: AudioMessage) -> Result<()>;
}
