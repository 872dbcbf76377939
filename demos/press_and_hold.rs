// Simulates a press-and-hold voice recording against the scripted source,
// including a rapid double-tap that the state guard must absorb.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use voice_capture::{
    format_elapsed, ChannelSender, ControllerConfig, ScriptedSource, VoiceCaptureController,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let source = ScriptedSource::new();
    let (message_tx, mut message_rx) = mpsc::channel(8);
    let (notification_tx, mut notification_rx) = mpsc::channel(8);

    let controller = VoiceCaptureController::new(
        ControllerConfig::default(),
        Arc::new(source.clone()),
        Arc::new(ChannelSender::new(message_tx)),
        notification_tx,
    );

    // Double-tap: the second start is a no-op.
    controller.start().await;
    controller.start().await;
    info!(active = controller.is_active(), "press");

    for _ in 0..4 {
        source.emit_fragment(vec![0u8; 160]);
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    info!(elapsed = %format_elapsed(controller.elapsed_seconds()), "release");

    // Overlapping release gestures: touchend plus synthesized mouseup.
    controller.stop().await;
    controller.stop().await;

    tokio::select! {
        Some(message) = message_rx.recv() => {
            info!(
                fragments = message.fragments.len(),
                bytes = message.total_bytes(),
                format = %message.encoding_format,
                "sent voice message"
            );
        }
        Some(notification) = notification_rx.recv() => {
            info!("notification: {} - {}", notification.title, notification.description);
        }
        else => {}
    }

    Ok(())
}
