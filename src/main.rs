use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use voice_capture::{
    ChannelSender, Config, ScriptedSource, VoiceCaptureController,
};

/// Voice capture controller demo
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config/voice-capture")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            info!("no config at {} ({}), using defaults", args.config, e);
            Config::default()
        }
    };

    info!("{} starting", cfg.service.name);

    let source = ScriptedSource::new();
    let (message_tx, mut message_rx) = mpsc::channel(8);
    let (notification_tx, mut notification_rx) = mpsc::channel(8);

    let controller = VoiceCaptureController::new(
        cfg.capture,
        Arc::new(source.clone()),
        Arc::new(ChannelSender::new(message_tx)),
        notification_tx,
    );

    // Simulated press-and-hold: start, deliver a few fragments, release.
    controller.start().await;
    for size in [100usize, 150, 120] {
        source.emit_fragment(vec![0u8; size]);
        tokio::time::sleep(Duration::from_millis(450)).await;
    }
    info!("status: {}", serde_json::to_string(&controller.status())?);
    controller.stop().await;

    tokio::select! {
        Some(message) = message_rx.recv() => {
            info!(
                fragments = message.fragments.len(),
                bytes = message.total_bytes(),
                format = %message.encoding_format,
                "voice message delivered"
            );
        }
        Some(notification) = notification_rx.recv() => {
            info!("notification: {} - {}", notification.title, notification.description);
        }
        else => {}
    }

    Ok(())
}
