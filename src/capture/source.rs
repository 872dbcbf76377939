use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Enhancement options requested when acquiring the capture stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Enable echo cancellation on the acquired stream
    pub echo_cancellation: bool,
    /// Enable noise suppression on the acquired stream
    pub noise_suppression: bool,
    /// Requested sample rate in Hz
    pub sample_rate: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44100,
        }
    }
}

/// Event delivered by an active capture stream, in delivery order
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// One encoded audio fragment
    Fragment(Vec<u8>),
    /// The stream has stopped; no further fragments will follow
    Stopped,
    /// Asynchronous capture failure
    Error(String),
}

/// Capture capability source
///
/// Implementations:
/// - Platform: microphone via the host media layer
/// - Scripted: in-process source driven by test/batch code
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Acquire an exclusive capture stream with the given enhancement options
    ///
    /// Fails if permission is denied or no capture device is available.
    async fn acquire(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureStream>>;

    /// Probe whether an encoding format identifier is supported
    fn is_format_supported(&self, format: &str) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// A live capture stream bound to one recording session
///
/// The underlying device resource is released when the stream is dropped.
#[async_trait::async_trait]
pub trait CaptureStream: Send + Sync + std::fmt::Debug {
    /// Start capturing, delivering one fragment per `fragment_interval`
    ///
    /// Returns a channel receiver that will receive capture events.
    async fn start(&mut self, fragment_interval: Duration) -> Result<mpsc::Receiver<CaptureEvent>>;

    /// Request delivery of any buffered-but-undelivered fragment
    ///
    /// The flushed fragment is guaranteed to arrive before the Stopped event
    /// of a subsequent `stop`.
    async fn request_flush(&mut self) -> Result<()>;

    /// Stop capturing; a Stopped event is delivered once the stream winds down
    async fn stop(&mut self) -> Result<()>;
}
