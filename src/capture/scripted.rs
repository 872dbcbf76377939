use anyhow::{bail, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::source::{CaptureEvent, CaptureOptions, CaptureSource, CaptureStream};

/// In-process capture source driven by external code
///
/// Used for batch driving and for exercising the controller without a real
/// capture device: callers script fragment delivery, flush contents, errors,
/// and acquisition behavior, and can audit acquire/release accounting.
#[derive(Clone)]
pub struct ScriptedSource {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    supported_formats: Vec<String>,
    deny_reason: Mutex<Option<String>>,
    acquire_delay: Mutex<Duration>,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    live: Mutex<Option<LiveStream>>,
    requested_interval: Mutex<Option<Duration>>,
}

#[derive(Debug)]
struct LiveStream {
    events: mpsc::Sender<CaptureEvent>,
    pending_flush: Option<Vec<u8>>,
    stopped: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::with_formats(&["audio/webm;codecs=opus", "audio/webm"])
    }

    /// Create a source that reports exactly these encoding formats as supported
    pub fn with_formats(formats: &[&str]) -> Self {
        Self {
            inner: Arc::new(Inner {
                supported_formats: formats.iter().map(|f| f.to_string()).collect(),
                deny_reason: Mutex::new(None),
                acquire_delay: Mutex::new(Duration::ZERO),
                acquires: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                live: Mutex::new(None),
                requested_interval: Mutex::new(None),
            }),
        }
    }

    /// Make subsequent `acquire` calls fail (permission denied / no device)
    pub fn deny_with(&self, reason: &str) {
        *self.inner.deny_reason.lock().unwrap() = Some(reason.to_string());
    }

    /// Delay `acquire` completion, widening the initialization window
    pub fn set_acquire_delay(&self, delay: Duration) {
        *self.inner.acquire_delay.lock().unwrap() = delay;
    }

    /// Deliver one fragment to the live stream; false if no stream is live
    pub fn emit_fragment(&self, data: Vec<u8>) -> bool {
        let live = self.inner.live.lock().unwrap();
        match live.as_ref() {
            Some(stream) if !stream.stopped => {
                stream.events.try_send(CaptureEvent::Fragment(data)).is_ok()
            }
            _ => false,
        }
    }

    /// Stage a fragment for delivery on the next `request_flush`
    pub fn buffer_fragment(&self, data: Vec<u8>) {
        if let Some(stream) = self.inner.live.lock().unwrap().as_mut() {
            stream.pending_flush = Some(data);
        }
    }

    /// Inject an asynchronous capture error into the live stream
    pub fn emit_error(&self, message: &str) -> bool {
        let live = self.inner.live.lock().unwrap();
        match live.as_ref() {
            Some(stream) => stream
                .events
                .try_send(CaptureEvent::Error(message.to_string()))
                .is_ok(),
            None => false,
        }
    }

    pub fn acquire_count(&self) -> usize {
        self.inner.acquires.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    pub fn has_live_stream(&self) -> bool {
        self.inner.live.lock().unwrap().is_some()
    }

    /// Fragment interval the controller asked for, if a stream was started
    pub fn requested_interval(&self) -> Option<Duration> {
        *self.inner.requested_interval.lock().unwrap()
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureSource for ScriptedSource {
    async fn acquire(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureStream>> {
        let delay = *self.inner.acquire_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = self.inner.deny_reason.lock().unwrap().clone() {
            bail!("{}", reason);
        }

        if self.inner.live.lock().unwrap().is_some() {
            bail!("capture device is busy");
        }

        debug!(
            sample_rate = options.sample_rate,
            echo_cancellation = options.echo_cancellation,
            noise_suppression = options.noise_suppression,
            "scripted stream acquired"
        );

        self.inner.acquires.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedStream {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn is_format_supported(&self, format: &str) -> bool {
        self.inner.supported_formats.iter().any(|f| f == format)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug)]
struct ScriptedStream {
    inner: Arc<Inner>,
}

#[async_trait::async_trait]
impl CaptureStream for ScriptedStream {
    async fn start(&mut self, fragment_interval: Duration) -> Result<mpsc::Receiver<CaptureEvent>> {
        let (tx, rx) = mpsc::channel(64);

        *self.inner.requested_interval.lock().unwrap() = Some(fragment_interval);
        *self.inner.live.lock().unwrap() = Some(LiveStream {
            events: tx,
            pending_flush: None,
            stopped: false,
        });

        Ok(rx)
    }

    async fn request_flush(&mut self) -> Result<()> {
        let mut live = self.inner.live.lock().unwrap();
        if let Some(stream) = live.as_mut() {
            if let Some(data) = stream.pending_flush.take() {
                let _ = stream.events.try_send(CaptureEvent::Fragment(data));
            }
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let mut live = self.inner.live.lock().unwrap();
        if let Some(stream) = live.as_mut() {
            if !stream.stopped {
                stream.stopped = true;
                let _ = stream.events.try_send(CaptureEvent::Stopped);
            }
        }
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.inner.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.live.lock().unwrap().take();
    }
}
