use anyhow::Error;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::ControllerConfig;
use super::state::{CaptureState, StateCell};
use super::status::CaptureStatus;
use crate::capture::{CaptureEvent, CaptureSource, CaptureStream};
use crate::notify::Notification;
use crate::sender::{AudioMessage, AudioMessageSender};

/// Manages exactly one voice-recording session at a time
///
/// `start` and `stop` are safe against overlapping invocations from
/// independent UI event sources (touch plus synthesized mouse events): every
/// guard is a compare-and-swap on the session state, so duplicate calls are
/// silent no-ops. Each exit path releases the capture stream and cancels the
/// tick exactly once.
pub struct VoiceCaptureController {
    config: ControllerConfig,
    source: Arc<dyn CaptureSource>,
    sender: Arc<dyn AudioMessageSender>,
    notifications: mpsc::Sender<Notification>,

    state: StateCell,

    /// Seconds elapsed in the current session, incremented by the 1s tick
    elapsed_secs: Arc<AtomicU64>,

    /// The live capture stream; `Some` iff state is not Idle
    stream: Arc<Mutex<Option<Box<dyn CaptureStream>>>>,

    /// Id and start timestamp of the live session
    meta: Arc<StdMutex<Option<SessionMeta>>>,

    /// Handle for the session event-loop task
    task: StdMutex<Option<JoinHandle<()>>>,
}

#[derive(Clone, Copy)]
struct SessionMeta {
    id: Uuid,
    started_at: DateTime<Utc>,
}

/// How a session's event loop ended
enum SessionEnd {
    /// Stream delivered its stop event after a `stop` request
    Stopped,
    /// Asynchronous capture failure
    Failed(String),
}

enum StartFailure {
    /// Capability acquisition rejected (permission denied, no device)
    Capability(Error),
    /// No entry of the format preference list is supported
    NoSupportedFormat,
}

impl VoiceCaptureController {
    pub fn new(
        config: ControllerConfig,
        source: Arc<dyn CaptureSource>,
        sender: Arc<dyn AudioMessageSender>,
        notifications: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            config,
            source,
            sender,
            notifications,
            state: StateCell::new(),
            elapsed_secs: Arc::new(AtomicU64::new(0)),
            stream: Arc::new(Mutex::new(None)),
            meta: Arc::new(StdMutex::new(None)),
            task: StdMutex::new(None),
        }
    }

    /// Begin a new recording session
    ///
    /// Silent no-op unless the controller is Idle; the Initializing state is
    /// set before the first await, which is what makes this an effective
    /// re-entrancy guard during the async acquisition window.
    pub async fn start(&self) {
        if !self
            .state
            .transition(CaptureState::Idle, CaptureState::Initializing)
        {
            debug!(state = ?self.state.get(), "start ignored: session already starting or active");
            return;
        }

        if let Err(failure) = self.initialize().await {
            let notification = match failure {
                StartFailure::Capability(e) => {
                    warn!("failed to acquire capture capability: {:#}", e);
                    Notification::capability_denied(&format!("{:#}", e))
                }
                StartFailure::NoSupportedFormat => {
                    warn!("no supported encoding format among preferences");
                    Notification::capability_unsupported()
                }
            };
            notify(&self.notifications, notification).await;
            self.meta.lock().unwrap().take();
            self.state.set(CaptureState::Idle);
        }
    }

    async fn initialize(&self) -> Result<(), StartFailure> {
        let mut stream = self
            .source
            .acquire(&self.config.options)
            .await
            .map_err(StartFailure::Capability)?;

        // First supported entry of the preference list wins; the format is
        // fixed for the whole session.
        let encoding_format = self
            .config
            .format_preferences
            .iter()
            .find(|f| self.source.is_format_supported(f))
            .cloned()
            .ok_or(StartFailure::NoSupportedFormat)?;

        let events = stream
            .start(self.config.fragment_interval())
            .await
            .map_err(StartFailure::Capability)?;

        let session_id = Uuid::new_v4();
        let started = Instant::now();

        self.elapsed_secs.store(0, Ordering::SeqCst);
        *self.meta.lock().unwrap() = Some(SessionMeta {
            id: session_id,
            started_at: Utc::now(),
        });
        *self.stream.lock().await = Some(stream);
        self.state.set(CaptureState::Recording);

        info!(
            %session_id,
            source = self.source.name(),
            format = %encoding_format,
            "recording started"
        );

        let task = tokio::spawn(run_session(SessionTask {
            events,
            encoding_format,
            session_id,
            started,
            config: self.config.clone(),
            state: self.state.clone(),
            elapsed_secs: Arc::clone(&self.elapsed_secs),
            stream: Arc::clone(&self.stream),
            meta: Arc::clone(&self.meta),
            sender: Arc::clone(&self.sender),
            notifications: self.notifications.clone(),
        }));
        *self.task.lock().unwrap() = Some(task);

        Ok(())
    }

    /// End the current recording session
    ///
    /// Silent no-op unless the controller is Recording, which absorbs
    /// duplicate stop gestures (touchend followed by a synthesized mouseup).
    /// Finalization runs asynchronously once the stream's stop event arrives.
    pub async fn stop(&self) {
        if !self
            .state
            .transition(CaptureState::Recording, CaptureState::Stopping)
        {
            debug!(state = ?self.state.get(), "stop ignored: no active recording");
            return;
        }

        info!("stopping recording");

        let mut guard = self.stream.lock().await;
        if let Some(stream) = guard.as_mut() {
            // Flush first so a trailing fragment lands before the stop event.
            if let Err(e) = stream.request_flush().await {
                warn!("flush request failed: {:#}", e);
            }
            if let Err(e) = stream.stop().await {
                // Release the stream; the closed event channel makes the
                // session task finalize through its failure path.
                warn!("capture stop failed, releasing stream: {:#}", e);
                guard.take();
            }
        }
    }

    /// True while Initializing or Recording
    pub fn is_active(&self) -> bool {
        self.state.get().is_active()
    }

    /// Seconds elapsed in the current session, for display
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_secs.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> CaptureState {
        self.state.get()
    }

    /// Snapshot of the controller for display
    pub fn status(&self) -> CaptureStatus {
        let state = self.state.get();
        let meta = self.meta.lock().unwrap();
        CaptureStatus {
            state,
            is_active: state.is_active(),
            elapsed_secs: self.elapsed_secs.load(Ordering::SeqCst),
            session_id: meta.as_ref().map(|m| m.id),
            started_at: meta.as_ref().map(|m| m.started_at),
        }
    }
}

impl Drop for VoiceCaptureController {
    fn drop(&mut self) {
        // Disposal mid-session: abort the event loop; the stream box drops
        // with the last Arc clone, releasing the device.
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }
}

struct SessionTask {
    events: mpsc::Receiver<CaptureEvent>,
    encoding_format: String,
    session_id: Uuid,
    started: Instant,
    config: ControllerConfig,
    state: StateCell,
    elapsed_secs: Arc<AtomicU64>,
    stream: Arc<Mutex<Option<Box<dyn CaptureStream>>>>,
    meta: Arc<StdMutex<Option<SessionMeta>>>,
    sender: Arc<dyn AudioMessageSender>,
    notifications: mpsc::Sender<Notification>,
}

/// Per-session event loop: accumulates fragments, drives the 1s tick, and
/// runs finalization exactly once when the stream stops or fails.
async fn run_session(mut task: SessionTask) {
    let mut fragments: Vec<Vec<u8>> = Vec::new();
    let mut ticker = tokio::time::interval_at(
        task.started + Duration::from_secs(1),
        Duration::from_secs(1),
    );

    let end = loop {
        tokio::select! {
            event = task.events.recv() => match event {
                Some(CaptureEvent::Fragment(data)) => {
                    if !data.is_empty() {
                        debug!(bytes = data.len(), "fragment received");
                        fragments.push(data);
                    }
                }
                Some(CaptureEvent::Stopped) => break SessionEnd::Stopped,
                Some(CaptureEvent::Error(message)) => break SessionEnd::Failed(message),
                None => break SessionEnd::Failed("capture stream closed unexpectedly".to_string()),
            },
            _ = ticker.tick() => {
                if task.state.get() != CaptureState::Recording {
                    continue;
                }
                let secs = task.elapsed_secs.fetch_add(1, Ordering::SeqCst) + 1;

                if let Some(cap) = task.config.max_duration() {
                    if Duration::from_secs(secs) >= cap
                        && task.state.transition(CaptureState::Recording, CaptureState::Stopping)
                    {
                        info!(session_id = %task.session_id, cap_secs = cap.as_secs(), "maximum duration reached, stopping");
                        let mut guard = task.stream.lock().await;
                        if let Some(stream) = guard.as_mut() {
                            if let Err(e) = stream.request_flush().await {
                                warn!("flush request failed: {:#}", e);
                            }
                            if let Err(e) = stream.stop().await {
                                warn!("capture stop failed, releasing stream: {:#}", e);
                                guard.take();
                            }
                        }
                    }
                }
            }
        }
    };

    finalize(task, fragments, end).await;
}

/// Terminal transition: decide the session outcome, then release the stream,
/// clear the buffer, and return to Idle. Runs once per session.
async fn finalize(task: SessionTask, fragments: Vec<Vec<u8>>, end: SessionEnd) {
    let duration = task.started.elapsed();

    // Release the capture resource on every path before reporting.
    task.stream.lock().await.take();

    match end {
        SessionEnd::Failed(message) => {
            error!(session_id = %task.session_id, "capture error: {}", message);
            notify(&task.notifications, Notification::capture_error(&message)).await;
        }
        SessionEnd::Stopped if duration < task.config.min_duration() => {
            debug!(
                session_id = %task.session_id,
                duration_ms = duration.as_millis() as u64,
                "recording too short, discarding"
            );
            notify(
                &task.notifications,
                Notification::too_short(task.config.min_duration_secs),
            )
            .await;
        }
        SessionEnd::Stopped if fragments.is_empty() => {
            warn!(session_id = %task.session_id, "capture produced no data");
            notify(&task.notifications, Notification::capture_empty()).await;
        }
        SessionEnd::Stopped => {
            let message = AudioMessage {
                fragments,
                encoding_format: task.encoding_format.clone(),
                duration_ms: duration.as_millis() as u64,
            };
            info!(
                session_id = %task.session_id,
                fragments = message.fragments.len(),
                bytes = message.total_bytes(),
                duration_ms = message.duration_ms,
                "recording complete"
            );
            if let Err(e) = task.sender.send_audio_message(message).await {
                error!("failed to deliver voice message: {:#}", e);
            }
        }
    }

    task.elapsed_secs.store(0, Ordering::SeqCst);
    task.meta.lock().unwrap().take();
    task.state.set(CaptureState::Idle);

    debug!(session_id = %task.session_id, "session finalized");
}

async fn notify(channel: &mpsc::Sender<Notification>, notification: Notification) {
    if channel.send(notification).await.is_err() {
        warn!("notification channel closed, dropping notification");
    }
}
