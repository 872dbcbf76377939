// Integration tests for the voice capture controller
//
// These tests drive the controller against the scripted capture source with
// a paused tokio clock, so elapsed-duration policy and tick behavior are
// deterministic.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::advance;
use voice_capture::{
    AudioMessage, CaptureState, ChannelSender, ControllerConfig, NoticeKind, Notification,
    ScriptedSource, Severity, VoiceCaptureController,
};

struct Harness {
    controller: Arc<VoiceCaptureController>,
    source: ScriptedSource,
    messages: mpsc::Receiver<AudioMessage>,
    notifications: mpsc::Receiver<Notification>,
}

fn harness_with(source: ScriptedSource, config: ControllerConfig) -> Harness {
    let (message_tx, messages) = mpsc::channel(8);
    let (notification_tx, notifications) = mpsc::channel(8);

    let controller = Arc::new(VoiceCaptureController::new(
        config,
        Arc::new(source.clone()),
        Arc::new(ChannelSender::new(message_tx)),
        notification_tx,
    ));

    Harness {
        controller,
        source,
        messages,
        notifications,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedSource::new(), ControllerConfig::default())
}

/// Let the session task catch up on ready timers and queued events
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Yield until the controller has finalized back to Idle
async fn wait_idle(controller: &VoiceCaptureController) {
    for _ in 0..200 {
        if controller.state() == CaptureState::Idle {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("controller did not return to Idle");
}

#[tokio::test(start_paused = true)]
async fn start_transitions_to_recording_and_acquires_once() {
    let mut h = harness();

    h.controller.start().await;

    assert_eq!(h.controller.state(), CaptureState::Recording);
    assert!(h.controller.is_active());
    assert_eq!(h.controller.elapsed_seconds(), 0);
    assert_eq!(h.source.acquire_count(), 1);
    assert!(h.notifications.try_recv().is_err(), "no notification on success");

    let status = h.controller.status();
    assert!(status.session_id.is_some());
    assert!(status.started_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn start_is_noop_while_initializing() {
    let h = harness();
    h.source.set_acquire_delay(Duration::from_millis(500));

    let controller = Arc::clone(&h.controller);
    let starter = tokio::spawn(async move { controller.start().await });

    // Let the first start reach the acquisition await.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.controller.state(), CaptureState::Initializing);
    assert!(h.controller.is_active(), "active during the startup window");

    // Second gesture lands mid-acquisition: rejected without a second acquire.
    h.controller.start().await;

    advance(Duration::from_millis(500)).await;
    starter.await.unwrap();

    assert_eq!(h.controller.state(), CaptureState::Recording);
    assert_eq!(h.source.acquire_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_is_noop_while_recording() {
    let h = harness();

    h.controller.start().await;
    h.controller.start().await;

    assert_eq!(h.source.acquire_count(), 1);
    assert_eq!(h.controller.state(), CaptureState::Recording);
}

#[tokio::test(start_paused = true)]
async fn stop_is_noop_while_idle() {
    let mut h = harness();

    h.controller.stop().await;

    assert_eq!(h.controller.state(), CaptureState::Idle);
    assert!(h.notifications.try_recv().is_err());
    assert!(h.messages.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn denied_capability_notifies_once_and_returns_to_idle() {
    let mut h = harness();
    h.source.deny_with("permission denied");

    h.controller.start().await;

    assert_eq!(h.controller.state(), CaptureState::Idle);
    assert!(!h.controller.is_active());
    assert_eq!(h.source.acquire_count(), 0);

    let notification = h.notifications.try_recv().expect("one notification");
    assert_eq!(notification.kind, NoticeKind::CapabilityDenied);
    assert_eq!(notification.severity, Severity::Error);
    assert!(h.notifications.try_recv().is_err(), "exactly one notification");
    assert!(h.messages.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn unsupported_formats_abort_and_release_the_stream() {
    let mut h = harness_with(
        ScriptedSource::with_formats(&[]),
        ControllerConfig::default(),
    );

    h.controller.start().await;

    assert_eq!(h.controller.state(), CaptureState::Idle);
    // The stream was acquired before probing, so it must have been released.
    assert_eq!(h.source.acquire_count(), 1);
    assert_eq!(h.source.release_count(), 1);

    let notification = h.notifications.try_recv().expect("one notification");
    assert_eq!(notification.kind, NoticeKind::CapabilityUnsupported);
    assert!(h.notifications.try_recv().is_err());
}

// Scenario A: released after 0.4s -> discarded as too short, nothing sent.
#[tokio::test(start_paused = true)]
async fn short_recording_is_discarded() {
    let mut h = harness();

    h.controller.start().await;
    h.source.emit_fragment(vec![0u8; 80]);
    advance(Duration::from_millis(400)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    assert!(h.messages.try_recv().is_err(), "sender must not be invoked");
    let notification = h.notifications.try_recv().expect("too-short notification");
    assert_eq!(notification.kind, NoticeKind::TooShort);
    assert_eq!(notification.severity, Severity::Warning);
}

// Scenario B: 2s with three fragments -> exactly one message, order preserved.
#[tokio::test(start_paused = true)]
async fn completed_recording_is_sent_once_in_order() {
    let mut h = harness();

    h.controller.start().await;
    assert!(h.source.emit_fragment(vec![1u8; 100]));
    assert!(h.source.emit_fragment(vec![2u8; 150]));
    assert!(h.source.emit_fragment(vec![3u8; 120]));
    advance(Duration::from_secs(2)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    let message = h.messages.try_recv().expect("one voice message");
    assert_eq!(message.encoding_format, "audio/webm;codecs=opus");
    assert_eq!(message.fragments.len(), 3);
    assert_eq!(message.fragments[0], vec![1u8; 100]);
    assert_eq!(message.fragments[1], vec![2u8; 150]);
    assert_eq!(message.fragments[2], vec![3u8; 120]);
    assert_eq!(message.total_bytes(), 370);

    let combined = message.combined();
    assert_eq!(combined.len(), 370);
    assert_eq!(&combined[..100], &[1u8; 100][..]);
    assert_eq!(&combined[100..250], &[2u8; 150][..]);
    assert_eq!(&combined[250..], &[3u8; 120][..]);

    assert!(h.messages.try_recv().is_err(), "sender invoked exactly once");
    assert!(h.notifications.try_recv().is_err());
}

// Scenario C: long enough but no data -> capture failure, distinct from too-short.
#[tokio::test(start_paused = true)]
async fn empty_capture_reports_failure() {
    let mut h = harness();

    h.controller.start().await;
    advance(Duration::from_millis(1500)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    assert!(h.messages.try_recv().is_err());
    let notification = h.notifications.try_recv().expect("capture-empty notification");
    assert_eq!(notification.kind, NoticeKind::CaptureEmpty);
    assert_eq!(notification.severity, Severity::Error);
}

#[tokio::test(start_paused = true)]
async fn duplicate_stop_finalizes_once() {
    let mut h = harness();

    h.controller.start().await;
    h.source.emit_fragment(vec![0u8; 200]);
    advance(Duration::from_secs(2)).await;

    // touchend plus synthesized mouseup
    h.controller.stop().await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    assert!(h.messages.try_recv().is_ok());
    assert!(h.messages.try_recv().is_err(), "one finalization, one send");
    h.controller.stop().await;
    assert_eq!(h.controller.state(), CaptureState::Idle);
}

#[tokio::test(start_paused = true)]
async fn empty_fragments_are_ignored() {
    let mut h = harness();

    h.controller.start().await;
    h.source.emit_fragment(Vec::new());
    h.source.emit_fragment(vec![7u8; 64]);
    h.source.emit_fragment(Vec::new());
    advance(Duration::from_secs(1)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    let message = h.messages.try_recv().expect("one voice message");
    assert_eq!(message.fragments.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn flushed_fragment_arrives_before_finalization() {
    let mut h = harness();

    h.controller.start().await;
    h.source.emit_fragment(vec![5u8; 90]);
    advance(Duration::from_millis(1200)).await;

    // Buffered-but-undelivered data is recovered by the stop-path flush.
    h.source.buffer_fragment(vec![6u8; 40]);
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    let message = h.messages.try_recv().expect("one voice message");
    assert_eq!(message.fragments.len(), 2);
    assert_eq!(message.fragments[1], vec![6u8; 40]);
}

#[tokio::test(start_paused = true)]
async fn runtime_capture_error_aborts_the_session() {
    let mut h = harness();

    h.controller.start().await;
    h.source.emit_fragment(vec![0u8; 120]);
    advance(Duration::from_secs(2)).await;
    h.source.emit_error("device disconnected");
    wait_idle(&h.controller).await;

    assert!(h.messages.try_recv().is_err(), "no send after a capture error");
    let notification = h.notifications.try_recv().expect("capture-error notification");
    assert_eq!(notification.kind, NoticeKind::CaptureError);
    assert_eq!(h.source.release_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn elapsed_counter_ticks_while_recording() {
    let h = harness();

    h.controller.start().await;
    assert_eq!(h.controller.elapsed_seconds(), 0);

    advance(Duration::from_millis(2500)).await;
    settle().await;
    assert_eq!(h.controller.elapsed_seconds(), 2);

    h.controller.stop().await;
    wait_idle(&h.controller).await;
    assert_eq!(h.controller.elapsed_seconds(), 0, "counter resets on Idle");
}

#[tokio::test(start_paused = true)]
async fn max_duration_cap_stops_the_session() {
    let config = ControllerConfig {
        max_duration_secs: Some(3),
        ..ControllerConfig::default()
    };
    let mut h = harness_with(ScriptedSource::new(), config);

    h.controller.start().await;
    h.source.emit_fragment(vec![9u8; 300]);
    advance(Duration::from_secs(4)).await;
    wait_idle(&h.controller).await;

    let message = h.messages.try_recv().expect("capped recording still delivered");
    assert_eq!(message.fragments.len(), 1);
    assert_eq!(h.source.release_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn format_negotiation_picks_first_supported_preference() {
    let mut h = harness_with(
        ScriptedSource::with_formats(&["audio/mp4"]),
        ControllerConfig::default(),
    );

    h.controller.start().await;
    h.source.emit_fragment(vec![0u8; 100]);
    advance(Duration::from_secs(1)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    let message = h.messages.try_recv().expect("one voice message");
    assert_eq!(message.encoding_format, "audio/mp4");
}

#[tokio::test(start_paused = true)]
async fn resources_are_released_after_every_session() {
    let mut h = harness();

    // Completed session
    h.controller.start().await;
    h.source.emit_fragment(vec![0u8; 100]);
    advance(Duration::from_secs(1)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    assert_eq!(h.source.acquire_count(), 1);
    assert_eq!(h.source.release_count(), 1);
    assert!(!h.source.has_live_stream());
    assert!(!h.source.emit_fragment(vec![0u8; 10]), "no callbacks after Idle");

    // No further ticks after Idle
    advance(Duration::from_secs(5)).await;
    assert_eq!(h.controller.elapsed_seconds(), 0);

    // Short-discard session releases too
    h.controller.start().await;
    advance(Duration::from_millis(300)).await;
    h.controller.stop().await;
    wait_idle(&h.controller).await;

    assert_eq!(h.source.acquire_count(), 2);
    assert_eq!(h.source.release_count(), 2);

    let _ = h.messages.try_recv();
    let _ = h.notifications.try_recv();
}

#[tokio::test(start_paused = true)]
async fn controller_can_run_sequential_sessions() {
    let mut h = harness();

    for round in 1..=3u8 {
        h.controller.start().await;
        h.source.emit_fragment(vec![round; 50]);
        advance(Duration::from_secs(1)).await;
        h.controller.stop().await;
        wait_idle(&h.controller).await;

        let message = h.messages.try_recv().expect("one message per session");
        assert_eq!(message.fragments, vec![vec![round; 50]]);
    }

    assert_eq!(h.source.acquire_count(), 3);
    assert_eq!(h.source.release_count(), 3);
}
