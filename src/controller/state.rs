use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// The lifecycle state of the capture controller
///
/// Valid transitions: Idle -> Initializing -> Recording -> Stopping -> Idle,
/// plus Initializing -> Idle and Stopping -> Idle on abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// No session; `start` is accepted
    Idle,
    /// Capability acquisition in flight; `start` and `stop` are rejected
    Initializing,
    /// Actively capturing; `stop` is accepted
    Recording,
    /// Stop requested, waiting for the stream's stop event to finalize
    Stopping,
}

impl CaptureState {
    /// Active from the caller's perspective: the UI disables conflicting
    /// controls during the async startup window, not only while recording.
    pub fn is_active(self) -> bool {
        matches!(self, CaptureState::Initializing | CaptureState::Recording)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => CaptureState::Idle,
            1 => CaptureState::Initializing,
            2 => CaptureState::Recording,
            _ => CaptureState::Stopping,
        }
    }
}

/// Shared atomic cell holding the session state
///
/// All start/stop guards are compare-and-swap transitions against this one
/// field, so overlapping calls from independent event sources (touch plus
/// synthesized mouse events) resolve to exactly one winner.
#[derive(Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(CaptureState::Idle as u8)))
    }

    pub fn get(&self) -> CaptureState {
        CaptureState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: CaptureState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Transition from `from` to `to`; false if the state was anything else
    pub fn transition(&self, from: CaptureState, to: CaptureState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
