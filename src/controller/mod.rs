//! Voice capture session management
//!
//! This module provides the `VoiceCaptureController` abstraction that manages:
//! - Capture capability acquisition and release
//! - Encoding format negotiation
//! - Fragment accumulation and the 1-second elapsed tick
//! - Finalization policy (send, too-short discard, empty-capture failure)
//! - Session state guarding against overlapping start/stop gestures

mod config;
mod session;
mod state;
mod status;

pub use config::ControllerConfig;
pub use session::VoiceCaptureController;
pub use state::{CaptureState, StateCell};
pub use status::{format_elapsed, CaptureStatus};
