use serde::{Deserialize, Serialize};

/// Notification severity, mapped by the UI layer to toast styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What went wrong, independent of display text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Capture capability denied (permission refused, no device)
    CapabilityDenied,
    /// No encoding format in the preference list is supported
    CapabilityUnsupported,
    /// Recording met the duration threshold but produced no fragments
    CaptureEmpty,
    /// Recording released before the minimum duration
    TooShort,
    /// Asynchronous failure from the capture stream mid-session
    CaptureError,
}

/// User-facing notification emitted by the capture controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn capability_denied(detail: &str) -> Self {
        Self {
            kind: NoticeKind::CapabilityDenied,
            title: "Microphone Error".to_string(),
            description: format!("Could not access microphone: {}. Please check permissions.", detail),
            severity: Severity::Error,
        }
    }

    pub fn capability_unsupported() -> Self {
        Self {
            kind: NoticeKind::CapabilityUnsupported,
            title: "Recording Unsupported".to_string(),
            description: "No supported audio encoding format is available on this device.".to_string(),
            severity: Severity::Error,
        }
    }

    pub fn capture_empty() -> Self {
        Self {
            kind: NoticeKind::CaptureEmpty,
            title: "Recording Failed".to_string(),
            description: "The microphone produced no audio data.".to_string(),
            severity: Severity::Error,
        }
    }

    pub fn too_short(min_secs: u64) -> Self {
        Self {
            kind: NoticeKind::TooShort,
            title: "Recording Too Short".to_string(),
            description: format!(
                "Please hold the button for at least {} second{} to record.",
                min_secs,
                if min_secs == 1 { "" } else { "s" }
            ),
            severity: Severity::Warning,
        }
    }

    pub fn capture_error(detail: &str) -> Self {
        Self {
            kind: NoticeKind::CaptureError,
            title: "Recording Error".to_string(),
            description: format!("Recording failed: {}", detail),
            severity: Severity::Error,
        }
    }
}
