use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::CaptureState;

/// Read-only view of the controller for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureStatus {
    /// Current lifecycle state
    pub state: CaptureState,

    /// True while Initializing or Recording
    pub is_active: bool,

    /// Seconds elapsed in the current session (tick counter)
    pub elapsed_secs: u64,

    /// Id of the current session, if one is live
    pub session_id: Option<Uuid>,

    /// When the current session started
    pub started_at: Option<DateTime<Utc>>,
}

/// Format an elapsed-seconds counter as `m:ss` for display
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
