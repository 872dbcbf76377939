use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::CaptureOptions;

/// Configuration for the voice capture controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Enhancement options passed to the capture source
    pub options: CaptureOptions,

    /// Encoding formats to probe, in preference order; the first supported
    /// one is used for the whole session
    pub format_preferences: Vec<String>,

    /// Fragment delivery interval in milliseconds. Partial data arrives
    /// throughout the session rather than only at the end, so trailing audio
    /// is recoverable even when stop is delayed.
    pub fragment_interval_ms: u64,

    /// Recordings shorter than this are discarded as accidental taps
    pub min_duration_secs: u64,

    /// Optional hard cap on recording length; `None` leaves recording
    /// unbounded (a lost release gesture then never stops the session)
    pub max_duration_secs: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            options: CaptureOptions::default(),
            format_preferences: vec![
                "audio/webm;codecs=opus".to_string(),
                "audio/webm".to_string(),
                "audio/mp4".to_string(),
                "audio/ogg;codecs=opus".to_string(),
            ],
            fragment_interval_ms: 100,
            min_duration_secs: 1,
            max_duration_secs: None,
        }
    }
}

impl ControllerConfig {
    pub fn fragment_interval(&self) -> Duration {
        Duration::from_millis(self.fragment_interval_ms)
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_secs(self.min_duration_secs)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}
