pub mod capture;
pub mod config;
pub mod controller;
pub mod notify;
pub mod sender;

pub use capture::{CaptureEvent, CaptureOptions, CaptureSource, CaptureStream, ScriptedSource};
pub use config::Config;
pub use controller::{
    format_elapsed, CaptureState, CaptureStatus, ControllerConfig, VoiceCaptureController,
};
pub use notify::{NoticeKind, Notification, Severity};
pub use sender::{AudioMessage, AudioMessageSender, ChannelSender};
