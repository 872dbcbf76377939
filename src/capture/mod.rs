pub mod scripted;
pub mod source;

pub use scripted::ScriptedSource;
pub use source::{CaptureEvent, CaptureOptions, CaptureSource, CaptureStream};
