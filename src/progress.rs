use {
    std::fmt,
    tubegrab_core::{NoProgress, ProgressSink, StreamDescriptor},
};

/// Which part of the download a stream is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Video,
    Audio,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRole::Video => write!(f, "video"),
            StreamRole::Audio => write!(f, "audio"),
        }
    }
}

/// Receives the pipeline's progress events. The CLI draws them, library users may ignore them.
pub trait Reporter: Send + Sync {
    /// A metadata request is about to start. `attempt` counts from 1.
    fn extraction_attempt(&self, _attempt: u32, _max: u32) {}

    /// A stream is about to be retrieved. The returned sink receives its byte progress.
    fn stream_started(&self, _role: StreamRole, _stream: &StreamDescriptor) -> Box<dyn ProgressSink> {
        Box::new(NoProgress)
    }

    /// A step without byte progress (merging, converting) is starting.
    fn stage(&self, _message: &str) {}

    /// The pipeline is done, successfully or not.
    fn finished(&self) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Reporter for Silent {}
