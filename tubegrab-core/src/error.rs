//! The errors that can occur.

use std::time::Duration;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// The URL is not a recognised video URL.
    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),
    /// The extraction collaborator could not fetch the video metadata.
    #[error("Failed to fetch video information: {0}")]
    Extraction(String),
    /// The requested quality cannot be obtained.
    #[error("Requested format is not available: {0}")]
    FormatUnavailable(String),
    /// The multiplexer could not merge the video and audio streams.
    #[error("Failed to merge video and audio: {0}")]
    Merge(String),
    /// A quality label could not be parsed.
    #[error("Invalid quality label: {0}")]
    Quality(String),

    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while fetching a stream.
    #[error("An error occurred while fetching: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// An error occurred while parsing JSON.
    #[error("An error occurred while parsing JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// A required executable could not be located.
    #[error("Executable not found: {0}")]
    Binary(String),
    /// An error occurred while running a command.
    #[error("Failed to execute command: {0}")]
    Command(String),
    /// An error occurred manipulating a path.
    #[error("An invalid path was provided: {0}")]
    Path(String),
    /// An error occurred due to a timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// The stream has no URL that can be fetched over HTTP.
    #[error("Stream {0} has no URL available")]
    MissingUrl(String),
    /// The server answered a stream request unexpectedly.
    #[error("Unexpected response while fetching stream: {0}")]
    Fetch(String),
}

impl Error {
    /// Whether a metadata request that failed with this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Extraction(_))
    }
}
