//! The engine behind `tubegrab`: fetches YouTube video metadata through `yt-dlp`, reduces the
//! reported streams into a quality catalog, retrieves the selected streams over HTTP and merges
//! them with `ffmpeg`.

use crate::fetcher::deps::Libraries;
use std::fmt;
use std::time::Duration;

pub mod error;
pub mod executor;
pub mod fetcher;
pub mod model;
pub mod muxer;
pub mod utils;

pub use error::{Error, Result};
pub use fetcher::streams::Extractor;
pub use fetcher::{NoProgress, ProgressSink};
pub use model::{
    Catalog, FallbackPolicy, Quality, SelectedStreams, Selection, StreamDescriptor, StreamKind,
    VideoInfo,
};
pub use muxer::{Ffmpeg, Muxer};

/// The player client `yt-dlp` impersonates, and the user agent sent along.
///
/// YouTube regularly breaks one client or another. Switching profiles is a configuration change,
/// nothing is patched globally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientProfile {
    /// The `player_client` extractor argument, `default` lets `yt-dlp` choose.
    pub player_client: String,
    /// The user agent for metadata and stream requests.
    pub user_agent: Option<String>,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            player_client: "default".to_string(),
            user_agent: None,
        }
    }
}

/// A YouTube video fetcher that uses yt-dlp to fetch video information.
///
/// The major implementations of this struct are located in the 'fetcher' module.
///
/// # Examples
///
/// ```rust, no_run
/// # use tubegrab_core::{Extractor, Youtube};
/// # use tubegrab_core::fetcher::deps::Libraries;
/// # use std::time::Duration;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let libraries = Libraries::resolve(None, None)?;
/// let fetcher = Youtube::new(libraries).with_timeout(Duration::from_secs(60));
///
/// let video = fetcher
///     .fetch_video_infos("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
///     .await?;
/// println!("Video title: {}", video.title);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Youtube {
    /// The required libraries.
    pub libraries: Libraries,
    /// Extra arguments to pass to 'yt-dlp'.
    pub args: Vec<String>,
    /// The timeout for a metadata request.
    pub timeout: Duration,
    /// The client profile used for every request.
    pub client: ClientProfile,
}

impl fmt::Display for Youtube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Youtube: yt-dlp={:?}, client={}, args={:?}",
            self.libraries.youtube, self.client.player_client, self.args
        )
    }
}

impl Youtube {
    /// Creates a new fetcher with a 30 seconds timeout and the default client profile.
    pub fn new(libraries: Libraries) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!("Creating a new video fetcher");

        Self {
            libraries,
            args: Vec::new(),
            timeout: Duration::from_secs(30),
            client: ClientProfile::default(),
        }
    }

    /// Adds arguments to pass to yt-dlp before the ones the engine sets.
    pub fn with_args(mut self, mut args: Vec<String>) -> Self {
        self.args.append(&mut args);
        self
    }

    /// Sets the timeout of a metadata request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the client profile.
    pub fn with_client(mut self, client: ClientProfile) -> Self {
        self.client = client;
        self
    }

    /// The muxer running the resolved ffmpeg binary.
    pub fn muxer(&self) -> Ffmpeg {
        Ffmpeg::new(self.libraries.ffmpeg.clone())
    }
}
