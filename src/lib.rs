use {
    crate::{
        config::Config,
        download::{DownloadOutcome, Downloader},
        progress::Reporter,
    },
    std::{path::PathBuf, time::Duration},
    tubegrab_core::{
        fetcher::deps::Libraries, ClientProfile, FallbackPolicy, Quality, Result, Youtube,
    },
};

pub mod config;
pub mod download;
pub mod progress;
pub mod youtube;

/// What to save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    /// The video with its audio, as `.mp4`.
    #[default]
    Video,
    /// The audio track only, as `.mp3`.
    Audio,
}

pub struct DownloadOptions {
    pub url: String,
    pub kind: MediaKind,
    /// The requested resolution, `None` for the best available.
    pub quality: Option<Quality>,
    /// Target MP3 bitrate in kbps for audio downloads.
    pub bitrate: u32,
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
    /// Only list video streams in this container, when matching streams exist.
    pub container: Option<String>,
    pub fallback: FallbackPolicy,
    /// Re-encode audio downloads to MP3, otherwise the stream is only renamed.
    pub transcode: bool,
    /// Maximum number of metadata attempts.
    pub retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub client: ClientProfile,
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    /// Extra arguments for every `yt-dlp` call.
    pub yt_dlp_args: Vec<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from_config(String::new(), &Config::default())
    }
}

impl DownloadOptions {
    /// Options for `url` with every setting taken from `config`.
    pub fn from_config(url: String, config: &Config) -> Self {
        Self {
            url,
            kind: MediaKind::Video,
            quality: None,
            bitrate: config.audio.default_bitrate,
            output_dir: config.output_dir.clone(),
            scratch_dir: config.scratch_dir(),
            container: config.container_filter(),
            fallback: config.fallback,
            transcode: config.audio.transcode,
            retries: config.extraction.retries,
            retry_delay: config.retry_delay(),
            timeout: config.timeout(),
            client: config.client_profile(),
            yt_dlp: config.tools.yt_dlp.clone(),
            ffmpeg: config.tools.ffmpeg.clone(),
            yt_dlp_args: config.extraction.extra_args.clone(),
        }
    }

    /// Locates `yt-dlp` and `ffmpeg` and builds the extractor for these options.
    pub fn youtube(&self) -> Result<Youtube> {
        let libraries = Libraries::resolve(self.yt_dlp.clone(), self.ffmpeg.clone())?;

        Ok(Youtube::new(libraries)
            .with_args(self.yt_dlp_args.clone())
            .with_timeout(self.timeout)
            .with_client(self.client.clone()))
    }
}

/// Downloads `options.url` with `yt-dlp` and `ffmpeg` found on the system.
///
/// ```rust,no_run
/// # use tubegrab::{download_youtube, DownloadOptions, MediaKind, progress::Silent};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = DownloadOptions {
///     url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
///     kind: MediaKind::Audio,
///     ..DownloadOptions::default()
/// };
/// let outcome = download_youtube(&options, &Silent).await?;
/// println!("Saved {}", outcome.path.display());
/// # Ok(())
/// # }
/// ```
pub async fn download_youtube(
    options: &DownloadOptions,
    reporter: &dyn Reporter,
) -> Result<DownloadOutcome> {
    let youtube = options.youtube()?;
    let muxer = youtube.muxer();

    Downloader::new(&youtube, &muxer, reporter, options)
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DownloadOptions::default();

        assert_eq!(options.kind, MediaKind::Video);
        assert_eq!(options.bitrate, config::DEFAULT_BITRATE);
        assert_eq!(options.container.as_deref(), Some("mp4"));
        assert_eq!(options.fallback, FallbackPolicy::Strict);
        assert_eq!(options.retries, 3);
        assert_eq!(options.timeout, Duration::from_secs(60));
        assert!(options.transcode);
        assert!(options.yt_dlp_args.is_empty());
    }
}
