//! Tools for fetching video metadata and stream bytes from YouTube.

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::fetcher::{Fetcher, ProgressSink};
use crate::model::raw::RawVideo;
use crate::model::{StreamDescriptor, VideoInfo};
use crate::{Youtube, utils};
use async_trait::async_trait;
use std::path::Path;

/// The collaborator that turns a video URL into metadata and streams into bytes.
///
/// [`Youtube`] implements it on top of `yt-dlp`, tests swap in their own implementation.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetches the metadata and the full stream list of a video.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] when the metadata could not be obtained.
    async fn fetch_video_infos(&self, url: &str) -> Result<VideoInfo>;

    /// Writes the bytes of `stream` to `destination`, reporting progress to `sink`.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    async fn retrieve(
        &self,
        stream: &StreamDescriptor,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64>;
}

impl Youtube {
    /// The arguments selecting the client profile, added to every `yt-dlp` call.
    pub(crate) fn client_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if !self.client.player_client.eq_ignore_ascii_case("default") {
            args.push("--extractor-args".to_string());
            args.push(format!(
                "youtube:player_client={}",
                self.client.player_client
            ));
        }
        if let Some(user_agent) = &self.client.user_agent {
            args.push("--user-agent".to_string());
            args.push(user_agent.clone());
        }

        args
    }

    fn metadata_args(&self, url: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(self.client_args());
        args.extend(utils::to_owned(vec![
            "--no-progress",
            "--no-playlist",
            "--dump-json",
            url,
        ]));
        args
    }
}

#[async_trait]
impl Extractor for Youtube {
    /// Runs `yt-dlp --dump-json` and maps its output.
    ///
    /// # Examples
    ///
    /// ```rust, no_run
    /// # use tubegrab_core::Youtube;
    /// # use tubegrab_core::fetcher::deps::Libraries;
    /// # use tubegrab_core::fetcher::streams::Extractor;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let fetcher = Youtube::new(Libraries::resolve(None, None)?);
    ///
    /// let video = fetcher
    ///     .fetch_video_infos("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
    ///     .await?;
    /// println!("{} streams", video.streams.len());
    /// # Ok(())
    /// # }
    /// ```
    async fn fetch_video_infos(&self, url: &str) -> Result<VideoInfo> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Fetching video information for {}", url);

        let executor = Executor {
            executable_path: self.libraries.youtube.clone(),
            timeout: Some(self.timeout),
            args: self.metadata_args(url),
        };

        let output = executor.execute().await.map_err(|e| match e {
            Error::Command(message) => Error::Extraction(message),
            Error::Timeout(duration) => {
                Error::Extraction(format!("yt-dlp timed out after {:?}", duration))
            }
            other => other,
        })?;

        let line = output
            .stdout
            .lines()
            .find(|line| line.trim_start().starts_with('{'))
            .ok_or_else(|| Error::Extraction("yt-dlp printed no video information".to_string()))?;

        let raw: RawVideo = serde_json::from_str(line)?;
        let video = VideoInfo::from(raw);

        #[cfg(feature = "tracing")]
        tracing::debug!("Fetched {}", video);

        Ok(video)
    }

    async fn retrieve(
        &self,
        stream: &StreamDescriptor,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Retrieving {} to {:?}", stream, destination);

        let url = stream
            .source
            .url
            .as_ref()
            .ok_or_else(|| Error::MissingUrl(stream.source.format_id.clone()))?;

        let mut fetcher = Fetcher::new(url)
            .with_headers(&stream.source.http_headers)
            .with_total_size(stream.source.exact_size);
        if let Some(user_agent) = &self.client.user_agent {
            fetcher = fetcher.with_user_agent(user_agent);
        }

        fetcher.fetch_asset(destination, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientProfile;
    use crate::fetcher::NoProgress;
    use crate::fetcher::deps::Libraries;
    use crate::model::catalog::tests::video;
    use std::path::PathBuf;

    fn youtube(client: ClientProfile) -> Youtube {
        Youtube::new(Libraries::new(
            PathBuf::from("yt-dlp"),
            PathBuf::from("ffmpeg"),
        ))
        .with_client(client)
    }

    #[test]
    fn test_default_client_adds_no_args() {
        let fetcher = youtube(ClientProfile::default());
        assert!(fetcher.client_args().is_empty());
    }

    #[test]
    fn test_client_profile_args() {
        let fetcher = youtube(ClientProfile {
            player_client: "ios".to_string(),
            user_agent: Some("com.google.ios.youtube/19.29.1".to_string()),
        });

        assert_eq!(
            fetcher.client_args(),
            vec![
                "--extractor-args",
                "youtube:player_client=ios",
                "--user-agent",
                "com.google.ios.youtube/19.29.1",
            ]
        );
    }

    #[test]
    fn test_metadata_args_end_with_url() {
        let fetcher =
            youtube(ClientProfile::default()).with_args(vec!["--no-cache-dir".to_string()]);
        let args = fetcher.metadata_args("https://youtu.be/dQw4w9WgXcQ");

        assert_eq!(args.first().map(String::as_str), Some("--no-cache-dir"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
        assert!(args.iter().any(|arg| arg == "--dump-json"));
    }

    #[tokio::test]
    async fn test_retrieve_without_url() {
        let fetcher = youtube(ClientProfile::default());
        let mut stream = video("137", 1080, false);
        stream.source.url = None;

        let result = fetcher
            .retrieve(&stream, Path::new("unused.mp4"), &NoProgress)
            .await;
        assert!(matches!(result, Err(Error::MissingUrl(id)) if id == "137"));
    }

    #[tokio::test]
    async fn test_missing_extractor_is_not_retryable() {
        let fetcher = Youtube::new(Libraries::new(
            PathBuf::from("/nonexistent/tubegrab-yt-dlp"),
            PathBuf::from("ffmpeg"),
        ));

        let error = fetcher
            .fetch_video_infos("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Binary(_)), "unexpected error: {error:?}");
        assert!(!error.is_retryable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_extractor_maps_to_extraction_error() {
        let fetcher = Youtube::new(Libraries::new(
            PathBuf::from("/bin/false"),
            PathBuf::from("ffmpeg"),
        ));

        let result = fetcher.fetch_video_infos("https://youtu.be/dQw4w9WgXcQ").await;
        match result {
            Err(error) => assert!(error.is_retryable(), "unexpected error: {error:?}"),
            Ok(video) => panic!("unexpected video: {video}"),
        }
    }
}
