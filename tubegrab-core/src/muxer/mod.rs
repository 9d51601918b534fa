//! Merging separate video and audio streams, and transcoding audio, with `ffmpeg`.

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::utils::{self, file_system};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// The collaborator that combines streams into the final file.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Merges a video only stream and an audio stream into `output`, without re-encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] when the tool fails.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;

    /// Re-encodes an audio stream to MP3 at `kbps`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] when the tool fails.
    async fn transcode_audio(&self, input: &Path, output: &Path, kbps: u32) -> Result<()>;

    /// Rewraps `input` into the container implied by `output`, copying the streams.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] when the tool fails.
    async fn remux(&self, input: &Path, output: &Path) -> Result<()>;
}

/// A [`Muxer`] running the `ffmpeg` executable.
///
/// No timeout is applied, merging a long video legitimately takes a while.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ffmpeg {
    /// The path to the ffmpeg binary.
    pub executable: PathBuf,
}

impl Ffmpeg {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    async fn run(&self, args: Vec<&str>) -> Result<()> {
        let executor = Executor {
            executable_path: self.executable.clone(),
            timeout: None,
            args: utils::to_owned(args),
        };

        executor
            .execute()
            .await
            .map(|_| ())
            .map_err(|e| match e {
                Error::Command(message) => Error::Merge(message),
                Error::IO(e) => Error::Merge(e.to_string()),
                other => other,
            })
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::Path(format!("{} is not valid UTF-8", path.display())))
}

#[async_trait]
impl Muxer for Ffmpeg {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Merging video {:?} and audio {:?} into {:?}",
            video,
            audio,
            output
        );

        let args = vec![
            "-y",
            "-loglevel",
            "error",
            "-i",
            path_str(video)?,
            "-i",
            path_str(audio)?,
            "-c",
            "copy",
            path_str(output)?,
        ];
        self.run(args).await
    }

    async fn transcode_audio(&self, input: &Path, output: &Path, kbps: u32) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Transcoding {:?} to {:?} at {}kbps", input, output, kbps);

        let bitrate = format!("{}k", kbps);
        let args = vec![
            "-y",
            "-loglevel",
            "error",
            "-i",
            path_str(input)?,
            "-vn",
            "-c:a",
            "libmp3lame",
            "-b:a",
            &bitrate,
            path_str(output)?,
        ];
        self.run(args).await
    }

    async fn remux(&self, input: &Path, output: &Path) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Remuxing {:?} into {:?}", input, output);

        let args = vec![
            "-y",
            "-loglevel",
            "error",
            "-i",
            path_str(input)?,
            "-c",
            "copy",
            path_str(output)?,
        ];
        self.run(args).await
    }
}

/// The result of [`merge_or_degrade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged file, or the video only file when the merge failed.
    pub path: PathBuf,
    /// Set when the merge failed and the video only file is delivered instead.
    pub warning: Option<String>,
}

/// Merges `video` and `audio` into `output`, falling back to the video only file.
///
/// On success both inputs are deleted. On failure the audio input and any partial output are
/// deleted and `video` is returned with a warning. Never fails because of the merge itself.
pub async fn merge_or_degrade(
    muxer: &dyn Muxer,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> MergeOutcome {
    match muxer.merge(video, audio, output).await {
        Ok(()) => {
            file_system::remove_temp_file(video).await;
            file_system::remove_temp_file(audio).await;

            MergeOutcome {
                path: output.to_path_buf(),
                warning: None,
            }
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Merge failed, keeping the video without audio: {}", e);

            file_system::remove_temp_file(audio).await;
            file_system::remove_temp_file(output).await;

            MergeOutcome {
                path: video.to_path_buf(),
                warning: Some(format!(
                    "could not merge audio into the video ({}), the file has no sound",
                    e
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct ConcatMuxer;

    #[async_trait]
    impl Muxer for ConcatMuxer {
        async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
            let mut bytes = tokio::fs::read(video).await?;
            bytes.extend(tokio::fs::read(audio).await?);
            tokio::fs::write(output, bytes).await?;
            Ok(())
        }

        async fn transcode_audio(&self, input: &Path, output: &Path, _kbps: u32) -> Result<()> {
            tokio::fs::copy(input, output).await?;
            Ok(())
        }

        async fn remux(&self, input: &Path, output: &Path) -> Result<()> {
            tokio::fs::copy(input, output).await?;
            Ok(())
        }
    }

    struct BrokenMuxer;

    #[async_trait]
    impl Muxer for BrokenMuxer {
        async fn merge(&self, _video: &Path, _audio: &Path, output: &Path) -> Result<()> {
            tokio::fs::write(output, b"partial").await?;
            Err(Error::Merge("codec not supported".to_string()))
        }

        async fn transcode_audio(&self, _input: &Path, _output: &Path, _kbps: u32) -> Result<()> {
            Err(Error::Merge("no encoder".to_string()))
        }

        async fn remux(&self, _input: &Path, _output: &Path) -> Result<()> {
            Err(Error::Merge("unsupported codec for mp4".to_string()))
        }
    }

    async fn inputs(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
        let video = dir.path().join("video.mp4");
        let audio = dir.path().join("audio.m4a");
        tokio::fs::write(&video, b"video").await.unwrap();
        tokio::fs::write(&audio, b"audio").await.unwrap();
        (video, audio, dir.path().join("merged.mp4"))
    }

    #[tokio::test]
    async fn test_merge_success_cleans_inputs() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir).await;

        let outcome = merge_or_degrade(&ConcatMuxer, &video, &audio, &output).await;

        assert_eq!(outcome.path, output);
        assert_eq!(outcome.warning, None);
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"videoaudio");
        assert!(!video.exists());
        assert!(!audio.exists());
    }

    #[tokio::test]
    async fn test_merge_failure_degrades_to_video() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir).await;

        let outcome = merge_or_degrade(&BrokenMuxer, &video, &audio, &output).await;

        assert_eq!(outcome.path, video);
        assert!(outcome.warning.unwrap().contains("codec not supported"));
        assert!(video.exists());
        assert!(!audio.exists());
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ffmpeg_failure_is_merge_error() {
        let dir = TempDir::new().unwrap();
        let (video, audio, output) = inputs(&dir).await;

        let ffmpeg = Ffmpeg::new(PathBuf::from("/bin/false"));
        let result = ffmpeg.merge(&video, &audio, &output).await;

        assert!(matches!(result, Err(Error::Merge(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ffmpeg_remux_failure_is_merge_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("video.webm");
        tokio::fs::write(&input, b"video").await.unwrap();

        let ffmpeg = Ffmpeg::new(PathBuf::from("/bin/false"));
        let result = ffmpeg.remux(&input, &dir.path().join("video.mp4")).await;

        assert!(matches!(result, Err(Error::Merge(_))));
    }
}
