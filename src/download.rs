use {
    crate::{
        progress::{Reporter, StreamRole},
        youtube::validate_url,
        DownloadOptions, MediaKind,
    },
    log::{debug, info, warn},
    std::path::PathBuf,
    tubegrab_core::{
        model::selector::{select_audio, select_video},
        muxer::merge_or_degrade,
        utils::file_system,
        Catalog, Extractor, Muxer, Result, SelectedStreams, Selection, StreamDescriptor, VideoInfo,
    },
};

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Where the file was saved.
    pub path: PathBuf,
    pub title: String,
    pub file_name: String,
    pub mime: String,
    /// Things the user should know about, e.g. a substituted quality or a failed merge.
    pub warnings: Vec<String>,
}

/// Drives one download: metadata, selection, retrieval, merge and delivery.
pub struct Downloader<'a> {
    extractor: &'a dyn Extractor,
    muxer: &'a dyn Muxer,
    reporter: &'a dyn Reporter,
    options: &'a DownloadOptions,
}

impl<'a> Downloader<'a> {
    pub fn new(
        extractor: &'a dyn Extractor,
        muxer: &'a dyn Muxer,
        reporter: &'a dyn Reporter,
        options: &'a DownloadOptions,
    ) -> Self {
        Self {
            extractor,
            muxer,
            reporter,
            options,
        }
    }

    /// Validates the URL and fetches the video metadata, retrying extraction failures.
    pub async fn fetch_info(&self) -> Result<VideoInfo> {
        let url = self.options.url.trim();
        let id = validate_url(url)?;
        debug!("Video id: {}", id);

        let attempts = self.options.retries.max(1);
        let mut attempt = 1;

        loop {
            self.reporter.extraction_attempt(attempt, attempts);
            info!("Fetching video information, attempt {}/{}", attempt, attempts);

            match self.extractor.fetch_video_infos(url).await {
                Ok(video) => return Ok(video),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                    tokio::time::sleep(self.options.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The video catalog with the container filter applied, or without it when nothing matched.
    ///
    /// The flag is `true` when the filter had to be dropped.
    pub fn catalog(&self, video: &VideoInfo) -> (Catalog, bool) {
        let container = self.options.container.as_deref();
        let catalog = Catalog::from_streams(&video.streams, container);

        if catalog.is_empty() && container.is_some() {
            info!(
                "No {} streams listed, falling back to any container",
                container.unwrap_or_default()
            );
            return (Catalog::from_streams(&video.streams, None), true);
        }

        (catalog, false)
    }

    /// Fetches the metadata and downloads the requested media.
    pub async fn run(&self) -> Result<DownloadOutcome> {
        let video = self.fetch_info().await?;
        self.download(&video).await
    }

    /// Downloads the requested media of an already fetched video into the output directory.
    ///
    /// Scratch files are removed whether the download succeeds or not.
    pub async fn download(&self, video: &VideoInfo) -> Result<DownloadOutcome> {
        tokio::fs::create_dir_all(&self.options.scratch_dir).await?;
        tokio::fs::create_dir_all(&self.options.output_dir).await?;

        let mut scratch = Vec::new();
        let result = self.download_into_output(video, &mut scratch).await;

        // the delivered file has already left the scratch dir
        for path in &scratch {
            file_system::remove_temp_file(path).await;
        }
        self.reporter.finished();

        result
    }

    async fn download_into_output(
        &self,
        video: &VideoInfo,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<DownloadOutcome> {
        let (path, mut warnings) = match self.options.kind {
            MediaKind::Video => self.download_video(video, scratch).await?,
            MediaKind::Audio => self.download_audio(video, scratch).await?,
        };

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4")
            .to_ascii_lowercase();
        let file_name = file_system::output_file_name(&video.title, &video.id, &extension);
        let destination = self.options.output_dir.join(&file_name);

        file_system::move_file(&path, &destination).await?;
        info!("Saved {}", destination.display());

        warnings.dedup();
        Ok(DownloadOutcome {
            path: destination,
            title: video.title.clone(),
            file_name,
            mime: mime_for(&extension).to_string(),
            warnings,
        })
    }

    async fn download_video(
        &self,
        video: &VideoInfo,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<(PathBuf, Vec<String>)> {
        let (catalog, _) = self.catalog(video);
        let selected = select_video(&catalog, self.options.quality, self.options.fallback)?;

        let mut warnings = selection_warnings(&selected);

        let path = match &selected.selection {
            Selection::Single(stream) => {
                self.retrieve(StreamRole::Video, stream, "video", scratch)
                    .await?
            }
            Selection::Merge { video, audio } => {
                let video_path = self
                    .retrieve(StreamRole::Video, video, "video", scratch)
                    .await?;
                let audio_path = self
                    .retrieve(StreamRole::Audio, audio, "audio", scratch)
                    .await?;

                let output = self.scratch_path("merged", "mp4", scratch);
                self.reporter.stage("Merging video and audio");

                let outcome =
                    merge_or_degrade(self.muxer, &video_path, &audio_path, &output).await;
                if let Some(warning) = outcome.warning {
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                outcome.path
            }
        };

        let path = self.into_mp4(path, &mut warnings, scratch).await;
        Ok((path, warnings))
    }

    /// Rewraps a video that did not arrive as mp4. The original is kept if that fails.
    async fn into_mp4(
        &self,
        path: PathBuf,
        warnings: &mut Vec<String>,
        scratch: &mut Vec<PathBuf>,
    ) -> PathBuf {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if extension == "mp4" {
            return path;
        }

        let output = self.scratch_path("remuxed", "mp4", scratch);
        self.reporter.stage("Converting to mp4");

        match self.muxer.remux(&path, &output).await {
            Ok(()) => {
                file_system::remove_temp_file(&path).await;
                output
            }
            Err(e) => {
                let warning = format!(
                    "could not convert the video to mp4 ({}), it was saved as {}",
                    e, extension
                );
                warn!("{}", warning);
                warnings.push(warning);
                file_system::remove_temp_file(&output).await;
                path
            }
        }
    }

    async fn download_audio(
        &self,
        video: &VideoInfo,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<(PathBuf, Vec<String>)> {
        let catalog = Catalog::from_streams(&video.streams, None);
        let stream = select_audio(&catalog)?;
        let mut warnings = Vec::new();

        let downloaded = self
            .retrieve(StreamRole::Audio, &stream, "audio", scratch)
            .await?;

        if self.options.transcode {
            let output = self.scratch_path("audio", "mp3", scratch);
            self.reporter
                .stage(&format!("Converting to mp3 at {}kbps", self.options.bitrate));

            match self
                .muxer
                .transcode_audio(&downloaded, &output, self.options.bitrate)
                .await
            {
                Ok(()) => {
                    file_system::remove_temp_file(&downloaded).await;
                    return Ok((output, warnings));
                }
                Err(e) => {
                    let warning = format!(
                        "could not convert the audio to mp3 ({}), the original {} stream was saved with an .mp3 name",
                        e, stream.container
                    );
                    warn!("{}", warning);
                    warnings.push(warning);
                    file_system::remove_temp_file(&output).await;
                }
            }
        }

        let renamed = downloaded.with_extension("mp3");
        scratch.push(renamed.clone());
        tokio::fs::rename(&downloaded, &renamed).await?;

        Ok((renamed, warnings))
    }

    async fn retrieve(
        &self,
        role: StreamRole,
        stream: &StreamDescriptor,
        prefix: &str,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<PathBuf> {
        let path = self.scratch_path(prefix, &stream.container, scratch);
        info!("Downloading {} stream {}", role, stream.display_label());

        let sink = self.reporter.stream_started(role, stream);
        let written = self.extractor.retrieve(stream, &path, sink.as_ref()).await?;
        debug!("Wrote {} bytes to {}", written, path.display());

        Ok(path)
    }

    fn scratch_path(&self, prefix: &str, extension: &str, scratch: &mut Vec<PathBuf>) -> PathBuf {
        let path = file_system::scratch_path(&self.options.scratch_dir, prefix, extension);
        scratch.push(path.clone());
        path
    }
}

fn selection_warnings(selected: &SelectedStreams) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(requested) = selected.substituted_for {
        warnings.push(format!(
            "{} is not available, downloaded {} instead",
            requested,
            selected.selection.primary().label()
        ));
    }
    if selected.audio_missing {
        warnings.push("no audio stream is available, the video has no sound".to_string());
    }

    warnings
}

/// The MIME type of a delivered file.
pub fn mime_for(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}
