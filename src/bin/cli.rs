use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{LevelFilter, debug, error};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tubegrab::config::{AUDIO_BITRATES, Config};
use tubegrab::download::Downloader;
use tubegrab::progress::{Reporter, StreamRole};
use tubegrab::{DownloadOptions, MediaKind};
use tubegrab_core::{Catalog, FallbackPolicy, ProgressSink, Quality, StreamDescriptor, VideoInfo};

#[derive(Parser, Clone)]
#[command(version, about = "Download a YouTube video as mp4, or its audio as mp3")]
pub struct Cli {
    pub url: String,

    /// Download the audio track only, as mp3.
    #[arg(long = "audio", action = clap::ArgAction::SetTrue)]
    pub audio: bool,

    /// The resolution to download, e.g. 1080p. The best available when omitted.
    #[arg(long = "quality", short, value_parser = parse_resolution)]
    pub quality: Option<Quality>,

    #[arg(
        long = "bitrate",
        short,
        value_parser = clap::builder::PossibleValuesParser::new(["128k", "192k", "256k", "320k"])
    )]
    pub bitrate: Option<String>,

    #[arg(long = "output-dir", short)]
    pub output_dir: Option<PathBuf>,

    /// What to do when the requested resolution is not offered: strict or best.
    #[arg(long = "fallback")]
    pub fallback: Option<FallbackPolicy>,

    /// Print the available qualities and exit.
    #[arg(long = "list", action = clap::ArgAction::SetTrue)]
    pub list: bool,

    #[arg(long = "yt-dlp")]
    pub yt_dlp: Option<PathBuf>,

    #[arg(long = "ffmpeg")]
    pub ffmpeg: Option<PathBuf>,

    #[arg(
        long = "verbosity",
        short,
        default_value = "info",
        value_parser = clap::builder::PossibleValuesParser::new([
            "info", "debug", "error", "none", "full"
        ])
    )]
    pub verbosity: String,
}

impl Cli {
    /// Builds the download options, flags taking precedence over the config file.
    fn options(&self, config: &Config) -> DownloadOptions {
        let mut options = DownloadOptions::from_config(self.url.clone(), config);

        if self.audio {
            options.kind = MediaKind::Audio;
        }
        options.quality = self.quality;
        if let Some(kbps) = self
            .bitrate
            .as_deref()
            .and_then(|b| b.trim_end_matches('k').parse().ok())
        {
            options.bitrate = kbps;
        }
        if let Some(dir) = &self.output_dir {
            options.output_dir = dir.clone();
        }
        if let Some(fallback) = self.fallback {
            options.fallback = fallback;
        }
        if self.yt_dlp.is_some() {
            options.yt_dlp = self.yt_dlp.clone();
        }
        if self.ffmpeg.is_some() {
            options.ffmpeg = self.ffmpeg.clone();
        }

        options
    }
}

fn parse_resolution(label: &str) -> Result<Quality, String> {
    match label.parse::<Quality>() {
        Ok(quality @ Quality::Resolution(_)) => Ok(quality),
        Ok(Quality::Bitrate(_)) => Err("use --bitrate for audio quality".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn level_filter(verbosity: &str) -> LevelFilter {
    match verbosity {
        "none" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "debug" => LevelFilter::Debug,
        "full" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn init_logging(
    multi: &MultiProgress,
    verbosity: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = level_filter(verbosity);
    let logger = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .build();

    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(level);
    Ok(())
}

/// Draws spinners for the steps and one bar per retrieved stream.
struct IndicatifReporter {
    multi: MultiProgress,
    spinner: Mutex<Option<ProgressBar>>,
    bars: Mutex<Vec<ProgressBar>>,
}

struct BarSink(ProgressBar);

impl ProgressSink for BarSink {
    fn on_progress(&self, downloaded: u64, total: u64) {
        if total > 0 {
            self.0.set_length(total);
        }
        self.0.set_position(downloaded);
    }
}

impl IndicatifReporter {
    fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            spinner: Mutex::new(None),
            bars: Mutex::new(Vec::new()),
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
        }
    }

    fn spin(&self, message: String) {
        self.stop_spinner();

        let spinner = self.multi.add(ProgressBar::new_spinner());
        spinner.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message);

        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }
}

impl Reporter for IndicatifReporter {
    fn extraction_attempt(&self, attempt: u32, max: u32) {
        self.spin(format!("Fetching video information ({attempt}/{max})"));
    }

    fn stream_started(&self, role: StreamRole, stream: &StreamDescriptor) -> Box<dyn ProgressSink> {
        self.stop_spinner();

        let bar = self
            .multi
            .add(ProgressBar::new(stream.approximate_size.unwrap_or(0)));
        if let Ok(style) = ProgressStyle::with_template(
            "{msg:>14} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(format!("{} {}", role, stream.label()));

        if let Ok(mut bars) = self.bars.lock() {
            bars.push(bar.clone());
        }
        Box::new(BarSink(bar))
    }

    fn stage(&self, message: &str) {
        self.spin(message.to_string());
    }

    fn finished(&self) {
        self.stop_spinner();
        if let Ok(mut bars) = self.bars.lock() {
            for bar in bars.drain(..) {
                bar.finish();
            }
        }
    }
}

fn print_info(video: &VideoInfo) {
    println!("{}", video.title);
    if !video.channel.is_empty() {
        println!("  channel:  {}", video.channel);
    }
    if let Some(duration) = video.display_duration() {
        println!("  duration: {}", duration);
    }
    if let Some(views) = video.view_count {
        println!("  views:    {}", views);
    }
}

fn print_catalog(catalog: &Catalog, unfiltered: bool) {
    if unfiltered {
        println!("Video (no streams in the preferred container, showing all):");
    } else {
        println!("Video:");
    }
    for stream in &catalog.video {
        if stream.has_embedded_audio() {
            println!("  {}", stream.display_label());
        } else {
            println!("  {} requires merge", stream.display_label());
        }
    }

    println!(
        "Audio (converted to mp3 at {} kbps):",
        AUDIO_BITRATES
            .iter()
            .map(|kbps| kbps.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for stream in &catalog.audio {
        println!("  {} ({})", stream.display_label(), stream.container);
    }
}

async fn run(args: Cli, multi: MultiProgress) -> tubegrab_core::Result<()> {
    let config = Config::load();
    let options = args.options(&config);
    debug!("Output directory: {}", options.output_dir.display());

    let youtube = options.youtube()?;
    let muxer = youtube.muxer();
    let reporter = IndicatifReporter::new(multi);
    let downloader = Downloader::new(&youtube, &muxer, &reporter, &options);

    let video = downloader.fetch_info().await;
    reporter.finished();
    let video = video?;
    print_info(&video);

    if args.list {
        let (catalog, unfiltered) = downloader.catalog(&video);
        print_catalog(&catalog, unfiltered);
        return Ok(());
    }

    let outcome = downloader.download(&video).await?;
    println!(
        "Saved {} ({}) to {}",
        outcome.file_name,
        outcome.mime,
        options.output_dir.display()
    );
    for warning in &outcome.warnings {
        println!("warning: {}", warning);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Cli::parse();
    let multi = MultiProgress::new();
    init_logging(&multi, &args.verbosity)?;

    if let Err(e) = run(args, multi).await {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = Config::parse("fallback = \"best\"\n[audio]\ndefault_bitrate = 128").unwrap();
        let cli = Cli::parse_from([
            "tubegrab",
            "https://youtu.be/dQw4w9WgXcQ",
            "--audio",
            "-b",
            "320k",
            "--fallback",
            "strict",
            "-o",
            "/tmp/music",
        ]);

        let options = cli.options(&config);
        assert_eq!(options.kind, MediaKind::Audio);
        assert_eq!(options.bitrate, 320);
        assert_eq!(options.fallback, FallbackPolicy::Strict);
        assert_eq!(options.output_dir, PathBuf::from("/tmp/music"));
    }

    #[test]
    fn test_config_used_without_flags() {
        let config = Config::parse("fallback = \"best\"\n[audio]\ndefault_bitrate = 128").unwrap();
        let cli = Cli::parse_from(["tubegrab", "https://youtu.be/dQw4w9WgXcQ", "-q", "720p"]);

        let options = cli.options(&config);
        assert_eq!(options.kind, MediaKind::Video);
        assert_eq!(options.quality, Some(Quality::Resolution(720)));
        assert_eq!(options.bitrate, 128);
        assert_eq!(options.fallback, FallbackPolicy::Best);
    }

    #[test]
    fn test_quality_flag_rejects_bitrates() {
        assert!(parse_resolution("1080p").is_ok());
        assert!(parse_resolution("128kbps").is_err());
        assert!(parse_resolution("hd").is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_filter("none"), LevelFilter::Off);
        assert_eq!(level_filter("full"), LevelFilter::Trace);
        assert_eq!(level_filter("info"), LevelFilter::Info);
    }
}
