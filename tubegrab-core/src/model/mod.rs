//! The models used to represent a video and its available streams.
//!
//! Raw `yt-dlp` output is mapped into these types by the [`raw`] module, reduced into a
//! choice list by [`catalog`] and turned into concrete streams by [`selector`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub mod catalog;
pub mod raw;
pub mod selector;

pub use catalog::Catalog;
pub use selector::{FallbackPolicy, SelectedStreams, Selection};

/// A quality level, either a video resolution (`1080p`) or an audio bitrate (`128kbps`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Video height in pixels.
    Resolution(u32),
    /// Audio bitrate in kbps.
    Bitrate(u32),
}

impl Quality {
    /// The numeric value used for ordering: pixels for video, kbps for audio.
    pub fn rank(&self) -> u32 {
        match self {
            Quality::Resolution(height) => *height,
            Quality::Bitrate(kbps) => *kbps,
        }
    }

    /// Compares two qualities, resolutions always ranking above bitrates.
    pub fn compare(&self, other: &Quality) -> Ordering {
        match (self, other) {
            (Quality::Resolution(a), Quality::Resolution(b)) => a.cmp(b),
            (Quality::Bitrate(a), Quality::Bitrate(b)) => a.cmp(b),
            (Quality::Resolution(_), Quality::Bitrate(_)) => Ordering::Greater,
            (Quality::Bitrate(_), Quality::Resolution(_)) => Ordering::Less,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Resolution(height) => write!(f, "{}p", height),
            Quality::Bitrate(kbps) => write!(f, "{}kbps", kbps),
        }
    }
}

impl FromStr for Quality {
    type Err = Error;

    /// Accepts `1080p`, `1080`, `128kbps` and `128k`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        let invalid = || Error::Quality(s.to_string());

        if let Some(kbps) = label
            .strip_suffix("kbps")
            .or_else(|| label.strip_suffix('k'))
        {
            return kbps
                .trim()
                .parse()
                .map(Quality::Bitrate)
                .map_err(|_| invalid());
        }

        label
            .strip_suffix('p')
            .unwrap_or(&label)
            .parse()
            .map(Quality::Resolution)
            .map_err(|_| invalid())
    }
}

/// What a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Video with embedded audio.
    Progressive,
    /// Video only, needs a separate audio stream and a merge.
    VideoOnly,
    /// Audio only.
    AudioOnly,
}

/// The opaque handle used to request the bytes of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSource {
    /// The `yt-dlp` format id (itag for YouTube).
    pub format_id: String,
    /// The direct HTTP URL of the stream.
    pub url: Option<String>,
    /// Headers `yt-dlp` expects to be sent with the request.
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
    /// The exact size in bytes, when the extractor knows it.
    pub exact_size: Option<u64>,
}

/// One available stream of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// The quality level, `None` when the extractor reported neither height nor bitrate.
    pub quality: Option<Quality>,
    /// The container extension, e.g. `mp4`, `webm`, `m4a`.
    pub container: String,
    /// What the stream carries.
    pub kind: StreamKind,
    /// Frames per second, for video streams.
    pub fps: Option<u32>,
    /// Exact or approximate size in bytes.
    pub approximate_size: Option<u64>,
    /// The handle used to retrieve the bytes.
    pub source: StreamSource,
}

impl StreamDescriptor {
    /// Whether the stream already contains the audio track.
    pub fn has_embedded_audio(&self) -> bool {
        self.kind == StreamKind::Progressive
    }

    /// Whether the stream contains a video track.
    pub fn has_video(&self) -> bool {
        self.kind != StreamKind::AudioOnly
    }

    /// The quality label, e.g. `1080p`, or `unknown`.
    pub fn label(&self) -> String {
        self.quality
            .map(|quality| quality.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// A display line such as `1080p (~12.3 MB)`.
    pub fn display_label(&self) -> String {
        match self.approximate_size {
            Some(size) if size > 0 => {
                format!("{} (~{:.1} MB)", self.label(), size as f64 / (1024.0 * 1024.0))
            }
            _ => self.label(),
        }
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream(format = {}, quality = {}, container = {}, kind = {:?})",
            self.source.format_id,
            self.label(),
            self.container,
            self.kind
        )
    }
}

/// A video and the streams the extractor reported for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// The 11 character video id.
    pub id: String,
    /// The title of the video.
    pub title: String,
    /// The channel display name.
    pub channel: String,
    /// The duration in seconds.
    pub duration: Option<u64>,
    /// The number of views.
    pub view_count: Option<u64>,
    /// The thumbnail URL.
    pub thumbnail: Option<String>,
    /// Every stream the extractor reported, unfiltered.
    pub streams: Vec<StreamDescriptor>,
}

impl VideoInfo {
    /// Formats the duration as `M min S s`.
    pub fn display_duration(&self) -> Option<String> {
        self.duration
            .map(|seconds| format!("{} min {} s", seconds / 60, seconds % 60))
    }
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Video(id = {}, title = \"{}\", channel = \"{}\", streams = {})",
            self.id,
            self.title,
            self.channel,
            self.streams.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quality_labels() {
        assert_eq!("1080p".parse::<Quality>().unwrap(), Quality::Resolution(1080));
        assert_eq!("720".parse::<Quality>().unwrap(), Quality::Resolution(720));
        assert_eq!("128kbps".parse::<Quality>().unwrap(), Quality::Bitrate(128));
        assert_eq!("192K".parse::<Quality>().unwrap(), Quality::Bitrate(192));
        assert!(matches!("best".parse::<Quality>(), Err(Error::Quality(_))));
        assert!("p".parse::<Quality>().is_err());
    }

    #[test]
    fn test_quality_display_roundtrip() {
        for label in ["2160p", "360p", "160kbps"] {
            assert_eq!(label.parse::<Quality>().unwrap().to_string(), label);
        }
    }

    #[test]
    fn test_quality_compare() {
        assert_eq!(
            Quality::Resolution(1080).compare(&Quality::Resolution(720)),
            Ordering::Greater
        );
        assert_eq!(
            Quality::Bitrate(128).compare(&Quality::Resolution(144)),
            Ordering::Less
        );
    }

    #[test]
    fn test_display_duration() {
        let info = VideoInfo {
            id: "dQw4w9WgXcQ".to_string(),
            title: "t".to_string(),
            channel: "c".to_string(),
            duration: Some(213),
            view_count: None,
            thumbnail: None,
            streams: Vec::new(),
        };
        assert_eq!(info.display_duration().as_deref(), Some("3 min 33 s"));
    }
}
