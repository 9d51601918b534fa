//! The subset of `yt-dlp --dump-json` output the engine reads, and its mapping into
//! [`VideoInfo`] and [`StreamDescriptor`].

use serde::Deserialize;
use std::collections::HashMap;

use crate::model::{Quality, StreamDescriptor, StreamKind, StreamSource, VideoInfo};

/// A video as printed by `yt-dlp --dump-json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVideo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// One entry of the `formats` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    pub ext: String,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

fn is_present(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .is_some_and(|codec| !codec.is_empty() && codec != "none")
}

impl RawFormat {
    /// The stream kind, `None` for entries carrying neither audio nor video (storyboards).
    pub fn kind(&self) -> Option<StreamKind> {
        let has_video = is_present(&self.vcodec) || (self.vcodec.is_none() && self.height.is_some());
        let has_audio = is_present(&self.acodec);

        match (has_video, has_audio) {
            (true, true) => Some(StreamKind::Progressive),
            (true, false) => Some(StreamKind::VideoOnly),
            (false, true) => Some(StreamKind::AudioOnly),
            (false, false) => None,
        }
    }

    /// Only plain HTTP(S) streams can be retrieved with a single request sequence;
    /// manifest based protocols (HLS, DASH segments) are skipped.
    pub fn is_direct_http(&self) -> bool {
        match self.protocol.as_deref() {
            None => true,
            Some(protocol) => protocol == "https" || protocol == "http",
        }
    }

    /// Maps the entry into a descriptor, skipping storyboards and non HTTP streams.
    pub fn into_descriptor(self) -> Option<StreamDescriptor> {
        let kind = self.kind()?;
        if !self.is_direct_http() {
            return None;
        }

        let quality = match kind {
            StreamKind::AudioOnly => self
                .abr
                .filter(|abr| *abr > 0.0)
                .map(|abr| Quality::Bitrate(abr.round() as u32)),
            _ => self.height.filter(|h| *h > 0).map(Quality::Resolution),
        };

        Some(StreamDescriptor {
            quality,
            container: self.ext,
            kind,
            fps: self.fps.map(|fps| fps.round() as u32),
            approximate_size: self.filesize.or(self.filesize_approx),
            source: StreamSource {
                format_id: self.format_id,
                url: self.url,
                http_headers: self.http_headers,
                exact_size: self.filesize,
            },
        })
    }
}

impl From<RawVideo> for VideoInfo {
    fn from(raw: RawVideo) -> Self {
        let channel = raw.channel.or(raw.uploader).unwrap_or_default();

        VideoInfo {
            id: raw.id,
            title: raw.title,
            channel,
            duration: raw.duration.map(|d| d.max(0.0).round() as u64),
            view_count: raw.view_count,
            thumbnail: raw.thumbnail,
            streams: raw
                .formats
                .into_iter()
                .filter_map(RawFormat::into_descriptor)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Never Gonna Give You Up",
        "uploader": "Rick Astley",
        "duration": 212.0,
        "view_count": 1500000000,
        "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none", "protocol": "mhtml"},
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.478,
             "filesize": 3433514, "url": "https://example.invalid/140", "protocol": "https",
             "http_headers": {"User-Agent": "Mozilla/5.0"}},
            {"format_id": "18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360,
             "fps": 25, "filesize_approx": 8000000, "url": "https://example.invalid/18", "protocol": "https"},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080,
             "fps": 25, "filesize": 80000000, "url": "https://example.invalid/137", "protocol": "https"},
            {"format_id": "96", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "mp4a.40.2", "height": 1080,
             "protocol": "m3u8_native", "url": "https://example.invalid/96.m3u8"}
        ]
    }"#;

    #[test]
    fn test_parse_dump() {
        let raw: RawVideo = serde_json::from_str(DUMP).unwrap();
        let info = VideoInfo::from(raw);

        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.channel, "Rick Astley");
        assert_eq!(info.duration, Some(212));
        // storyboard and HLS entries are skipped
        assert_eq!(info.streams.len(), 3);
    }

    #[test]
    fn test_stream_kinds_and_quality() {
        let raw: RawVideo = serde_json::from_str(DUMP).unwrap();
        let info = VideoInfo::from(raw);

        let audio = &info.streams[0];
        assert_eq!(audio.kind, StreamKind::AudioOnly);
        assert_eq!(audio.quality, Some(Quality::Bitrate(129)));
        assert_eq!(audio.source.http_headers.get("User-Agent").unwrap(), "Mozilla/5.0");
        assert_eq!(audio.source.exact_size, Some(3433514));

        let progressive = &info.streams[1];
        assert!(progressive.has_embedded_audio());
        assert_eq!(progressive.quality, Some(Quality::Resolution(360)));
        assert_eq!(progressive.approximate_size, Some(8000000));
        assert_eq!(progressive.source.exact_size, None);

        let video_only = &info.streams[2];
        assert_eq!(video_only.kind, StreamKind::VideoOnly);
        assert_eq!(video_only.fps, Some(25));
    }

    #[test]
    fn test_missing_height_yields_no_quality() {
        let raw: RawFormat = serde_json::from_str(
            r#"{"format_id": "x", "ext": "mp4", "vcodec": "vp9", "acodec": "none"}"#,
        )
        .unwrap();
        let descriptor = raw.into_descriptor().unwrap();
        assert_eq!(descriptor.quality, None);
        assert_eq!(descriptor.label(), "unknown");
    }
}
