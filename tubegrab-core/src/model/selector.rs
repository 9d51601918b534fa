//! Maps a requested quality onto concrete streams of a [`Catalog`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::{Catalog, Quality, StreamDescriptor};

/// What happens when the requested resolution is not in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Fail with [`Error::FormatUnavailable`].
    #[default]
    Strict,
    /// Use the best available stream and flag the substitution.
    #[serde(alias = "best-available")]
    Best,
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Strict => write!(f, "strict"),
            FallbackPolicy::Best => write!(f, "best"),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FallbackPolicy::Strict),
            "best" | "best-available" => Ok(FallbackPolicy::Best),
            other => Err(format!("unknown fallback policy `{other}`")),
        }
    }
}

/// The streams to retrieve for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A stream that needs no merge: progressive video, or audio only.
    Single(StreamDescriptor),
    /// A video only stream and the audio stream to merge into it.
    Merge {
        video: StreamDescriptor,
        audio: StreamDescriptor,
    },
}

impl Selection {
    /// The stream carrying the picture, or the audio stream for audio requests.
    pub fn primary(&self) -> &StreamDescriptor {
        match self {
            Selection::Single(stream) => stream,
            Selection::Merge { video, .. } => video,
        }
    }

    /// Whether a merge step is needed.
    pub fn needs_merge(&self) -> bool {
        matches!(self, Selection::Merge { .. })
    }
}

/// A [`Selection`] plus what the caller has to tell the user about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedStreams {
    pub selection: Selection,
    /// Set when the requested quality was missing and the best stream was used instead.
    pub substituted_for: Option<Quality>,
    /// Set when the chosen video has no audio and no audio stream exists to merge.
    pub audio_missing: bool,
}

/// Picks the video stream(s) for a requested quality.
///
/// In order, first match wins:
/// 1. No quality requested: the best progressive stream, else the best video only stream.
/// 2. The exact quality, progressive preferred (the catalog already keeps it).
/// 3. Otherwise [`FallbackPolicy::Strict`] fails and [`FallbackPolicy::Best`] applies rule 1
///    and records the substitution.
///
/// # Errors
///
/// Returns [`Error::FormatUnavailable`] when the catalog is empty, or when the quality is
/// missing under [`FallbackPolicy::Strict`].
pub fn select_video(
    catalog: &Catalog,
    requested: Option<Quality>,
    policy: FallbackPolicy,
) -> Result<SelectedStreams> {
    #[cfg(feature = "tracing")]
    tracing::trace!(
        "Selecting video streams for {:?} with {} policy",
        requested,
        policy
    );

    if catalog.video.is_empty() {
        return Err(Error::FormatUnavailable(
            "no video streams are available".to_string(),
        ));
    }

    let Some(quality) = requested else {
        return Ok(with_audio(catalog, best_video(catalog)?, None));
    };

    if let Some(stream) = catalog.video.iter().find(|s| s.quality == Some(quality)) {
        return Ok(with_audio(catalog, stream, None));
    }

    match policy {
        FallbackPolicy::Strict => Err(Error::FormatUnavailable(format!(
            "{} is not offered for this video (available: {})",
            quality,
            catalog
                .video
                .iter()
                .map(|s| s.label())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        FallbackPolicy::Best => {
            #[cfg(feature = "tracing")]
            tracing::debug!("{} is not offered, falling back to the best stream", quality);

            Ok(with_audio(catalog, best_video(catalog)?, Some(quality)))
        }
    }
}

/// Picks the audio stream for an audio request.
///
/// The target bitrate never filters sources, the best stream is always used and the target is
/// applied when transcoding.
///
/// # Errors
///
/// Returns [`Error::FormatUnavailable`] when the video has no audio stream.
pub fn select_audio(catalog: &Catalog) -> Result<StreamDescriptor> {
    catalog
        .best_audio()
        .cloned()
        .ok_or_else(|| Error::FormatUnavailable("no audio streams are available".to_string()))
}

fn best_video(catalog: &Catalog) -> Result<&StreamDescriptor> {
    catalog
        .video
        .iter()
        .find(|s| s.has_embedded_audio())
        .or_else(|| catalog.video.first())
        .ok_or_else(|| Error::FormatUnavailable("no video streams are available".to_string()))
}

fn with_audio(
    catalog: &Catalog,
    video: &StreamDescriptor,
    substituted_for: Option<Quality>,
) -> SelectedStreams {
    if video.has_embedded_audio() {
        return SelectedStreams {
            selection: Selection::Single(video.clone()),
            substituted_for,
            audio_missing: false,
        };
    }

    match catalog.best_audio() {
        Some(audio) => SelectedStreams {
            selection: Selection::Merge {
                video: video.clone(),
                audio: audio.clone(),
            },
            substituted_for,
            audio_missing: false,
        },
        None => SelectedStreams {
            selection: Selection::Single(video.clone()),
            substituted_for,
            audio_missing: true,
        },
    }
}
