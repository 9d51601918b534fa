//! Reduces the raw stream list of a video into one entry per quality level.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{Quality, StreamDescriptor, StreamKind};

/// The reduced choice lists of a video: one entry per resolution and one per audio bitrate,
/// both sorted by quality descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Streams with a video track, progressive preferred at each resolution.
    pub video: Vec<StreamDescriptor>,
    /// Audio only streams.
    pub audio: Vec<StreamDescriptor>,
}

impl Catalog {
    /// Builds the catalog from every stream of a video.
    ///
    /// # Arguments
    ///
    /// * `streams` - The streams reported by the extractor.
    /// * `container` - When set, only video streams in this container are listed.
    pub fn from_streams(streams: &[StreamDescriptor], container: Option<&str>) -> Self {
        let video = reduce_video_streams(
            streams
                .iter()
                .filter(|stream| container.is_none_or(|c| stream.container.eq_ignore_ascii_case(c)))
                .cloned(),
        );
        let audio = reduce_audio_streams(streams.iter().cloned());

        Self { video, audio }
    }

    /// Whether no video stream is listed.
    pub fn is_empty(&self) -> bool {
        self.video.is_empty()
    }

    /// The highest quality audio stream.
    pub fn best_audio(&self) -> Option<&StreamDescriptor> {
        self.audio.first()
    }
}

/// Keeps one stream per resolution, the one with embedded audio when there is one,
/// otherwise the first seen. Audio only streams and streams without a height are discarded.
pub fn reduce_video_streams(
    candidates: impl IntoIterator<Item = StreamDescriptor>,
) -> Vec<StreamDescriptor> {
    reduce_by_quality(candidates.into_iter().filter(|stream| {
        stream.kind != StreamKind::AudioOnly
            && matches!(stream.quality, Some(Quality::Resolution(_)))
    }))
}

/// Keeps one audio only stream per bitrate, first seen wins.
pub fn reduce_audio_streams(
    candidates: impl IntoIterator<Item = StreamDescriptor>,
) -> Vec<StreamDescriptor> {
    reduce_by_quality(candidates.into_iter().filter(|stream| {
        stream.kind == StreamKind::AudioOnly && matches!(stream.quality, Some(Quality::Bitrate(_)))
    }))
}

fn reduce_by_quality(candidates: impl Iterator<Item = StreamDescriptor>) -> Vec<StreamDescriptor> {
    let mut reduced: Vec<StreamDescriptor> = Vec::new();
    let mut slots: HashMap<Quality, usize> = HashMap::new();

    for candidate in candidates {
        let Some(quality) = candidate.quality else {
            continue;
        };

        match slots.get(&quality) {
            Some(&index) => {
                if !reduced[index].has_embedded_audio() && candidate.has_embedded_audio() {
                    reduced[index] = candidate;
                }
            }
            None => {
                slots.insert(quality, reduced.len());
                reduced.push(candidate);
            }
        }
    }

    // stable: equal qualities keep their first-seen order
    reduced.sort_by(|a, b| compare_quality(b, a));
    reduced
}

fn compare_quality(a: &StreamDescriptor, b: &StreamDescriptor) -> Ordering {
    match (a.quality, b.quality) {
        (Some(a), Some(b)) => a.compare(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
