use {
    regex::Regex,
    std::sync::LazyLock,
    tubegrab_core::{Error, Result},
};

static YOUTUBE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(https?://)?(www\.|m\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|shorts/|.+\?v=)?([^&=%?/]{11})",
    )
    .expect("the YouTube URL pattern is valid")
});

/// Checks that `url` points at a single YouTube video and returns its 11 character id.
///
/// Surrounding whitespace is ignored.
pub fn validate_url(url: &str) -> Result<String> {
    YOUTUBE_PATTERN
        .captures(url.trim())
        .and_then(|captures| captures.get(6))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| Error::InvalidUrl(url.trim().to_string()))
}

/// Whether `url` is a recognised YouTube video URL.
pub fn is_valid_youtube_url(url: &str) -> bool {
    validate_url(url).is_ok()
}
