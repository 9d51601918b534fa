//! Tools for working with the file system.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use uuid::Uuid;

/// Creates (or truncates) a file at the given destination.
///
/// # Arguments
///
/// * `destination` - The path to create the file at.
pub async fn create_file(destination: impl AsRef<Path>) -> Result<File> {
    let mut open_options = OpenOptions::new();
    open_options.write(true);
    open_options.create(true);
    open_options.truncate(true);

    #[cfg(unix)]
    {
        open_options.mode(0o644);
    }

    let file = open_options.open(destination).await?;
    Ok(file)
}

/// Creates the parent directory of the given destination.
/// If the parent directory already exists, nothing is done.
///
/// # Arguments
///
/// * `destination` - The path to create the parent directory for.
pub fn create_parent_dir(destination: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = destination.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}

/// Generates a random filename with the specified length.
///
/// # Arguments
///
/// * `length` - The length of the random string to generate.
pub fn random_filename(length: usize) -> String {
    let uuid = Uuid::new_v4().to_string().replace('-', "");

    uuid.chars().take(length).collect()
}

/// Builds a unique scratch path such as `video_3fa94c1e.mp4` inside `dir`.
pub fn scratch_path(dir: impl AsRef<Path>, prefix: &str, extension: &str) -> PathBuf {
    dir.as_ref()
        .join(format!("{}_{}.{}", prefix, random_filename(8), extension))
}

/// Strips every character outside `[alphanumeric, ' ', '-', '_', '.']` and trims trailing
/// whitespace, so the result can be used as a single path component.
///
/// # Examples
///
/// ```rust
/// # use tubegrab_core::utils::file_system::sanitize_filename;
/// assert_eq!(sanitize_filename("Foo: Bar? <Baz>.mp4"), "Foo Bar Baz.mp4");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Returns `{sanitized title}.{extension}`.
///
/// Titles that sanitize to nothing usable (empty, or only dots) use `fallback` instead.
pub fn output_file_name(title: &str, fallback: &str, extension: &str) -> String {
    let mut stem = sanitize_filename(title);
    if stem.chars().all(|c| c == '.' || c.is_whitespace()) {
        stem = sanitize_filename(fallback);
    }
    if stem.is_empty() {
        stem = "download".to_string();
    }

    format!("{}.{}", stem, extension)
}

/// Moves a file, falling back to copy and delete when a rename is not possible
/// (e.g. the scratch directory lives on another file system).
pub async fn move_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    create_parent_dir(to.as_ref())?;

    if tokio::fs::rename(from.as_ref(), to.as_ref()).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(from.as_ref(), to.as_ref()).await?;
    remove_temp_file(from.as_ref()).await;
    Ok(())
}

/// Removes a temporary file and logs any errors.
/// Does not propagate errors to avoid interrupting the execution flow.
///
/// # Returns
///
/// `true` if the file was successfully deleted, `false` otherwise
pub async fn remove_temp_file(file_path: impl AsRef<Path> + std::fmt::Debug) -> bool {
    let result = tokio::fs::remove_file(&file_path).await;

    #[cfg(feature = "tracing")]
    if let Err(ref e) = result {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove temporary file {:?}: {}", file_path, e);
        }
    }

    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_filename("Foo: Bar? <Baz>.mp4"), "Foo Bar Baz.mp4");
        assert_eq!(sanitize_filename("a/b\\c|d*e\"f"), "abcdef");
    }

    #[test]
    fn test_sanitize_trims_trailing_whitespace_only() {
        assert_eq!(sanitize_filename("  Lead and trail ?  "), "  Lead and trail");
    }

    #[test]
    fn test_sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize_filename("Lagu Indonesia – Ceria!"), "Lagu Indonesia  Ceria");
        assert_eq!(sanitize_filename("日本語 タイトル"), "日本語 タイトル");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("Rick Astley - Never Gonna Give You Up (Official)", "dQw4w9WgXcQ", "mp4"),
            "Rick Astley - Never Gonna Give You Up Official.mp4"
        );
    }

    #[test]
    fn test_output_file_name_falls_back_to_id() {
        assert_eq!(output_file_name("???", "dQw4w9WgXcQ", "mp3"), "dQw4w9WgXcQ.mp3");
        assert_eq!(output_file_name("..", "dQw4w9WgXcQ", "mp4"), "dQw4w9WgXcQ.mp4");
        assert_eq!(output_file_name("", "", "mp4"), "download.mp4");
    }

    #[test]
    fn test_scratch_path_is_unique() {
        let first = scratch_path("/tmp", "video", "mp4");
        let second = scratch_path("/tmp", "video", "mp4");
        assert_ne!(first, second);

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("video_"));
        assert!(name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_move_file() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("a.bin");
        let to = temp.path().join("nested").join("b.bin");
        tokio::fs::write(&from, b"payload").await.unwrap();

        move_file(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(tokio::fs::read(&to).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_remove_temp_file_missing_is_swallowed() {
        let temp = TempDir::new().unwrap();
        assert!(!remove_temp_file(temp.path().join("missing")).await);
    }
}
