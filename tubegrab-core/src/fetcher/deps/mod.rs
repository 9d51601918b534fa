//! Locating the external executables the engine drives.

use crate::error::{Error, Result};
use crate::utils;
use std::path::{Path, PathBuf};

/// The executables used by the engine.
///
/// # Examples
///
/// ```rust,no_run
/// # use tubegrab_core::fetcher::deps::Libraries;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // explicit paths are checked, missing ones are looked up on PATH
/// let libraries = Libraries::resolve(None, Some("/opt/ffmpeg/bin/ffmpeg".into()))?;
/// println!("yt-dlp: {}", libraries.youtube.display());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Libraries {
    /// The path to the yt-dlp binary.
    pub youtube: PathBuf,
    /// The path to the ffmpeg binary.
    pub ffmpeg: PathBuf,
}

impl Libraries {
    /// Creates the libraries from known paths, without checking them.
    pub fn new(youtube: PathBuf, ffmpeg: PathBuf) -> Self {
        Self { youtube, ffmpeg }
    }

    /// Resolves both executables, preferring the given paths over a PATH lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Binary`] naming the first executable that cannot be found.
    pub fn resolve(youtube: Option<PathBuf>, ffmpeg: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            youtube: locate("yt-dlp", youtube)?,
            ffmpeg: locate("ffmpeg", ffmpeg)?,
        })
    }
}

/// Locates an executable: the configured path when it exists, otherwise `name` on PATH.
///
/// # Errors
///
/// Returns [`Error::Binary`] when the configured path does not exist or `name` is not on PATH.
pub fn locate(name: &str, configured: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = configured {
        return if is_file(&path) {
            Ok(path)
        } else {
            Err(Error::Binary(format!(
                "{} was configured at {} but no such file exists",
                name,
                path.display()
            )))
        };
    }

    let path = which::which(utils::find_executable(name))
        .map_err(|e| Error::Binary(format!("{} is not installed or not on PATH ({})", name, e)))?;

    #[cfg(feature = "tracing")]
    tracing::debug!("Resolved {} to {}", name, path.display());

    Ok(path)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_configured_path_is_used() {
        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("yt-dlp");
        std::fs::write(&fake, b"#!/bin/sh\n").unwrap();

        assert_eq!(locate("yt-dlp", Some(fake.clone())).unwrap(), fake);
    }

    #[test]
    fn test_missing_configured_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("ffmpeg");

        assert!(matches!(locate("ffmpeg", Some(missing)), Err(Error::Binary(_))));
    }

    #[test]
    fn test_unknown_executable_on_path() {
        assert!(matches!(
            locate("tubegrab-no-such-tool", None),
            Err(Error::Binary(_))
        ));
    }
}
