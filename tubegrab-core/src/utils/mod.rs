//! Small helpers shared by the engine modules.

pub mod file_system;

/// Converts a list of borrowed arguments into owned strings.
pub fn to_owned(args: Vec<impl AsRef<str>>) -> Vec<String> {
    args.into_iter().map(|arg| arg.as_ref().to_string()).collect()
}

/// Returns the platform specific file name of an executable.
pub fn find_executable(name: impl AsRef<str>) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", name.as_ref())
    } else {
        name.as_ref().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_owned() {
        assert_eq!(to_owned(vec!["-i", "in.mp4"]), vec!["-i", "in.mp4"]);
    }

    #[test]
    fn test_find_executable() {
        let name = find_executable("ffmpeg");
        if cfg!(target_os = "windows") {
            assert_eq!(name, "ffmpeg.exe");
        } else {
            assert_eq!(name, "ffmpeg");
        }
    }
}
