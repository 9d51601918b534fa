use {
    log::{error, warn},
    serde::{Deserialize, Serialize},
    std::{
        fs,
        path::{Path, PathBuf},
        time::Duration,
    },
    tubegrab_core::{ClientProfile, FallbackPolicy},
};

/// The MP3 bitrates offered for audio downloads, in kbps.
pub const AUDIO_BITRATES: [u32; 4] = [320, 256, 192, 128];

pub const DEFAULT_BITRATE: u32 = 192;

/// Whether `kbps` is one of the offered MP3 bitrates.
pub fn is_supported_bitrate(kbps: u32) -> bool {
    AUDIO_BITRATES.contains(&kbps)
}

/// Settings read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    /// Where partial streams are written, the OS temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Video container to list, `any` to list every container.
    pub container: String,
    pub fallback: FallbackPolicy,
    pub tools: ToolsConfig,
    pub extraction: ExtractionConfig,
    pub client: ClientConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
    /// Passed to every `yt-dlp` call, e.g. `["--cookies", "cookies.txt"]`.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub player_client: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    pub transcode: bool,
    pub default_bitrate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            scratch_dir: None,
            container: "mp4".to_string(),
            fallback: FallbackPolicy::Strict,
            tools: ToolsConfig::default(),
            extraction: ExtractionConfig::default(),
            client: ClientConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_secs: 2,
            timeout_secs: 60,
            extra_args: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let profile = ClientProfile::default();
        Self {
            player_client: profile.player_client,
            user_agent: profile.user_agent,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            transcode: true,
            default_bitrate: DEFAULT_BITRATE,
        }
    }
}

impl Config {
    /// `{config dir}/tubegrab/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tubegrab").join("config.toml"))
    }

    /// Loads the config from the default location, see [`Config::load_from`].
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("Could not find a valid config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Loads the config at `path`. A missing file yields the defaults, and so does a malformed one
    /// after logging the parse error.
    pub fn load_from(path: &Path) -> Self {
        if !path.is_file() {
            return Self::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!("Could not read config file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&content) {
            Ok(config) => config,
            Err(e) => {
                error!("Malformed config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;

        if !is_supported_bitrate(config.audio.default_bitrate) {
            warn!(
                "Unsupported default bitrate {}kbps, using {}kbps",
                config.audio.default_bitrate, DEFAULT_BITRATE
            );
            config.audio.default_bitrate = DEFAULT_BITRATE;
        }

        Ok(config)
    }

    /// The container filter for the video list, `None` lists every container.
    pub fn container_filter(&self) -> Option<String> {
        let container = self.container.trim();
        if container.is_empty() || container.eq_ignore_ascii_case("any") {
            None
        } else {
            Some(container.to_ascii_lowercase())
        }
    }

    pub fn client_profile(&self) -> ClientProfile {
        ClientProfile {
            player_client: self.client.player_client.clone(),
            user_agent: self.client.user_agent.clone(),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.extraction.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.timeout_secs.max(1))
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
            output_dir = "/srv/videos"
            fallback = "best"
            container = "any"

            [extraction]
            retries = 5
            extra_args = ["--cookies", "cookies.txt"]

            [client]
            player_client = "ios"
            user_agent = "com.google.ios.youtube/19.29.1"

            [audio]
            default_bitrate = 320
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/srv/videos"));
        assert_eq!(config.fallback, FallbackPolicy::Best);
        assert_eq!(config.container_filter(), None);
        assert_eq!(config.extraction.retries, 5);
        assert_eq!(config.extraction.timeout_secs, 60);
        assert_eq!(config.extraction.extra_args, vec!["--cookies", "cookies.txt"]);
        assert_eq!(config.client_profile().player_client, "ios");
        assert_eq!(config.audio.default_bitrate, 320);
        assert!(config.audio.transcode);
    }

    #[test]
    fn test_supported_bitrates() {
        assert!(is_supported_bitrate(320));
        assert!(is_supported_bitrate(128));
        assert!(!is_supported_bitrate(96));
    }

    #[test]
    fn test_unsupported_bitrate_is_replaced() {
        let config = Config::parse("[audio]\ndefault_bitrate = 97").unwrap();
        assert_eq!(config.audio.default_bitrate, DEFAULT_BITRATE);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "fallback = [not toml").unwrap();

        assert!(Config::parse("fallback = [not toml").is_err());
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            Config::load_from(&dir.path().join("missing.toml")),
            Config::default()
        );
    }

    #[test]
    fn test_default_container_filter() {
        assert_eq!(Config::default().container_filter().as_deref(), Some("mp4"));
    }
}
