use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

/// Number of tracks kept in the playlist when no override is configured.
pub const DEFAULT_RETENTION_LIMIT: usize = 100;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

const DEFAULT_CONFIG: &str = r#"[spotify]
username = ""
client_id = ""
client_secret = ""
redirect_uri = "http://localhost:8888/callback"
playlist_id = ""

[file]
csv = "~/nowplaying.csv"

[sync]
poll_interval_secs = 1
retention_limit = 100
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing value for `{0}` in config")]
    MissingField(&'static str),
    #[error("`sync.{0}` must be greater than zero")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    spotify: SpotifyConfig,
    file: FileConfig,
    #[serde(default)]
    sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub username: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub playlist_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileConfig {
    csv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SyncConfig {
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,
    #[serde(default = "default_retention_limit")]
    retention_limit: usize,
    #[serde(default)]
    token_cache: Option<String>,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_retention_limit() -> usize {
    DEFAULT_RETENTION_LIMIT
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            retention_limit: DEFAULT_RETENTION_LIMIT,
            token_cache: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .wrap_err(format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate config contents. Every `spotify` and `file` field is required.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).wrap_err("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("spotify.username", &self.spotify.username),
            ("spotify.client_id", &self.spotify.client_id),
            ("spotify.client_secret", &self.spotify.client_secret),
            ("spotify.redirect_uri", &self.spotify.redirect_uri),
            ("spotify.playlist_id", &self.spotify.playlist_id),
            ("file.csv", &self.file.csv),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::MissingField(*name));
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(ConfigError::NotPositive("poll_interval_secs"));
        }
        if self.sync.retention_limit == 0 {
            return Err(ConfigError::NotPositive("retention_limit"));
        }
        Ok(())
    }

    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("nowplaying-sync").join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_path().ok_or(color_eyre::eyre::eyre!("Config file not found"))?;

        Self::from_file(&config_path)
    }

    /// Write a config template to the default location unless one exists.
    /// Returns the path of the config file.
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path()
            .ok_or(color_eyre::eyre::eyre!("No config directory on this platform"))?;
        if path.exists() {
            log::info!("Config already exists at {}", path.display());
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err(format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, DEFAULT_CONFIG)
            .wrap_err(format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    pub fn spotify(&self) -> &SpotifyConfig {
        &self.spotify
    }

    pub fn playlist_id(&self) -> &str {
        &self.spotify.playlist_id
    }

    /// Get expanded path of the now playing log
    pub fn play_log_path(&self) -> PathBuf {
        self.expand_path(&self.file.csv)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    pub fn retention_limit(&self) -> usize {
        self.sync.retention_limit
    }

    /// Where the Spotify token is cached between runs
    pub fn token_cache_path(&self) -> PathBuf {
        match &self.sync.token_cache {
            Some(path) => self.expand_path(path),
            None => Self::config_path()
                .and_then(|path| path.parent().map(|dir| dir.join("token.json")))
                .unwrap_or_else(|| PathBuf::from(".nowplaying-sync-token.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[spotify]
username = "radio"
client_id = "cid"
client_secret = "secret"
redirect_uri = "http://localhost:8888/callback"
playlist_id = "pl123"

[file]
csv = "/srv/nowplaying.csv"
"#;

    #[test]
    fn test_parse_valid_config_with_defaults() {
        let config = Config::from_toml_str(VALID).unwrap();
        assert_eq!(config.playlist_id(), "pl123");
        assert_eq!(config.spotify().client_id, "cid");
        assert_eq!(config.play_log_path(), PathBuf::from("/srv/nowplaying.csv"));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.retention_limit(), DEFAULT_RETENTION_LIMIT);
    }

    #[test]
    fn test_sync_section_overrides() {
        let contents = format!(
            "{}\n[sync]\npoll_interval_secs = 5\nretention_limit = 20\ntoken_cache = \"/tmp/tok.json\"\n",
            VALID
        );
        let config = Config::from_toml_str(&contents).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.retention_limit(), 20);
        assert_eq!(config.token_cache_path(), PathBuf::from("/tmp/tok.json"));
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let contents = VALID.replace("[file]\ncsv = \"/srv/nowplaying.csv\"\n", "");
        assert!(Config::from_toml_str(&contents).is_err());
    }

    #[test]
    fn test_empty_field_is_rejected() {
        let contents = VALID.replace("client_secret = \"secret\"", "client_secret = \"\"");
        let err = Config::from_toml_str(&contents).unwrap_err();
        assert!(err.to_string().contains("spotify.client_secret"));
    }

    #[test]
    fn test_zero_retention_limit_is_rejected() {
        let contents = format!("{}\n[sync]\nretention_limit = 0\n", VALID);
        assert!(Config::from_toml_str(&contents).is_err());
    }

    #[test]
    fn test_default_template_parses_once_filled_in() {
        let filled = DEFAULT_CONFIG
            .replace("username = \"\"", "username = \"u\"")
            .replace("client_id = \"\"", "client_id = \"c\"")
            .replace("client_secret = \"\"", "client_secret = \"s\"")
            .replace("playlist_id = \"\"", "playlist_id = \"p\"");
        assert!(Config::from_toml_str(&filled).is_ok());
        assert!(Config::from_toml_str(DEFAULT_CONFIG).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_file(&dir.path().join("nope.toml")).is_err());
    }
}
