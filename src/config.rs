use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs};

use error_stack::{IntoReport, Report, ResultExt};
use serde::{Deserialize, Serialize};

/// `AppConfig` holds static configuration values for the application,
/// such as the catalog endpoint and the public client ID used to mint tokens.
pub struct AppConfig;

impl AppConfig {
    /// Base URL of the Spotify Web API.
    pub const SPOTIFY_API_BASE: &'static str = "https://api.spotify.com/v1/";
    /// The public client ID used by the keymaster token exchange.
    pub const KEYMASTER_CLIENT_ID: &'static str = "65b708073fc0480ea92a077233ca87bd";
    /// Scopes requested for every catalog token.
    pub const CATALOG_SCOPES: &'static str = "user-read-email,playlist-read-private,user-library-read";
    pub const CONFIG_DIR: &'static str = ".zspotify";
    pub const CONFIG_FILE: &'static str = "config.json";
}

#[derive(Debug)]
pub struct SettingsError;

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Settings error")
    }
}

impl std::error::Error for SettingsError {}

pub type SettingsResult<T> = error_stack::Result<T, SettingsError>;

#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MusicFormat {
    Mp3,
    Ogg,
}

/// What happens to an encoded file whose tags or artwork could not be written.
#[derive(
    Debug,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TagFailurePolicy {
    Keep,
    Delete,
}

/// Process-wide settings. Built once at startup and only read afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub root_path: PathBuf,
    pub skip_existing_files: bool,
    pub music_format: MusicFormat,
    /// Set when the account isn't detected as premium even though it is.
    pub force_premium: bool,
    /// Keep the fetched audio untouched instead of re-encoding it.
    pub raw_audio_as_is: bool,
    pub tag_failure_policy: TagFailurePolicy,
    pub request_timeout_secs: u64,
    /// Directory holding `credentials.json`.
    pub credentials_location: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("ZSpotify Music"),
            skip_existing_files: true,
            music_format: MusicFormat::Mp3,
            force_premium: false,
            raw_audio_as_is: false,
            tag_failure_policy: TagFailurePolicy::Keep,
            request_timeout_secs: 30,
            credentials_location: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Reads the settings file at `path`, or the default location when `path` is `None`.
    /// A missing default file yields the default settings; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> SettingsResult<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_config_file_path() {
                Some(default_path) if default_path.is_file() => default_path,
                _ => {
                    log::debug!("No settings file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        Self::read_config_file(&config_path)
    }

    pub fn read_config_file(config_path: &Path) -> SettingsResult<Self> {
        if !config_path.is_file() {
            return Err(Report::new(SettingsError).attach_printable(format!(
                "Config file not found at: {}",
                config_path.display()
            )));
        }
        let config_content = fs::read_to_string(config_path)
            .into_report()
            .attach_printable(format!(
                "Failed to read config file at {}",
                config_path.display()
            ))
            .change_context(SettingsError)?;
        let settings: Settings = serde_json::from_str(&config_content)
            .into_report()
            .attach_printable("Failed to parse the config file. Ensure it is valid JSON.")
            .change_context(SettingsError)?;
        log::debug!("Settings loaded from {}", config_path.display());
        Ok(settings)
    }

    pub fn default_config_file_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(AppConfig::CONFIG_DIR).join(AppConfig::CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Extension of the files written with these settings.
    pub fn file_extension(&self) -> String {
        if self.raw_audio_as_is {
            "raw".to_string()
        } else {
            self.music_format.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(
            &config_path,
            r#"{ "root_path": "/music", "music_format": "ogg", "tag_failure_policy": "delete" }"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&config_path)).unwrap();

        assert_eq!(settings.root_path, PathBuf::from("/music"));
        assert_eq!(settings.music_format, MusicFormat::Ogg);
        assert_eq!(settings.tag_failure_policy, TagFailurePolicy::Delete);
        assert!(settings.skip_existing_files);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        fs::write(&config_path, "root_path = 'toml?'").unwrap();
        assert!(Settings::read_config_file(&config_path).is_err());
    }

    #[test]
    fn test_file_extension_follows_raw_mode() {
        let mut settings = Settings::default();
        assert_eq!(settings.file_extension(), "mp3");
        settings.music_format = MusicFormat::Ogg;
        assert_eq!(settings.file_extension(), "ogg");
        settings.raw_audio_as_is = true;
        assert_eq!(settings.file_extension(), "raw");
    }

    #[test]
    fn test_music_format_from_str() {
        assert_eq!(MusicFormat::from_str("mp3").unwrap(), MusicFormat::Mp3);
        assert_eq!(MusicFormat::from_str("ogg").unwrap(), MusicFormat::Ogg);
        assert!(MusicFormat::from_str("flac").is_err());
    }
}
