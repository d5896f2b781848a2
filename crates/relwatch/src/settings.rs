use std::path::{Path, PathBuf};
use std::time::Duration;

use relwatch_core::{DEFAULT_API_BASE, PollInterval};
use relwatch_platform::AppPaths;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted polling period, in hours.
pub const MAX_POLL_INTERVAL_HOURS: u64 = 24 * 366;

const SECONDS_PER_HOUR: u64 = 60 * 60;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub account: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default)]
    pub current_version: Option<String>,

    /// Zero means a single check.
    #[serde(default = "default_poll_interval_hours")]
    pub poll_interval_hours: u64,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub auto_download: bool,

    #[serde(default)]
    pub download_asset: Option<usize>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_poll_interval_hours() -> u64 {
    24
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            account: None,
            repository: None,
            current_version: None,
            poll_interval_hours: default_poll_interval_hours(),
            api_base_url: default_api_base_url(),
            http_timeout_secs: default_http_timeout(),
            auto_download: false,
            download_asset: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl AppSettings {
    /// Read settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    /// [`SettingsError`] when the file exists but cannot be read or parsed.
    pub fn read_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, paths: &AppPaths) -> Result<(), std::io::Error> {
        paths.ensure_dirs()?;
        self.save_to(&paths.settings_file())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    /// `None` when the configured hours exceed [`MAX_POLL_INTERVAL_HOURS`].
    pub fn poll_interval(&self) -> Option<PollInterval> {
        match self.poll_interval_hours {
            0 => Some(PollInterval::Infinite),
            hours if hours > MAX_POLL_INTERVAL_HOURS => None,
            hours => hours
                .checked_mul(SECONDS_PER_HOUR)
                .map(|secs| PollInterval::Every(Duration::from_secs(secs))),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use relwatch_core::PollInterval;

    use super::{AppSettings, MAX_POLL_INTERVAL_HOURS, SettingsError};

    #[test]
    fn missing_fields_take_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"repository": "AmazonChimeHelper"}"#)
                .expect("partial settings should deserialize");

        assert_eq!(settings.repository.as_deref(), Some("AmazonChimeHelper"));
        assert_eq!(settings.poll_interval_hours, 24);
        assert_eq!(settings.api_base_url, "https://api.github.com");
        assert_eq!(settings.http_timeout(), Duration::from_secs(10));
        assert!(!settings.auto_download);
    }

    #[test]
    fn zero_hours_means_single_check() {
        let settings = AppSettings {
            poll_interval_hours: 0,
            ..AppSettings::default()
        };
        assert_eq!(settings.poll_interval(), Some(PollInterval::Infinite));

        let settings = AppSettings {
            poll_interval_hours: 6,
            ..AppSettings::default()
        };
        assert_eq!(
            settings.poll_interval(),
            Some(PollInterval::Every(Duration::from_secs(6 * 60 * 60)))
        );
    }

    #[test]
    fn oversized_interval_is_rejected_without_overflow() {
        let at_limit = AppSettings {
            poll_interval_hours: MAX_POLL_INTERVAL_HOURS,
            ..AppSettings::default()
        };
        assert!(at_limit.poll_interval().is_some());

        for hours in [MAX_POLL_INTERVAL_HOURS + 1, u64::MAX / 60, u64::MAX] {
            let settings = AppSettings {
                poll_interval_hours: hours,
                ..AppSettings::default()
            };
            assert_eq!(settings.poll_interval(), None);
        }
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        let settings = AppSettings {
            account: Some("nachmore".to_string()),
            repository: Some("AmazonChimeHelper".to_string()),
            current_version: Some("v1.2".to_string()),
            download_asset: Some(0),
            ..AppSettings::default()
        };

        settings.save_to(&path).expect("settings should be written");

        assert_eq!(
            AppSettings::read_from(&path).expect("settings should be read back"),
            settings
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");

        assert_eq!(
            AppSettings::read_from(&path).expect("missing file is not an error"),
            AppSettings::default()
        );
    }

    #[test]
    fn malformed_file_is_reported() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("test file should be written");

        let error = AppSettings::read_from(&path).expect_err("malformed file should fail");

        assert!(matches!(error, SettingsError::Parse { .. }));
        assert!(error.to_string().starts_with("malformed settings file"));
    }
}
