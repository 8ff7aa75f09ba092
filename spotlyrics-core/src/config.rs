use crate::controller::ControllerConfig;
use crate::error::{CoreError, Result};
use crate::paths;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotlyricsConfig {
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Env file containing `SP_DC`; defaults to ~/.config/spotlyrics/spotify.env
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    /// Request timeout, 0 disables it
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            env_file: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LyricsConfig {
    /// Env file to read `SP_DC` from, with `~/` expanded
    #[must_use]
    pub fn env_file(&self) -> PathBuf {
        self.env_file
            .as_deref()
            .map_or_else(paths::env_file_path, paths::expand_home)
    }

    #[must_use]
    pub const fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Shared library exporting the lyrics backend C functions
    #[serde(default)]
    pub library: Option<PathBuf>,
}

impl BackendConfig {
    #[must_use]
    pub fn library(&self) -> Option<PathBuf> {
        self.library.as_deref().map(paths::expand_home)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub enabled: bool,
}

impl SpotlyricsConfig {
    /// Get the config file path (~/.config/spotlyrics/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        paths::config_path()
    }

    /// Load config from the default location or create a template on first run
    ///
    /// # Errors
    ///
    /// See [`SpotlyricsConfig::load_or_create_at`].
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `config_path`, writing the template there if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] right after creating the template, and an
    /// error if the file cannot be read, written or parsed.
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;
            info!("Created config template at {}", config_path.display());

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::parse(&content)
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has fields of the wrong type.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Config template written on first run
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# spotlyrics configuration
# ~/.config/spotlyrics/config.toml

[lyrics]
# Env file containing the Spotify sp_dc cookie, e.g. `export SP_DC="..."`
# env_file = "~/.config/spotlyrics/spotify.env"
# Milliseconds before a request is reported as timed out (0 disables the timeout)
timeout_ms = "#,
    DEFAULT_TIMEOUT_MS,
    r#"

[backend]
# Shared library exporting SpotifyLyrics_GetLyricsJson and SpotifyLyrics_FreeString
# library = "/usr/local/lib/libspotifylyrics.so"

[logging]
# Also write logs to ~/.cache/spotlyrics/spotlyrics.log
enabled = false
"#
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = SpotlyricsConfig::parse(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, SpotlyricsConfig::default());
        assert_eq!(config.lyrics.timeout_ms, 30_000);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SpotlyricsConfig::parse("").unwrap();
        assert_eq!(
            config.lyrics.controller_config().timeout,
            Duration::from_secs(30)
        );
        assert!(config.backend.library().is_none());
        assert!(!config.logging.enabled);
        assert_eq!(config.lyrics.env_file(), paths::env_file_path());
    }

    #[test]
    fn test_custom_values() {
        let config = SpotlyricsConfig::parse(
            r#"
[lyrics]
env_file = "/run/secrets/spotify.env"
timeout_ms = 5000

[backend]
library = "/opt/lib/libspotifylyrics.so"

[logging]
enabled = true
"#,
        )
        .unwrap();
        assert_eq!(
            config.lyrics.env_file(),
            PathBuf::from("/run/secrets/spotify.env")
        );
        assert_eq!(
            config.lyrics.controller_config().timeout,
            Duration::from_millis(5000)
        );
        assert_eq!(
            config.backend.library(),
            Some(PathBuf::from("/opt/lib/libspotifylyrics.so"))
        );
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_invalid_type_is_parse_error() {
        let err = SpotlyricsConfig::parse("[lyrics]\ntimeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_or_create_writes_template_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(paths::CONFIG_FILE_NAME);

        let err = SpotlyricsConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        let config = SpotlyricsConfig::load_or_create_at(&path).unwrap();
        assert_eq!(config, SpotlyricsConfig::default());
    }
}
