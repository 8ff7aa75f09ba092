//! Path constants for configuration, credentials and log files.

use std::path::{Path, PathBuf};

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "spotlyrics";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the default env file holding `SP_DC`
pub const ENV_FILE_NAME: &str = "spotify.env";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "spotlyrics.log";

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration directory path (~/.config/spotlyrics/)
#[must_use]
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/spotlyrics/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the default env file path (~/.config/spotlyrics/spotify.env)
#[must_use]
pub fn env_file_path() -> PathBuf {
    config_dir().join(ENV_FILE_NAME)
}

/// Get the log file path (`$XDG_CACHE_HOME/spotlyrics/spotlyrics.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIR_NAME)
        .join(LOG_FILE_NAME)
}

/// Expand a leading `~/` against the home directory
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    path.strip_prefix("~")
        .map_or_else(|_| path.to_path_buf(), |rest| home_dir().join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let expanded = expand_home(Path::new("~/.config/spotlyrics/spotify.env"));
        assert!(expanded.ends_with(".config/spotlyrics/spotify.env"));
        assert!(!expanded.starts_with("~"));
    }

    #[test]
    fn test_expand_home_leaves_other_paths() {
        assert_eq!(
            expand_home(Path::new("/etc/spotify.env")),
            PathBuf::from("/etc/spotify.env")
        );
        assert_eq!(
            expand_home(Path::new("~user/file")),
            PathBuf::from("~user/file")
        );
    }

    #[test]
    fn test_default_paths_live_in_config_dir() {
        assert!(config_path().starts_with(config_dir()));
        assert!(env_file_path().ends_with(ENV_FILE_NAME));
    }
}
