use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use spotlyrics_core::{ControllerConfig, SpotlyricsConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch synced lyrics through a native lyrics backend", long_about = None)]
pub struct Cli {
    /// Config file [default: ~/.config/spotlyrics/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Env file holding SP_DC, overrides `lyrics.env_file`
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Backend shared library, overrides `backend.library`
    #[arg(long, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Request timeout in milliseconds (0 disables), overrides `lyrics.timeout_ms`
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// How resolved lyrics are printed
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Lrc)]
    pub format: OutputFormat,

    /// Track ID, URI or URL. Reads one per line from stdin when omitted.
    pub track: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Lrc,
    Srt,
    Raw,
    /// The full request state
    Json,
}

/// Config values after command line overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub env_file: PathBuf,
    pub library: Option<PathBuf>,
    pub controller: ControllerConfig,
}

impl Cli {
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(SpotlyricsConfig::config_path)
    }

    #[must_use]
    pub fn settings(&self, config: &SpotlyricsConfig) -> Settings {
        let controller = self.timeout_ms.map_or_else(
            || config.lyrics.controller_config(),
            |ms| ControllerConfig {
                timeout: Duration::from_millis(ms),
            },
        );

        Settings {
            env_file: self
                .env_file
                .clone()
                .unwrap_or_else(|| config.lyrics.env_file()),
            library: self.library.clone().or_else(|| config.backend.library()),
            controller,
        }
    }
}
