use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - edit it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Credential errors (messages are surfaced verbatim in the request state)
    #[error("envFile is empty")]
    EnvFileEmpty,

    #[error("Failed to open env file: {}", path.display())]
    EnvFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SP_DC not found in env file")]
    CredentialNotFound,

    // Input errors
    #[error("trackIdOrUrl is empty")]
    EmptyTrackInput,

    #[error("Invalid lyric timestamp: {value:?}")]
    InvalidTimestamp { value: String },

    // Controller errors
    #[error("Lyrics controller is no longer running")]
    ControllerStopped,

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
