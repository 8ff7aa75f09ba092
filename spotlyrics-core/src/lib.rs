pub mod backend;
pub mod config;
pub mod controller;
pub mod credential;
pub mod error;
pub mod format;
pub mod paths;
pub mod response;
pub mod state;
pub mod track;

pub use backend::LyricsBackend;
pub use config::{
    BackendConfig, LoggingConfig, LyricsConfig, SpotlyricsConfig, CONFIG_TEMPLATE,
    DEFAULT_TIMEOUT_MS,
};
pub use controller::{
    ControllerConfig, ControllerHandle, LyricsController, Outcome, Phase, Transition,
    DEFAULT_TIMEOUT,
};
pub use credential::{extract_sp_dc, SP_DC_KEY};
pub use error::{CoreError, Result};
pub use format::{to_lrc, to_raw, to_srt};
pub use paths::{
    config_dir, config_path, env_file_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    ENV_FILE_NAME, LOG_FILE_NAME,
};
pub use response::{parse_payload, Lyrics, ResolveError};
pub use state::{
    LyricLine, ObservableState, RequestState, StateChange, StateField, STATUS_ERROR,
    STATUS_FETCHING, STATUS_OK, STATUS_TIMED_OUT,
};
pub use track::bare_track_id;
