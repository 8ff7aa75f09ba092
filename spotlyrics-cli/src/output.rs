use spotlyrics_core::{format, CoreError, RequestState};
use thiserror::Error;

use crate::cli::OutputFormat;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Backend(#[from] spotlyrics_ffi::FfiError),

    #[error("Failed to encode state as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("No backend library configured. Set backend.library in {config} or pass --library")]
    NoBackendLibrary { config: String },

    #[error("{status}: {error}")]
    Request { status: String, error: String },

    #[error("Interrupted")]
    Cancelled,
}

impl CliError {
    #[must_use]
    pub fn request(state: &RequestState) -> Self {
        Self::Request {
            status: state.status.clone(),
            error: state.error.clone(),
        }
    }
}

/// Render a resolved state. Text formats only carry lines, so they return
/// `None` when nothing was loaded.
///
/// # Errors
///
/// Returns an error if a line has an invalid timestamp or JSON encoding fails.
pub fn render(state: &RequestState, output: OutputFormat) -> Result<Option<String>, CliError> {
    if output == OutputFormat::Json {
        return Ok(Some(serde_json::to_string_pretty(state)?));
    }
    if !state.loaded {
        return Ok(None);
    }

    let rendered = match output {
        OutputFormat::Lrc => format::to_lrc(&state.lines)?,
        OutputFormat::Srt => format::to_srt(&state.lines)?,
        OutputFormat::Raw | OutputFormat::Json => format::to_raw(&state.lines),
    };
    Ok(Some(rendered))
}
