//! `SP_DC` extraction from shell-style env files.
//!
//! Accepted forms (first match wins):
//!
//! ```text
//! SP_DC=AQB...
//! export SP_DC = "AQB..."   # trailing comment
//!     SP_DC='AQB...'
//! ```

use std::fs;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Name of the credential key inside the env file
pub const SP_DC_KEY: &str = "SP_DC";

/// Read `env_file` and return the `SP_DC` value it assigns.
///
/// The value may be empty (e.g. `SP_DC=""`); callers decide whether that is usable.
///
/// # Errors
///
/// Returns [`CoreError::EnvFileEmpty`] for a blank path, [`CoreError::EnvFileUnreadable`]
/// if the file cannot be read, and [`CoreError::CredentialNotFound`] if no line assigns `SP_DC`.
pub fn extract_sp_dc(env_file: &Path) -> Result<String> {
    if env_file.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(CoreError::EnvFileEmpty);
    }

    let bytes = fs::read(env_file).map_err(|source| CoreError::EnvFileUnreadable {
        path: env_file.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    text.lines()
        .find_map(assigned_value)
        .map(|raw| strip_quotes(raw.trim()).to_string())
        .ok_or(CoreError::CredentialNotFound)
}

/// Return the raw right-hand side if `line` assigns `SP_DC`
fn assigned_value(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let line = strip_export(line).unwrap_or(line);

    let rest = line.strip_prefix(SP_DC_KEY)?;
    let rest = rest.trim_start().strip_prefix('=')?;

    // Everything up to a `#` comment marker
    let value = rest.split('#').next().unwrap_or_default();
    if value.is_empty() {
        return None;
    }
    Some(value)
}

/// `export` must be followed by at least one whitespace character
fn strip_export(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("export")?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Remove exactly one layer of matching single or double quotes
fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 {
        for quote in ['"', '\''] {
            if let Some(inner) = value
                .strip_prefix(quote)
                .and_then(|v| v.strip_suffix(quote))
            {
                return inner;
            }
        }
    }
    value
}
