//! Lyrics backend exposed as two C functions.
//!
//! The backend library exports:
//!
//! ```c
//! char *SpotifyLyrics_GetLyricsJson(const char *sp_dc, const char *track_id_or_url);
//! void  SpotifyLyrics_FreeString(char *ptr);
//! ```
//!
//! `SpotifyLyrics_GetLyricsJson` blocks until it has a JSON document (or fails with
//! NULL). Every non-NULL result must be released with `SpotifyLyrics_FreeString`.
//! There is no way to cancel a call in progress.
#![allow(unsafe_code)]

use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use spotlyrics_core::LyricsBackend;
use thiserror::Error;
use tracing::{debug, info};

const LOG_TARGET: &str = "spotlyrics::ffi";

/// Exported name of the lyrics lookup function
pub const GET_LYRICS_JSON_SYMBOL: &str = "SpotifyLyrics_GetLyricsJson";
/// Exported name of the matching deallocator
pub const FREE_STRING_SYMBOL: &str = "SpotifyLyrics_FreeString";

pub type GetLyricsJsonFn =
    unsafe extern "C" fn(sp_dc: *const c_char, track_id_or_url: *const c_char) -> *mut c_char;
pub type FreeStringFn = unsafe extern "C" fn(ptr: *mut c_char);

#[derive(Debug, Error)]
pub enum FfiError {
    #[error("Failed to load lyrics backend library {}: {source}", path.display())]
    Load {
        path: PathBuf,
        source: libloading::Error,
    },

    #[error("Lyrics backend library {} does not export {symbol}", path.display())]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        source: libloading::Error,
    },
}

/// Backend calling a pair of C function pointers
#[derive(Debug, Clone, Copy)]
pub struct CBackend {
    get_lyrics_json: GetLyricsJsonFn,
    free_string: FreeStringFn,
}

impl CBackend {
    /// Wrap raw backend functions.
    ///
    /// # Safety
    ///
    /// `get_lyrics_json` must be callable from any thread with two NUL-terminated
    /// UTF-8 strings that are only borrowed for the duration of the call. It must
    /// return either NULL or a NUL-terminated buffer that stays valid until it is
    /// handed to `free_string`, which must accept every such buffer exactly once.
    #[must_use]
    pub const unsafe fn from_raw(
        get_lyrics_json: GetLyricsJsonFn,
        free_string: FreeStringFn,
    ) -> Self {
        Self {
            get_lyrics_json,
            free_string,
        }
    }
}

impl LyricsBackend for CBackend {
    fn get_lyrics_json(&self, sp_dc: &str, track_id_or_url: &str) -> Option<Vec<u8>> {
        let Ok(sp_dc) = CString::new(sp_dc) else {
            debug!(target: LOG_TARGET, "Credential contains a NUL byte");
            return None;
        };
        let Ok(track) = CString::new(track_id_or_url) else {
            debug!(target: LOG_TARGET, "Track input contains a NUL byte");
            return None;
        };

        // SAFETY: both arguments are valid C strings that outlive the call, as
        // required by the contract accepted in `from_raw`.
        let raw = unsafe { (self.get_lyrics_json)(sp_dc.as_ptr(), track.as_ptr()) };
        if raw.is_null() {
            debug!(target: LOG_TARGET, "Backend returned NULL");
            return None;
        }

        // SAFETY: non-NULL results are NUL-terminated and valid until freed.
        let payload = unsafe { CStr::from_ptr(raw) }.to_bytes().to_vec();
        // SAFETY: `raw` came from `get_lyrics_json` and is released exactly once.
        unsafe { (self.free_string)(raw) };

        Some(payload)
    }
}

/// [`CBackend`] resolved from a shared library loaded at runtime
#[derive(Debug)]
pub struct DynamicBackend {
    backend: CBackend,
    // Keeps the function pointers in `backend` valid
    _library: Library,
}

impl DynamicBackend {
    /// Open the shared library at `path` and resolve both backend functions.
    ///
    /// # Errors
    ///
    /// Returns [`FfiError::Load`] if the library cannot be opened and
    /// [`FfiError::MissingSymbol`] if either function is not exported.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FfiError> {
        let path = path.as_ref();

        // SAFETY: loading runs the library's initialisers; pointing the config at
        // a library is the caller's statement that it is a lyrics backend.
        let library = unsafe { Library::new(path) }.map_err(|source| FfiError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let get_lyrics_json: GetLyricsJsonFn = resolve(&library, path, GET_LYRICS_JSON_SYMBOL)?;
        let free_string: FreeStringFn = resolve(&library, path, FREE_STRING_SYMBOL)?;

        info!(target: LOG_TARGET, "Loaded lyrics backend from {}", path.display());

        Ok(Self {
            // SAFETY: the exported functions follow the documented backend ABI and
            // stay loaded for as long as `_library` lives.
            backend: unsafe { CBackend::from_raw(get_lyrics_json, free_string) },
            _library: library,
        })
    }
}

impl LyricsBackend for DynamicBackend {
    fn get_lyrics_json(&self, sp_dc: &str, track_id_or_url: &str) -> Option<Vec<u8>> {
        self.backend.get_lyrics_json(sp_dc, track_id_or_url)
    }
}

fn resolve<T: Copy>(library: &Library, path: &Path, symbol: &'static str) -> Result<T, FfiError> {
    // SAFETY: `T` is the function pointer type the backend ABI declares for `symbol`.
    let resolved: Symbol<'_, T> =
        unsafe { library.get(symbol.as_bytes()) }.map_err(|source| FfiError::MissingSymbol {
            path: path.to_path_buf(),
            symbol,
            source,
        })?;
    Ok(*resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlyrics_core::{ControllerConfig, LyricsController, Outcome, Transition, STATUS_OK};
    use std::cell::Cell;
    use std::io::Write;
    use std::ptr;

    thread_local! {
        static FREED: Cell<usize> = const { Cell::new(0) };
    }

    fn freed() -> usize {
        FREED.with(Cell::get)
    }

    unsafe extern "C" fn echo(sp_dc: *const c_char, track_id_or_url: *const c_char) -> *mut c_char {
        let sp_dc = unsafe { CStr::from_ptr(sp_dc) }.to_string_lossy();
        let track = unsafe { CStr::from_ptr(track_id_or_url) }.to_string_lossy();
        let payload = format!(
            r#"{{"syncType":"LINE_SYNCED","lines":[{{"startTimeMs":"0","words":"{sp_dc}"}},{{"startTimeMs":"500","words":"{track}"}}]}}"#
        );
        CString::new(payload).map_or(ptr::null_mut(), CString::into_raw)
    }

    unsafe extern "C" fn always_null(_: *const c_char, _: *const c_char) -> *mut c_char {
        ptr::null_mut()
    }

    unsafe extern "C" fn counted_free(raw: *mut c_char) {
        FREED.with(|freed| freed.set(freed.get() + 1));
        drop(unsafe { CString::from_raw(raw) });
    }

    fn echo_backend() -> CBackend {
        unsafe { CBackend::from_raw(echo, counted_free) }
    }

    #[test]
    fn test_payload_is_copied_and_freed_once() {
        let backend = echo_backend();
        let before = freed();

        let payload = backend.get_lyrics_json("cookie", "abc123").unwrap();
        let text = String::from_utf8(payload).unwrap();

        assert!(text.contains(r#""words":"cookie""#));
        assert!(text.contains(r#""words":"abc123""#));
        assert_eq!(freed() - before, 1);
    }

    #[test]
    fn test_null_result_is_none_and_not_freed() {
        let backend = unsafe { CBackend::from_raw(always_null, counted_free) };
        let before = freed();

        assert!(backend.get_lyrics_json("cookie", "abc123").is_none());
        assert_eq!(freed(), before);
    }

    #[test]
    fn test_interior_nul_skips_backend_call() {
        let backend = echo_backend();
        let before = freed();

        assert!(backend.get_lyrics_json("coo\0kie", "abc123").is_none());
        assert!(backend.get_lyrics_json("cookie", "abc\0123").is_none());
        assert_eq!(freed(), before);
    }

    #[test]
    fn test_load_missing_library() {
        let err = DynamicBackend::load("/nonexistent/libspotifylyrics.so").unwrap_err();
        assert!(matches!(err, FfiError::Load { .. }));
        assert!(err.to_string().contains("/nonexistent/libspotifylyrics.so"));
    }

    #[tokio::test]
    async fn test_controller_over_c_backend() {
        let mut env = tempfile::NamedTempFile::new().unwrap();
        writeln!(env, "SP_DC=cookie").unwrap();

        let mut controller = LyricsController::new(echo_backend(), ControllerConfig::default());
        assert!(controller.fetch(env.path(), "abc123"));

        assert_eq!(
            controller.next_transition().await,
            Transition::Resolved {
                request_id: 1,
                outcome: Outcome::Success
            }
        );
        let state = controller.state();
        assert_eq!(state.status, STATUS_OK);
        assert_eq!(state.sync_type, "LINE_SYNCED");
        assert_eq!(state.lines.len(), 2);
        assert_eq!(state.lines[1].words, "abc123");
    }
}
