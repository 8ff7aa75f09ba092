//! Observable request state exposed to UI bindings.
//!
//! Every field has its own change event. Setters compare before storing, so an
//! event is only emitted when the value actually changes.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// Status text while a request is in flight
pub const STATUS_FETCHING: &str = "Fetching lyrics...";
/// Status text after a successful resolution
pub const STATUS_OK: &str = "OK";
/// Status text after any error resolution or up-front rejection
pub const STATUS_ERROR: &str = "Error";
/// Status text after the timeout won the race
pub const STATUS_TIMED_OUT: &str = "Timed out";

/// A single synced lyric line as reported by the backend.
///
/// The start time stays textual; it is only parsed when exporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    pub start_time_ms: String,
    /// Empty for instrumental gaps
    pub words: String,
}

impl LyricLine {
    #[must_use]
    pub fn new(start_time_ms: impl Into<String>, words: impl Into<String>) -> Self {
        Self {
            start_time_ms: start_time_ms.into(),
            words: words.into(),
        }
    }
}

/// Snapshot of the controller state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestState {
    pub busy: bool,
    pub loaded: bool,
    pub status: String,
    /// Empty when there is no error
    pub error: String,
    pub sync_type: String,
    /// Empty when the request used a URL or URI
    pub track_id: String,
    pub lines: Vec<LyricLine>,
}

/// Identifies one observable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Busy,
    Loaded,
    Status,
    Error,
    SyncType,
    TrackId,
    Lines,
}

/// Change notification carrying the field's new value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Busy(bool),
    Loaded(bool),
    Status(String),
    Error(String),
    SyncType(String),
    TrackId(String),
    Lines(Vec<LyricLine>),
}

impl StateChange {
    #[must_use]
    pub const fn field(&self) -> StateField {
        match self {
            Self::Busy(_) => StateField::Busy,
            Self::Loaded(_) => StateField::Loaded,
            Self::Status(_) => StateField::Status,
            Self::Error(_) => StateField::Error,
            Self::SyncType(_) => StateField::SyncType,
            Self::TrackId(_) => StateField::TrackId,
            Self::Lines(_) => StateField::Lines,
        }
    }
}

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Request state paired with per-field change events and a snapshot channel
pub struct ObservableState {
    current: RequestState,
    change_tx: broadcast::Sender<StateChange>,
    snapshot_tx: watch::Sender<RequestState>,
}

impl ObservableState {
    #[must_use]
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (snapshot_tx, _) = watch::channel(RequestState::default());
        Self {
            current: RequestState::default(),
            change_tx,
            snapshot_tx,
        }
    }

    /// Current state
    #[must_use]
    pub const fn get(&self) -> &RequestState {
        &self.current
    }

    /// Subscribe to per-field change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.change_tx.subscribe()
    }

    /// Receiver that always holds the latest full snapshot
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<RequestState> {
        self.snapshot_tx.subscribe()
    }

    pub(crate) fn change_sender(&self) -> broadcast::Sender<StateChange> {
        self.change_tx.clone()
    }

    pub fn set_busy(&mut self, busy: bool) {
        if self.current.busy != busy {
            self.current.busy = busy;
            self.publish(StateChange::Busy(busy));
        }
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        if self.current.loaded != loaded {
            self.current.loaded = loaded;
            self.publish(StateChange::Loaded(loaded));
        }
    }

    pub fn set_status(&mut self, status: &str) {
        if self.current.status != status {
            self.current.status = status.to_string();
            self.publish(StateChange::Status(status.to_string()));
        }
    }

    pub fn set_error(&mut self, error: &str) {
        if self.current.error != error {
            self.current.error = error.to_string();
            self.publish(StateChange::Error(error.to_string()));
        }
    }

    pub fn set_sync_type(&mut self, sync_type: &str) {
        if self.current.sync_type != sync_type {
            self.current.sync_type = sync_type.to_string();
            self.publish(StateChange::SyncType(sync_type.to_string()));
        }
    }

    pub fn set_track_id(&mut self, track_id: &str) {
        if self.current.track_id != track_id {
            self.current.track_id = track_id.to_string();
            self.publish(StateChange::TrackId(track_id.to_string()));
        }
    }

    /// Replace all lines at once
    pub fn set_lines(&mut self, lines: Vec<LyricLine>) {
        if self.current.lines != lines {
            self.current.lines.clone_from(&lines);
            self.publish(StateChange::Lines(lines));
        }
    }

    fn publish(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.change_tx.send(change);
        self.snapshot_tx.send_replace(self.current.clone());
    }
}

impl Default for ObservableState {
    fn default() -> Self {
        Self::new()
    }
}
