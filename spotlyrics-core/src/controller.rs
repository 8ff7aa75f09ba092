//! Lyrics request controller.
//!
//! Owns the observable [`RequestState`] and drives one request at a time through
//! `Idle -> Fetching -> Resolved`. Each request gets a fresh ID; the backend call
//! runs on a blocking worker and reports back tagged with that ID. Only a
//! response carrying the current ID may touch the state, which is how timeouts
//! and superseding fetches discard late results (the backend call itself cannot
//! be cancelled).
//!
//! All state mutation happens on whoever owns the controller: either the caller
//! pumping [`LyricsController::next_transition`], or the task spawned by
//! [`LyricsController::start`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::LyricsBackend;
use crate::credential::extract_sp_dc;
use crate::error::{CoreError, Result};
use crate::response::{parse_payload, ResolveError};
use crate::state::{
    ObservableState, RequestState, StateChange, STATUS_ERROR, STATUS_FETCHING, STATUS_OK,
    STATUS_TIMED_OUT,
};
use crate::track::bare_track_id;

const LOG_TARGET: &str = "spotlyrics::controller";

/// Default time a request may take before it is reported as timed out
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Capacity of the transition channel exposed by [`ControllerHandle`]
const TRANSITION_CHANNEL_CAPACITY: usize = 16;

const TIMEOUT_MESSAGE: &str = "Timeout while fetching lyrics";
const MISSING_SP_DC_MESSAGE: &str = "Missing SP_DC";

/// Controller tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Request timeout. `Duration::ZERO` disables the timer.
    pub timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How a request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The backend reported an error; carries its message
    BackendError(String),
    ParseError,
    EmptyResponse,
    Timeout,
}

/// Controller lifecycle phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching { request_id: u64 },
    Resolved(Outcome),
}

/// Result of processing one completion or timer expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The current request reached a terminal state
    Resolved { request_id: u64, outcome: Outcome },
    /// A stale response arrived and was dropped without touching the state
    Discarded { request_id: u64 },
}

/// Backend result tagged with the request it belongs to
struct Completion {
    request_id: u64,
    payload: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    request_id: u64,
    at: Instant,
}

/// Controller for asynchronous lyrics requests
pub struct LyricsController<B> {
    backend: Arc<B>,
    config: ControllerConfig,
    runtime: Handle,
    state: ObservableState,
    phase: Phase,
    request_id: u64,
    deadline: Option<Deadline>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<B: LyricsBackend + 'static> LyricsController<B> {
    /// Create a controller with empty state.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(backend: B, config: ControllerConfig) -> Self {
        Self::with_shared_backend(Arc::new(backend), config)
    }

    /// Create a controller around a backend that is shared with other owners.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_shared_backend(backend: Arc<B>, config: ControllerConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            config,
            runtime: Handle::current(),
            state: ObservableState::new(),
            phase: Phase::Idle,
            request_id: 0,
            deadline: None,
            completion_tx,
            completion_rx,
        }
    }

    /// Current state snapshot
    #[must_use]
    pub const fn state(&self) -> &RequestState {
        self.state.get()
    }

    /// Subscribe to per-field change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    /// Receiver that always holds the latest full snapshot
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<RequestState> {
        self.state.watch()
    }

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// ID of the request whose response is currently accepted
    #[must_use]
    pub const fn current_request_id(&self) -> u64 {
        self.request_id
    }

    /// Whether a timeout is pending for the current request
    #[must_use]
    pub const fn timeout_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Start fetching lyrics for `track_id_or_url` with the `SP_DC` found in `env_file`.
    ///
    /// Returns `false` without contacting the backend when the track input is
    /// empty or no credential can be read; the reason is put in the `error` field.
    /// Otherwise the request supersedes any request still in flight and this
    /// returns `true` immediately.
    pub fn fetch(&mut self, env_file: &Path, track_id_or_url: &str) -> bool {
        let track = track_id_or_url.trim();
        if track.is_empty() {
            self.reject(&CoreError::EmptyTrackInput.to_string());
            return false;
        }

        // Re-read on every request so credential rotation needs no restart
        let sp_dc = match extract_sp_dc(env_file) {
            Ok(sp_dc) if !sp_dc.is_empty() => sp_dc,
            Ok(_) => {
                self.reject(MISSING_SP_DC_MESSAGE);
                return false;
            }
            Err(e) => {
                self.reject(&e.to_string());
                return false;
            }
        };

        self.request_id += 1;
        let request_id = self.request_id;

        self.state.set_busy(true);
        self.state.set_loaded(false);
        self.state.set_error("");
        self.state.set_status(STATUS_FETCHING);
        self.state.set_sync_type("");
        self.state.set_lines(Vec::new());
        self.state
            .set_track_id(bare_track_id(track_id_or_url).unwrap_or_default());

        self.deadline = (!self.config.timeout.is_zero()).then(|| Deadline {
            request_id,
            at: Instant::now() + self.config.timeout,
        });
        self.phase = Phase::Fetching { request_id };

        info!(target: LOG_TARGET, request_id, "Fetching lyrics for {}", track);
        self.dispatch(request_id, sp_dc, track.to_string());
        true
    }

    /// Wait for the next backend completion or timeout and apply it.
    ///
    /// Whichever of the two is observed first wins. A response disarms the timer
    /// of its own request only, so a stale response never keeps the current request
    /// from timing out. A timeout bumps the request ID so the late response is later
    /// reported as [`Transition::Discarded`].
    ///
    /// Waits forever while nothing is in flight.
    pub async fn next_transition(&mut self) -> Transition {
        let deadline = self.deadline;
        tokio::select! {
            Some(completion) = self.completion_rx.recv() => self.on_completion(completion),
            expired = wait_for(deadline) => self.on_timeout(expired),
        }
    }

    /// Move the controller onto its own task and return a handle to it.
    ///
    /// The task runs until `cancel_token` is cancelled or every handle is dropped.
    #[must_use]
    pub fn start(
        self,
        cancel_token: Option<CancellationToken>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let cancel_token = cancel_token.unwrap_or_default();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (transition_tx, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);

        let handle = ControllerHandle {
            commands: command_tx,
            snapshot: self.state.watch(),
            changes: self.state.change_sender(),
            transitions: transition_tx.clone(),
        };

        let runtime = self.runtime.clone();
        let task = runtime.spawn(async move {
            let mut controller = self;
            controller.run(command_rx, cancel_token, transition_tx).await;
        });

        (handle, task)
    }

    async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel_token: CancellationToken,
        transitions: broadcast::Sender<Transition>,
    ) {
        info!(target: LOG_TARGET, "Lyrics controller started");

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Lyrics controller shutting down");
                    break;
                }
                command = commands.recv() => {
                    match command {
                        Some(Command::Fetch { env_file, track_id_or_url, reply }) => {
                            let accepted = self.fetch(&env_file, &track_id_or_url);
                            // Caller may have stopped waiting
                            let _ = reply.send(accepted);
                        }
                        None => {
                            info!(target: LOG_TARGET, "All controller handles dropped");
                            break;
                        }
                    }
                }
                transition = self.next_transition() => {
                    debug!(target: LOG_TARGET, ?transition, "Request transition");
                    // No subscribers is fine
                    let _ = transitions.send(transition);
                }
            }
        }
    }

    fn dispatch(&self, request_id: u64, sp_dc: String, track: String) {
        let backend = Arc::clone(&self.backend);
        let completion_tx = self.completion_tx.clone();

        self.runtime.spawn_blocking(move || {
            let payload = backend.get_lyrics_json(&sp_dc, &track);
            // Receiver is gone only if the controller was dropped
            let _ = completion_tx.send(Completion {
                request_id,
                payload,
            });
        });
    }

    fn reject(&mut self, message: &str) {
        warn!(target: LOG_TARGET, "Rejected lyrics request: {}", message);

        if let Phase::Fetching { request_id } = self.phase {
            debug!(target: LOG_TARGET, request_id, "Abandoning in-flight request");
            self.request_id += 1;
            self.deadline = None;
            self.phase = Phase::Idle;
        }

        self.state.set_error(message);
        self.state.set_status(STATUS_ERROR);
        self.state.set_busy(false);
        self.state.set_loaded(false);
    }

    fn on_timeout(&mut self, expired: Deadline) -> Transition {
        self.deadline = None;
        let request_id = expired.request_id;

        warn!(
            target: LOG_TARGET,
            request_id,
            "No lyrics response within {}ms",
            self.config.timeout.as_millis()
        );

        // The backend call keeps running; bumping the ID makes its result stale
        self.request_id += 1;

        self.state.set_error(TIMEOUT_MESSAGE);
        self.state.set_status(STATUS_TIMED_OUT);
        self.state.set_busy(false);
        self.state.set_loaded(false);

        self.phase = Phase::Resolved(Outcome::Timeout);
        Transition::Resolved {
            request_id,
            outcome: Outcome::Timeout,
        }
    }

    fn on_completion(&mut self, completion: Completion) -> Transition {
        let Completion {
            request_id,
            payload,
        } = completion;

        // Only the response of the request the timer was armed for disarms it
        if self.deadline.is_some_and(|d| d.request_id == request_id) {
            self.deadline = None;
        }

        if request_id != self.request_id {
            debug!(
                target: LOG_TARGET,
                request_id,
                current = self.request_id,
                "Dropping stale lyrics response"
            );
            return Transition::Discarded { request_id };
        }

        let outcome = match parse_payload(payload.as_deref()) {
            Ok(lyrics) => {
                info!(
                    target: LOG_TARGET,
                    request_id,
                    "Got {} lyrics with {} lines",
                    lyrics.sync_type,
                    lyrics.lines.len()
                );
                self.state.set_sync_type(&lyrics.sync_type);
                self.state.set_lines(lyrics.lines);
                self.state.set_status(STATUS_OK);
                self.state.set_busy(false);
                self.state.set_loaded(true);
                Outcome::Success
            }
            Err(e) => {
                warn!(target: LOG_TARGET, request_id, "Lyrics request failed: {}", e);
                self.state.set_error(&e.to_string());
                self.state.set_status(STATUS_ERROR);
                self.state.set_busy(false);
                self.state.set_loaded(false);
                match e {
                    ResolveError::Empty => Outcome::EmptyResponse,
                    ResolveError::InvalidJson => Outcome::ParseError,
                    ResolveError::Backend(message) => Outcome::BackendError(message),
                }
            }
        };

        self.phase = Phase::Resolved(outcome.clone());
        Transition::Resolved {
            request_id,
            outcome,
        }
    }
}

async fn wait_for(deadline: Option<Deadline>) -> Deadline {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(deadline.at).await;
            deadline
        }
        None => std::future::pending().await,
    }
}

enum Command {
    Fetch {
        env_file: PathBuf,
        track_id_or_url: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable handle to a controller running on its own task
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<RequestState>,
    changes: broadcast::Sender<StateChange>,
    transitions: broadcast::Sender<Transition>,
}

impl ControllerHandle {
    /// Ask the controller to fetch lyrics. Resolves to whether the request was accepted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ControllerStopped`] if the controller task has exited.
    pub async fn fetch(
        &self,
        env_file: impl Into<PathBuf>,
        track_id_or_url: impl Into<String>,
    ) -> Result<bool> {
        let (reply, accepted) = oneshot::channel();
        self.commands
            .send(Command::Fetch {
                env_file: env_file.into(),
                track_id_or_url: track_id_or_url.into(),
                reply,
            })
            .map_err(|_| CoreError::ControllerStopped)?;
        accepted.await.map_err(|_| CoreError::ControllerStopped)
    }

    /// Latest state snapshot
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.snapshot.borrow().clone()
    }

    /// Receiver that always holds the latest full snapshot
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<RequestState> {
        self.snapshot.clone()
    }

    /// Subscribe to per-field change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Subscribe to request transitions.
    ///
    /// A [`Transition::Resolved`] is sent after its state changes are visible
    /// through [`ControllerHandle::state`].
    #[must_use]
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }
}
