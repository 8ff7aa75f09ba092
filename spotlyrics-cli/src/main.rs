mod cli;
mod output;
mod stream;

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use spotlyrics_core::{
    paths, ControllerHandle, CoreError, LyricsController, RequestState, SpotlyricsConfig,
    StateChange, Transition,
};
use spotlyrics_ffi::DynamicBackend;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, OutputFormat, Settings};
use crate::output::{render, CliError};
use crate::stream::StreamProgress;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    // Tracing comes up before the config is fully loaded so loading can log
    init_tracing(check_file_logging_enabled(&config_path));

    let config = match SpotlyricsConfig::load_or_create_at(&config_path) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created config template at {}, continuing with defaults",
                path.display()
            );
            SpotlyricsConfig::default()
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = cli.settings(&config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let result = runtime.block_on(run(&cli, settings, &config_path, &cancel_token));

    // Blocking backend calls and the stdin reader cannot be interrupted
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cli: &Cli,
    settings: Settings,
    config_path: &Path,
    cancel_token: &CancellationToken,
) -> Result<(), CliError> {
    let library = settings
        .library
        .ok_or_else(|| CliError::NoBackendLibrary {
            config: config_path.display().to_string(),
        })?;
    let backend = DynamicBackend::load(&library)?;

    let controller = LyricsController::new(backend, settings.controller);
    let (handle, task) = controller.start(Some(cancel_token.clone()));
    tokio::spawn(log_state_changes(handle.subscribe()));

    let env_file = settings.env_file;
    let result = match cli.track.as_deref() {
        Some(track) => fetch_once(&handle, &env_file, track, cli.format, cancel_token).await,
        None => fetch_stream(&handle, &env_file, cli.format, cancel_token).await,
    };

    cancel_token.cancel();
    let _ = task.await;
    result
}

/// Fetch a single track and print it once it resolves
async fn fetch_once(
    handle: &ControllerHandle,
    env_file: &Path,
    track: &str,
    format: OutputFormat,
    cancel_token: &CancellationToken,
) -> Result<(), CliError> {
    let mut transitions = handle.subscribe_transitions();

    if !handle.fetch(env_file, track).await? {
        return Err(CliError::request(&handle.state()));
    }

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => return Err(CliError::Cancelled),
            transition = transitions.recv() => match transition {
                Ok(Transition::Resolved { .. }) => break,
                Ok(Transition::Discarded { .. }) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Err(CoreError::ControllerStopped.into()),
            },
        }
    }

    let state = handle.state();
    print_state(&state, format)?;
    if state.loaded {
        Ok(())
    } else {
        Err(CliError::request(&state))
    }
}

/// Fetch every track read from stdin, each superseding the one before
async fn fetch_stream(
    handle: &ControllerHandle,
    env_file: &Path,
    format: OutputFormat,
    cancel_token: &CancellationToken,
) -> Result<(), CliError> {
    let mut transitions = handle.subscribe_transitions();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut progress = StreamProgress::default();

    info!("Reading track IDs from stdin");

    while stdin_open || progress.in_flight() {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                let track = line.trim();
                if track.is_empty() {
                    continue;
                }
                let accepted = handle.fetch(env_file, track).await?;
                progress.fetched(accepted);
                if !accepted {
                    error!("{}", CliError::request(&handle.state()));
                }
            }
            transition = transitions.recv() => match transition {
                Ok(Transition::Resolved { request_id, .. }) => {
                    let state = handle.state();
                    if !progress.resolved(&state) {
                        debug!(request_id, "Newer request already in flight, not printing");
                        continue;
                    }
                    print_state(&state, format)?;
                    if !state.loaded {
                        error!("{}", CliError::request(&state));
                    }
                }
                Ok(Transition::Discarded { .. }) => {}
                Err(RecvError::Lagged(n)) => warn!("Missed {} request transitions", n),
                Err(RecvError::Closed) => return Err(CoreError::ControllerStopped.into()),
            },
        }
    }

    Ok(())
}

fn print_state(state: &RequestState, format: OutputFormat) -> Result<(), CliError> {
    if let Some(rendered) = render(state, format)? {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        if !rendered.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Log all state changes to the console
async fn log_state_changes(mut rx: broadcast::Receiver<StateChange>) {
    loop {
        match rx.recv().await {
            Ok(change) => match &change {
                StateChange::Status(status) => info!("Status: {}", status),
                StateChange::Error(message) if !message.is_empty() => {
                    warn!("Error: {}", message);
                }
                StateChange::Lines(lines) => debug!("Lines: {}", lines.len()),
                other => debug!("{:?} changed: {:?}", other.field(), other),
            },
            Err(RecvError::Closed) => {
                debug!("State change channel closed");
                break;
            }
            Err(RecvError::Lagged(n)) => {
                debug!("Missed {} state changes", n);
            }
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// Returns `false` if the config doesn't exist or can't be parsed.
fn check_file_logging_enabled(config_path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    SpotlyricsConfig::parse(&content).is_ok_and(|c| c.logging.enabled)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Lyrics go to stdout, so logs stay on stderr
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = paths::log_file_path();

        // Create cache directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
