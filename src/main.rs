//! Application entry point for the greenhouse telemetry client.
//!
//! This binary orchestrates the full startup sequence for the live
//! telemetry pipeline, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Reading the bearer credential from the token store
//! - Bootstrapping state over REST (gardens, devices, reading histories)
//! - Running the event-stream supervisor and folding events into state
//!
//! # Environment Variables
//! - `GREENHOUSE_API_URL` (**required**) – backend REST API base URL
//! - `GREENHOUSE_ACCESS_TOKEN` (optional) – seeds the token store
//! - `GREENHOUSE_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `GREENHOUSE_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! Configuration parsing lives in `config`, the REST surface in `api`, and
//! the stream lifecycle in `ws`; this module only sequences them.
use std::{env, io::IsTerminal, time::Duration};

use dotenvy::dotenv;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::{anyhow, Result};

use greenhouse_telemetry::api::{self, ApiClient};
use greenhouse_telemetry::config;
use greenhouse_telemetry::state::TelemetryState;
use greenhouse_telemetry::token::TokenStore;
use greenhouse_telemetry::ws::{BackoffPolicy, ConnState, ConnectionSupervisor, SupervisorEvent};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let tokens = TokenStore::new(&cfg.token_path);
    let token = match env::var("GREENHOUSE_ACCESS_TOKEN") {
        Ok(value) => {
            tokens.set(&value)?;
            value
        }
        Err(_) => tokens.get()?.ok_or_else(|| {
            anyhow!(
                "No access token: set GREENHOUSE_ACCESS_TOKEN or seed {}",
                cfg.token_path
            )
        })?,
    };

    let api = ApiClient::new(cfg.api_url.clone(), token.clone());
    let mut state = TelemetryState::default();

    api::refresh(&api, &mut state).await?;
    tracing::info!("Bootstrap complete: {}", state.summary());

    let policy = BackoffPolicy::new(
        Duration::from_millis(cfg.ws_reconnect_base_ms as u64),
        cfg.ws_max_reconnects,
    );
    let supervisor =
        ConnectionSupervisor::new(cfg.ws_url.clone(), token, state.selected_garden, policy);

    let (events_tx, mut events_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor_task = tokio::spawn(supervisor.run(events_tx, shutdown_rx));

    tracing::info!("Telemetry loop running; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            event = events_rx.recv() => {
                match event {
                    Some(SupervisorEvent::Stream(stream_event)) => {
                        state.apply(stream_event);
                        tracing::info!("{}", state.summary());
                    }
                    Some(SupervisorEvent::Transition(conn_state)) => {
                        tracing::info!("Stream state: {:?}", conn_state);
                        if conn_state == ConnState::Connected {
                            state.clear_stream_error();
                        }
                    }
                    Some(SupervisorEvent::TransportError(error)) => {
                        state.set_stream_error(error);
                    }
                    None => {
                        tracing::warn!("Event stream ended");
                        break;
                    }
                }
            }
        }
    }

    shutdown_tx.send(true).ok();
    // Dropping the receiver unblocks the supervisor if its channel is full.
    drop(events_rx);
    supervisor_task.await??;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `GREENHOUSE_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `GREENHOUSE_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("GREENHOUSE_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to GREENHOUSE_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("GREENHOUSE_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},tungstenite=warn,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
