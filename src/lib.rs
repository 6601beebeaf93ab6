//! Client library for the greenhouse monitoring backend.
//!
//! The crate folds a continuous stream of device readings into live,
//! queryable telemetry state:
//! - [`event`] normalizes untyped wire payloads into typed events
//! - [`trend`] derives directional labels per telemetry channel
//! - [`chart`] keeps the bounded point buffers behind the trend charts
//! - [`store`] keeps deduplicated per-device reading histories with
//!   filter/sort/statistics views
//! - [`state`] is the reducer tying the above together
//! - [`ws`] supervises the event-stream connection with bounded reconnects
//! - [`api`] is the typed REST client (bootstrap, schedules, actuation)
//!
//! The binary in `main.rs` wires these into a long-running client; the
//! library boundary exists so the full pipeline is testable in-process.

pub mod api;
pub mod chart;
pub mod config;
pub mod event;
pub mod models;
pub mod state;
pub mod store;
pub mod token;
pub mod trend;
pub mod ws;

pub use config::Config;

// Re-exported so downstream code (including the binary and tests) can reach
// the common types without knowing which sibling module owns them.
pub use models::{Device, Garden, Reading};
pub use state::TelemetryState;
