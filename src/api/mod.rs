//! Gateway module for the backend REST client.
//!
//! Sibling modules each own one slice of the API surface and extend
//! [`ApiClient`] with their calls; this gateway re-exports the public pieces
//! and composes the full state-refresh sequence so callers only depend on
//! `crate::api`.

use anyhow::Result;

use crate::state::TelemetryState;

mod client;
mod control;
mod schedules;

// ---

pub use client::ApiClient;
pub use control::{Action, Actuator, GardenPreferences, PreferencesPatch};
pub use schedules::{Schedule, ScheduleRequest};

/// Load (or reload) the reference entities and reading histories into state.
///
/// Used both for the initial bootstrap and for refresh-on-demand; the same
/// sequence runs in both cases. One failing device fetch is recorded on that
/// device's history and never aborts the rest of the batch.
pub async fn refresh(api: &ApiClient, state: &mut TelemetryState) -> Result<()> {
    // ---
    // Step 1: gardens, auto-selecting the first
    let gardens = api.gardens().await?;
    tracing::info!("Loaded {} gardens", gardens.len());
    state.set_gardens(gardens);

    let Some(garden_id) = state.selected_garden else {
        tracing::warn!("No gardens available; running stream-only");
        return Ok(());
    };

    // Step 2: the selected garden's devices
    let devices = api.devices(garden_id).await?;
    tracing::info!("Garden {} has {} devices", garden_id, devices.len());

    // Step 3: reading histories, fetched concurrently per device
    for (device_id, outcome) in api.readings_by_device(&devices).await {
        match outcome {
            Ok(readings) => {
                tracing::debug!("Device {}: {} readings", device_id, readings.len());
                state.store.seed(device_id, readings);
            }
            Err(error) => {
                tracing::error!(
                    "Failed to fetch readings for device {}: {:#}",
                    device_id,
                    error
                );
                state
                    .store
                    .record_fetch_error(device_id, "Failed to load readings".to_string());
            }
        }
    }

    state.set_devices(devices);
    Ok(())
}
