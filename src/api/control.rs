//! Device actuation and garden preference/configuration calls.

use anyhow::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiClient;

// ---

/// Actuators a device can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Actuator {
    Lights,
    Heater,
    Roof,
    Watering,
}

impl Actuator {
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Actuator::Lights => "lights",
            Actuator::Heater => "heater",
            Actuator::Roof => "roof",
            Actuator::Watering => "watering",
        }
    }
}

/// Actions accepted by the actuation endpoint. Which actions a given
/// actuator supports is the backend's call; the client stays permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    On,
    Off,
    Open,
    Close,
    Start,
    Stop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Action::On => "on",
            Action::Off => "off",
            Action::Open => "open",
            Action::Close => "close",
            Action::Start => "start",
            Action::Stop => "stop",
        }
    }
}

/// Consumer-selected acceptable ranges and watering window for a garden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GardenPreferences {
    // ---
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    /// Watering window bounds as `HH:MM`, both unset when disabled.
    pub watering_start: Option<String>,
    pub watering_end: Option<String>,
}

/// Partial preference update for PATCH.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreferencesPatch {
    // ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watering_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watering_end: Option<String>,
}

impl ApiClient {
    // ---
    pub async fn preferences(&self, garden_id: i64) -> Result<GardenPreferences> {
        self.get_json(&format!("/api/gardens/{garden_id}/preferences"))
            .await
    }

    pub async fn update_preferences(
        &self,
        garden_id: i64,
        patch: &PreferencesPatch,
    ) -> Result<GardenPreferences> {
        // ---
        self.send_json(
            Method::PATCH,
            &format!("/api/gardens/{garden_id}/preferences"),
            patch,
        )
        .await
    }

    /// Push an opaque configuration payload down to a garden's controller.
    pub async fn configure_garden(&self, garden_id: i64, payload: &Value) -> Result<()> {
        // ---
        self.send_json_discard(
            Method::POST,
            &format!("/api/gardens/{garden_id}/configure"),
            payload,
        )
        .await
    }

    /// Fire one actuator action, e.g. toggle the watering system.
    pub async fn actuate(&self, device_id: i64, actuator: Actuator, action: Action) -> Result<()> {
        // ---
        self.send_empty(
            Method::POST,
            &format!(
                "/api/devices/{device_id}/{}/{}",
                actuator.as_str(),
                action.as_str()
            ),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_actuator_path_segments() {
        // ---
        assert_eq!(Actuator::Lights.as_str(), "lights");
        assert_eq!(Actuator::Watering.as_str(), "watering");
        assert_eq!(Action::Open.as_str(), "open");
        assert_eq!(Action::Stop.as_str(), "stop");
    }

    #[test]
    fn test_preferences_patch_serializes_only_set_fields() {
        // ---
        let patch = PreferencesPatch {
            temperature_max: Some(28.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).expect("serializable");
        assert_eq!(json, serde_json::json!({"temperature_max": 28.0}));
    }
}
