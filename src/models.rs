//! Data models for the greenhouse telemetry client.
//!
//! Reference entities (`Garden`, `Device`) are owned by the backend and held
//! read-only here; `Reading` is the normalized unit of telemetry produced by
//! the event parser and served by the readings endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---

/// A named collection of devices; the user-facing unit of a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garden {
    // ---
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A physical device registered to a garden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    // ---
    pub id: i64,
    pub garden_id: i64,
    pub mac: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One observed value from one device at one instant.
///
/// Produced only by [`crate::event::normalize_reading`], which guarantees the
/// `device_id` and `timestamp` invariants; `value` stays untyped because the
/// wire carries both scalars and multi-field payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    // ---
    pub id: i64,
    pub device_id: i64,
    pub timestamp: DateTime<Utc>,
    pub value: Value,
    pub created_at: DateTime<Utc>,
}

/// Partial device update pushed over the stream; merged by id.
#[derive(Debug, Clone, Deserialize)]
pub struct DevicePatch {
    // ---
    pub id: i64,
    pub garden_id: Option<i64>,
    pub mac: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial garden update pushed over the stream; merged by id.
#[derive(Debug, Clone, Deserialize)]
pub struct GardenPatch {
    // ---
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    // ---
    pub fn merge(&mut self, patch: DevicePatch) {
        // ---
        if let Some(garden_id) = patch.garden_id {
            self.garden_id = garden_id;
        }
        if let Some(mac) = patch.mac {
            self.mac = mac;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }

    /// Human-readable name for a device type string.
    pub fn display_name(&self) -> String {
        // ---
        match self.kind.to_uppercase().as_str() {
            "SOIL_SENSOR" => "Soil Sensor".to_string(),
            "LIGHT" => "Light Control".to_string(),
            "TEMPERATURE_SENSOR" => "Temperature Sensor".to_string(),
            "HUMIDITY_SENSOR" => "Humidity Sensor".to_string(),
            "CAMERA" => "Camera".to_string(),
            _ => self.kind.replace('_', " "),
        }
    }
}

impl Garden {
    // ---
    pub fn merge(&mut self, patch: GardenPatch) {
        // ---
        if let Some(name) = patch.name {
            self.name = name;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

// ---

/// Extract a single numeric sample from a reading value.
///
/// Scalars are used directly; JSON-encoded strings are parsed first; for a
/// structured value the first numeric field wins. Anything else (including a
/// string that is not valid JSON) yields `None` and is excluded from
/// statistics.
pub fn extract_numeric(value: &Value) -> Option<f64> {
    // ---
    match value {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(inner) => first_numeric(&inner),
            Err(_) => None,
        },
        other => first_numeric(other),
    }
}

fn first_numeric(value: &Value) -> Option<f64> {
    // ---
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.values().find_map(|v| v.as_f64()),
        _ => None,
    }
}

/// Render a reading value for display/log output.
///
/// Structured values become one `key: value` line per field; a string that
/// parses as JSON is unwrapped first, otherwise shown verbatim; null shows as
/// "No data".
pub fn format_reading_value(value: &Value) -> String {
    // ---
    match value {
        Value::Null => "No data".to_string(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(inner) => format_reading_value(&inner),
            Err(_) => raw.clone(),
        },
        Value::Object(map) => map
            .iter()
            .map(|(key, val)| format!("{}: {}", key, format_scalar(val)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => format_scalar(other),
    }
}

fn format_scalar(value: &Value) -> String {
    // ---
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn create_test_device(kind: &str) -> Device {
        // ---
        Device {
            id: 7,
            garden_id: 1,
            mac: "AA:BB:CC:DD:EE:FF".to_string(),
            kind: kind.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
        }
    }

    #[test]
    fn test_numeric_extraction_scalar() {
        // ---
        assert_eq!(extract_numeric(&json!(22.5)), Some(22.5));
        assert_eq!(extract_numeric(&json!(0)), Some(0.0));
    }

    #[test]
    fn test_numeric_extraction_structured() {
        // ---
        // First numeric field wins, non-numeric fields are skipped
        let value = json!({"unit": "C", "temperature": 21.0, "humidity": 55.0});
        assert_eq!(extract_numeric(&value), Some(21.0));
    }

    #[test]
    fn test_numeric_extraction_json_string() {
        // ---
        assert_eq!(extract_numeric(&json!("42.5")), Some(42.5));
        assert_eq!(extract_numeric(&json!("{\"lux\": 5500}")), Some(5500.0));
        assert_eq!(extract_numeric(&json!("not json")), None);
    }

    #[test]
    fn test_numeric_extraction_rejects_non_numeric() {
        // ---
        assert_eq!(extract_numeric(&json!(null)), None);
        assert_eq!(extract_numeric(&json!(true)), None);
        assert_eq!(extract_numeric(&json!({"status": "ok"})), None);
        assert_eq!(extract_numeric(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_format_reading_value() {
        // ---
        assert_eq!(format_reading_value(&json!(null)), "No data");
        assert_eq!(format_reading_value(&json!(21.5)), "21.5");
        assert_eq!(format_reading_value(&json!("plain text")), "plain text");

        let structured = format_reading_value(&json!({"moisture": 40, "status": "ok"}));
        assert!(structured.contains("moisture: 40"));
        assert!(structured.contains("status: ok"));
    }

    #[test]
    fn test_device_display_names() {
        // ---
        assert_eq!(create_test_device("SOIL_SENSOR").display_name(), "Soil Sensor");
        assert_eq!(create_test_device("light").display_name(), "Light Control");
        assert_eq!(create_test_device("CAMERA").display_name(), "Camera");
        // Unknown types fall back to underscore replacement
        assert_eq!(create_test_device("CO2_SENSOR").display_name(), "CO2 SENSOR");
    }

    #[test]
    fn test_device_merge_is_partial() {
        // ---
        let mut device = create_test_device("LIGHT");
        let stamp = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        device.merge(DevicePatch {
            id: 7,
            garden_id: None,
            mac: None,
            kind: Some("CAMERA".to_string()),
            updated_at: Some(stamp),
        });

        assert_eq!(device.kind, "CAMERA");
        assert_eq!(device.mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(device.updated_at, stamp);
    }
}
