//! Normalization of raw inbound stream messages.
//!
//! Everything arriving over the event stream is untyped and inconsistently
//! shaped: payloads may nest the reading under `reading` or `data` (or be the
//! reading themselves), and the device id hides behind several aliases. All
//! of that tolerance lives here, behind a discriminated result, so the rest
//! of the pipeline only ever sees typed events.
//!
//! Malformed input is never an error for callers: it is classified, logged at
//! the boundary, and dropped.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{DevicePatch, GardenPatch, Reading};

// ---

/// Why an inbound message or reading was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The frame was not valid JSON.
    NotJson,
    /// No device id could be resolved from any alias.
    MissingDeviceId,
    /// The envelope announced a payload it did not carry (or carried a
    /// payload that does not deserialize).
    InvalidPayload(&'static str),
    /// Unrecognized `type`/`event` discriminator.
    UnknownType(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match self {
            Rejection::NotJson => write!(f, "message is not valid JSON"),
            Rejection::MissingDeviceId => write!(f, "no resolvable device id"),
            Rejection::InvalidPayload(kind) => write!(f, "invalid {kind} payload"),
            Rejection::UnknownType(kind) => write!(f, "unknown message type '{kind}'"),
        }
    }
}

impl std::error::Error for Rejection {}

/// A normalized `new_reading`/`reading_update` event.
///
/// The channel path (trend + chart) only needs `device_type` and `value`;
/// the store path needs a fully resolved [`Reading`]. The two can diverge:
/// an event without a resolvable device id still carries a value worth
/// plotting, so `reading` is optional while `value` is not.
#[derive(Debug, Clone)]
pub struct ReadingEvent {
    // ---
    pub device_type: Option<String>,
    pub value: Value,
    pub observed_at: DateTime<Utc>,
    pub reading: Option<Reading>,
}

/// One classified inbound stream message.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    NewReading(ReadingEvent),
    DeviceUpdate(DevicePatch),
    GardenUpdate(GardenPatch),
}

// ---

/// Classify one raw text frame into a [`StreamEvent`].
///
/// `received_at` is the arrival time, used wherever the payload omits its
/// own timestamps.
pub fn classify_message(text: &str, received_at: DateTime<Utc>) -> Result<StreamEvent, Rejection> {
    // ---
    let raw: Value = serde_json::from_str(text).map_err(|_| Rejection::NotJson)?;

    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| raw.get("event").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        "new_reading" | "reading_update" => {
            // The reading may be nested or be the envelope itself.
            let payload = raw.get("reading").or_else(|| raw.get("data")).unwrap_or(&raw);

            let device_type = raw
                .get("device_type")
                .and_then(Value::as_str)
                .map(str::to_string);

            let reading = match normalize_reading(payload, received_at) {
                Ok(reading) => Some(reading),
                Err(rejection) => {
                    tracing::debug!("Discarding reading from {} event: {}", kind, rejection);
                    None
                }
            };

            Ok(StreamEvent::NewReading(ReadingEvent {
                device_type,
                value: resolve_value(payload),
                observed_at: resolve_timestamp(payload, received_at),
                reading,
            }))
        }
        "device_update" => {
            let payload = raw
                .get("device")
                .ok_or(Rejection::InvalidPayload("device"))?;
            let patch: DevicePatch = serde_json::from_value(payload.clone())
                .map_err(|_| Rejection::InvalidPayload("device"))?;
            Ok(StreamEvent::DeviceUpdate(patch))
        }
        "garden_update" => {
            let payload = raw
                .get("garden")
                .ok_or(Rejection::InvalidPayload("garden"))?;
            let patch: GardenPatch = serde_json::from_value(payload.clone())
                .map_err(|_| Rejection::InvalidPayload("garden"))?;
            Ok(StreamEvent::GardenUpdate(patch))
        }
        other => Err(Rejection::UnknownType(other.to_string())),
    }
}

/// Normalize an untyped payload into a [`Reading`].
///
/// Field aliases, in resolution order:
/// - device id: `device_id` → `deviceId` → `device.id`
/// - timestamp: `timestamp` → `created_at` → arrival time
/// - value: `value` → `data` → the whole payload
/// - id: `id`, synthesized from the arrival wall clock when absent
///
/// A payload with no resolvable device id is rejected.
pub fn normalize_reading(raw: &Value, received_at: DateTime<Utc>) -> Result<Reading, Rejection> {
    // ---
    let device_id = raw
        .get("device_id")
        .and_then(as_id)
        .or_else(|| raw.get("deviceId").and_then(as_id))
        .or_else(|| raw.get("device").and_then(|d| d.get("id")).and_then(as_id))
        .ok_or(Rejection::MissingDeviceId)?;

    let id = raw
        .get("id")
        .and_then(as_id)
        .unwrap_or_else(|| received_at.timestamp_millis());

    let timestamp = resolve_timestamp(raw, received_at);
    let created_at = raw
        .get("created_at")
        .and_then(parse_timestamp)
        .unwrap_or(timestamp);

    Ok(Reading {
        id,
        device_id,
        timestamp,
        value: resolve_value(raw),
        created_at,
    })
}

fn resolve_value(raw: &Value) -> Value {
    // ---
    raw.get("value")
        .or_else(|| raw.get("data"))
        .cloned()
        .unwrap_or_else(|| raw.clone())
}

fn resolve_timestamp(raw: &Value, received_at: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    raw.get("timestamp")
        .and_then(parse_timestamp)
        .or_else(|| raw.get("created_at").and_then(parse_timestamp))
        .unwrap_or(received_at)
}

/// Ids arrive as numbers or numeric strings.
fn as_id(value: &Value) -> Option<i64> {
    // ---
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Timestamps arrive as RFC 3339 strings or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    // ---
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
