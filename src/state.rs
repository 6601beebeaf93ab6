//! The telemetry state reducer.
//!
//! All live screen state lives in one [`TelemetryState`] with an explicit
//! [`TelemetryState::apply`] transition, so the whole fold from stream event
//! to rendered state is testable without a connection. One instance belongs
//! to one supervisor/reduce loop; updates are serialized by the event channel,
//! so no locking is needed.

use chrono::Local;
use serde::Serialize;

use crate::chart::ChartBuffer;
use crate::event::{ReadingEvent, StreamEvent};
use crate::models::{extract_numeric, Device, Garden};
use crate::store::ReadingStore;
use crate::trend::{Channel, ChannelTrend};

// ---

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetryState {
    // ---
    pub gardens: Vec<Garden>,
    pub selected_garden: Option<i64>,
    pub devices: Vec<Device>,

    pub temperature: ChannelTrend,
    pub humidity: ChannelTrend,
    pub light: ChannelTrend,

    pub temperature_chart: ChartBuffer,
    pub humidity_chart: ChartBuffer,

    pub store: ReadingStore,

    /// Sticky transport error; set on stream failures, cleared when a
    /// connection is (re)established.
    pub stream_error: Option<String>,
}

impl TelemetryState {
    // ---
    /// Replace the garden catalog; the first garden is auto-selected when
    /// nothing is selected yet.
    pub fn set_gardens(&mut self, gardens: Vec<Garden>) {
        // ---
        if self.selected_garden.is_none() {
            self.selected_garden = gardens.first().map(|g| g.id);
        }
        self.gardens = gardens;
    }

    pub fn select_garden(&mut self, garden_id: i64) {
        self.selected_garden = Some(garden_id);
    }

    pub fn set_devices(&mut self, devices: Vec<Device>) {
        self.devices = devices;
    }

    pub fn set_stream_error(&mut self, error: String) {
        self.stream_error = Some(error);
    }

    pub fn clear_stream_error(&mut self) {
        self.stream_error = None;
    }

    pub fn channel(&self, channel: Channel) -> &ChannelTrend {
        // ---
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::Humidity => &self.humidity,
            Channel::Light => &self.light,
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut ChannelTrend {
        // ---
        match channel {
            Channel::Temperature => &mut self.temperature,
            Channel::Humidity => &mut self.humidity,
            Channel::Light => &mut self.light,
        }
    }

    /// Fold one classified stream event into the state.
    pub fn apply(&mut self, event: StreamEvent) {
        // ---
        match event {
            StreamEvent::NewReading(reading_event) => self.apply_reading(reading_event),
            StreamEvent::DeviceUpdate(patch) => {
                match self.devices.iter_mut().find(|d| d.id == patch.id) {
                    Some(device) => device.merge(patch),
                    None => tracing::debug!("Device update for unknown device {}", patch.id),
                }
            }
            StreamEvent::GardenUpdate(patch) => {
                match self.gardens.iter_mut().find(|g| g.id == patch.id) {
                    Some(garden) => garden.merge(patch),
                    None => tracing::debug!("Garden update for unknown garden {}", patch.id),
                }
            }
        }
    }

    fn apply_reading(&mut self, event: ReadingEvent) {
        // ---
        // Channel routing: an envelope that names a device_type is
        // authoritative; only an untyped envelope falls back to the catalog
        // entry for the reading's device.
        let channel = match event.device_type.as_deref() {
            Some(device_type) => Channel::from_device_type(device_type),
            None => event.reading.as_ref().and_then(|reading| {
                self.devices
                    .iter()
                    .find(|d| d.id == reading.device_id)
                    .and_then(|d| Channel::from_device_type(&d.kind))
            }),
        };

        if let Some(channel) = channel {
            let label = event
                .observed_at
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string();

            match extract_numeric(&event.value) {
                Some(sample) => {
                    self.channel_mut(channel).observe(sample);
                    self.push_chart_point(channel, label, sample);
                }
                // Unreadable value: plot a zero point, leave the trend alone.
                None => self.push_chart_point(channel, label, 0.0),
            }
        }

        if let Some(reading) = event.reading {
            let device_id = reading.device_id;
            if !self.store.ingest(reading) {
                tracing::debug!("Duplicate reading for device {}, skipping", device_id);
            }
        }
    }

    fn push_chart_point(&mut self, channel: Channel, label: String, value: f64) {
        // ---
        match channel {
            Channel::Temperature => self.temperature_chart.push(label, value),
            Channel::Humidity => self.humidity_chart.push(label, value),
            // The light channel has a trend card but no chart.
            Channel::Light => {}
        }
    }

    /// One-line state summary for the log output.
    pub fn summary(&self) -> String {
        // ---
        format!(
            "temperature {:.1} ({}) | humidity {:.1} ({}) | light {:.1} ({}) | {} readings across {} devices",
            self.temperature.current,
            self.temperature.trend.as_str(),
            self.humidity.current,
            self.humidity.trend.as_str(),
            self.light.current,
            self.light.trend.as_str(),
            self.store.total_readings(),
            self.devices.len(),
        )
    }
}
