//! Directional trend classification for live telemetry channels.
//!
//! Each logical metric (temperature, humidity, light level) keeps its own
//! previous value; the label is derived by comparing a new sample against
//! that value before it is overwritten.

use serde::Serialize;

// ---

/// Directional label for the most recent change in a channel's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    // ---
    pub fn classify(previous: f64, next: f64) -> Trend {
        // ---
        if next > previous {
            Trend::Up
        } else if next < previous {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

/// A logical telemetry metric tracked independently for trend purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Temperature,
    Humidity,
    Light,
}

impl Channel {
    /// Map a wire device type (`TEMPERATURE`, `TEMPERATURE_SENSOR`,
    /// `HUMIDITY`, `LIGHT`, ...) onto a channel. Types with no channel
    /// (cameras, soil sensors) return `None` and only feed the reading store.
    pub fn from_device_type(device_type: &str) -> Option<Channel> {
        // ---
        let upper = device_type.to_uppercase();
        if upper.starts_with("TEMPERATURE") {
            Some(Channel::Temperature)
        } else if upper.starts_with("HUMIDITY") {
            Some(Channel::Humidity)
        } else if upper.starts_with("LIGHT") {
            Some(Channel::Light)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        // ---
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Light => "light",
        }
    }
}

/// Live state for one channel: last accepted value plus its trend label.
///
/// The previous value is tracked as an `Option` so the first accepted sample
/// of a session classifies as `Stable` instead of comparing against a `0.0`
/// baseline and reading as a spurious "up".
#[derive(Debug, Clone, Serialize)]
pub struct ChannelTrend {
    previous: Option<f64>,
    pub current: f64,
    pub trend: Trend,
}

impl Default for ChannelTrend {
    fn default() -> Self {
        // ---
        ChannelTrend {
            previous: None,
            current: 0.0,
            trend: Trend::Stable,
        }
    }
}

impl ChannelTrend {
    /// Fold one accepted sample into the channel. The comparison happens
    /// against the value held before this call.
    pub fn observe(&mut self, next: f64) {
        // ---
        self.trend = match self.previous {
            Some(previous) => Trend::classify(previous, next),
            None => Trend::Stable,
        };
        self.previous = Some(next);
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_classify() {
        // ---
        assert_eq!(Trend::classify(20.0, 25.0), Trend::Up);
        assert_eq!(Trend::classify(25.0, 20.0), Trend::Down);
        assert_eq!(Trend::classify(20.0, 20.0), Trend::Stable);
    }

    #[test]
    fn test_first_sample_is_stable() {
        // ---
        let mut channel = ChannelTrend::default();
        channel.observe(21.5);

        assert_eq!(channel.trend, Trend::Stable);
        assert_eq!(channel.current, 21.5);
    }

    #[test]
    fn test_observe_compares_before_overwrite() {
        // ---
        let mut channel = ChannelTrend::default();
        channel.observe(20.0);
        channel.observe(25.0);
        assert_eq!(channel.trend, Trend::Up);

        channel.observe(25.0);
        assert_eq!(channel.trend, Trend::Stable);

        channel.observe(19.0);
        assert_eq!(channel.trend, Trend::Down);
    }

    #[test]
    fn test_channel_mapping() {
        // ---
        assert_eq!(
            Channel::from_device_type("TEMPERATURE"),
            Some(Channel::Temperature)
        );
        assert_eq!(
            Channel::from_device_type("temperature_sensor"),
            Some(Channel::Temperature)
        );
        assert_eq!(
            Channel::from_device_type("HUMIDITY_SENSOR"),
            Some(Channel::Humidity)
        );
        assert_eq!(Channel::from_device_type("LIGHT"), Some(Channel::Light));
        assert_eq!(Channel::from_device_type("CAMERA"), None);
        assert_eq!(Channel::from_device_type("SOIL_SENSOR"), None);
    }
}
