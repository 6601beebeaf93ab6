//! Bounded point buffers backing the live trend charts.

use std::collections::VecDeque;

use serde::Serialize;

/// Points held per live chart.
pub const CHART_CAPACITY: usize = 10;

// ---

/// One chart point: a timestamp label and the value plotted at it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    // ---
    pub label: String,
    pub value: f64,
}

/// Append-only ring of the most recent chart points.
///
/// Insertion is append-to-end; once capacity is exceeded the oldest entry is
/// dropped, so the sequence is always chronological by arrival and never
/// longer than the capacity.
#[derive(Debug, Clone, Serialize)]
pub struct ChartBuffer {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

impl Default for ChartBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBuffer {
    // ---
    pub fn new() -> Self {
        Self::with_capacity(CHART_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        // ---
        ChartBuffer {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting from the front when over capacity.
    /// Non-finite values are plotted as `0.0` so a bad sample cannot break
    /// the chart renderer.
    pub fn push(&mut self, label: impl Into<String>, value: f64) {
        // ---
        let value = if value.is_finite() { value } else { 0.0 };
        self.points.push_back(ChartPoint {
            label: label.into(),
            value,
        });
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points for the chart renderer, oldest first. An empty buffer yields a
    /// single "No data" placeholder so renderers never see empty input.
    pub fn points(&self) -> Vec<ChartPoint> {
        // ---
        if self.points.is_empty() {
            return vec![ChartPoint {
                label: "No data".to_string(),
                value: 0.0,
            }];
        }
        self.points.iter().cloned().collect()
    }

    /// Raw values in arrival order, without the placeholder.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_length_never_exceeds_capacity() {
        // ---
        let mut buffer = ChartBuffer::new();
        for i in 0..25 {
            buffer.push(format!("t{i}"), i as f64);
            assert!(buffer.len() <= CHART_CAPACITY);
            assert_eq!(buffer.len(), (i + 1).min(CHART_CAPACITY));
        }
    }

    #[test]
    fn test_holds_most_recent_in_arrival_order() {
        // ---
        let mut buffer = ChartBuffer::new();
        for i in 1..=12 {
            buffer.push(format!("t{i}"), i as f64);
        }

        // 12 pushes into capacity 10 leaves exactly 3..=12, oldest first
        let expected: Vec<f64> = (3..=12).map(|i| i as f64).collect();
        assert_eq!(buffer.values(), expected);
    }

    #[test]
    fn test_empty_buffer_renders_placeholder() {
        // ---
        let buffer = ChartBuffer::new();
        let points = buffer.points();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].label, "No data");
        assert_eq!(points[0].value, 0.0);
    }

    #[test]
    fn test_non_finite_values_plot_as_zero() {
        // ---
        let mut buffer = ChartBuffer::new();
        buffer.push("t1", f64::NAN);
        buffer.push("t2", f64::INFINITY);
        buffer.push("t3", 21.0);

        assert_eq!(buffer.values(), vec![0.0, 0.0, 21.0]);
    }
}
