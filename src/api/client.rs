//! Core REST client: authentication, request plumbing, and the telemetry
//! fetches (gardens, devices, readings).
//!
//! Every call attaches the bearer credential and maps non-2xx statuses to
//! errors with enough context to be actionable in the log; there is no
//! standardized error body to parse beyond the status code.

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::event::normalize_reading;
use crate::models::{Device, Garden, Reading};

// ---

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    // ---
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        // ---
        let base_url: String = base_url.into();
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        // ---
        let url = self.endpoint(path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;

        response
            .json()
            .await
            .with_context(|| format!("GET {url} returned malformed JSON"))
    }

    pub(crate) async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        // ---
        let url = self.endpoint(path);
        let response = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{method} {url}"))?;

        response
            .json()
            .await
            .with_context(|| format!("{method} {url} returned malformed JSON"))
    }

    /// Request with a JSON body whose response carries nothing beyond the
    /// status code.
    pub(crate) async fn send_json_discard<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<()> {
        // ---
        let url = self.endpoint(path);
        self.http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{method} {url}"))?;

        Ok(())
    }

    /// Request with no body and no interesting response beyond the status.
    pub(crate) async fn send_empty(&self, method: Method, path: &str) -> Result<()> {
        // ---
        let url = self.endpoint(path);
        self.http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{method} {url}"))?;

        Ok(())
    }

    // ---

    pub async fn gardens(&self) -> Result<Vec<Garden>> {
        self.get_json("/api/gardens/").await
    }

    pub async fn devices(&self, garden_id: i64) -> Result<Vec<Device>> {
        self.get_json(&format!("/api/devices/{garden_id}")).await
    }

    /// Fetch one device's reading history.
    ///
    /// The endpoint serves the same loosely shaped records as the stream, so
    /// each item goes through the normalizer; items that fail to normalize
    /// are logged and skipped rather than failing the fetch.
    pub async fn device_readings(&self, device_id: i64) -> Result<Vec<Reading>> {
        // ---
        let items: Vec<serde_json::Value> = self
            .get_json(&format!("/api/readings/device/{device_id}"))
            .await?;

        let received_at = Utc::now();
        let mut readings = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match normalize_reading(item, received_at) {
                Ok(reading) => readings.push(reading),
                Err(rejection) => {
                    tracing::debug!(
                        "Skipping reading {} for device {}: {} - Raw item: {}",
                        i,
                        device_id,
                        rejection,
                        item
                    );
                }
            }
        }

        Ok(readings)
    }

    /// Fetch reading histories for a set of devices concurrently.
    ///
    /// Failures are captured per device so one failing fetch never blocks
    /// the rest of the batch.
    pub async fn readings_by_device(
        &self,
        devices: &[Device],
    ) -> Vec<(i64, Result<Vec<Reading>>)> {
        // ---
        let fetches = devices.iter().map(|device| {
            let device_id = device.id;
            async move { (device_id, self.device_readings(device_id).await) }
        });

        join_all(fetches).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_endpoint_building() {
        // ---
        let client = ApiClient::new("http://localhost:3000/", "token");
        assert_eq!(
            client.endpoint("/api/gardens/"),
            "http://localhost:3000/api/gardens/"
        );
        assert_eq!(
            client.endpoint("/api/readings/device/7"),
            "http://localhost:3000/api/readings/device/7"
        );
    }
}
