//! Schedule CRUD against `/api/schedules/{gardenId}[/{id}]`.
//!
//! Schedules are plain backend resources; the actual cron execution lives
//! server-side, so this module is only the typed editing surface.

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::ApiClient;

// ---

/// A stored automation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    // ---
    pub id: i64,
    pub garden_id: i64,
    pub device_id: i64,
    /// Actuator action to run, e.g. `watering/start`.
    pub action: String,
    /// Cron expression evaluated by the backend.
    pub cron: String,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create/update payload; the backend assigns ids and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRequest {
    // ---
    pub device_id: i64,
    pub action: String,
    pub cron: String,
    pub enabled: bool,
}

impl ApiClient {
    // ---
    pub async fn schedules(&self, garden_id: i64) -> Result<Vec<Schedule>> {
        self.get_json(&format!("/api/schedules/{garden_id}")).await
    }

    pub async fn create_schedule(
        &self,
        garden_id: i64,
        request: &ScheduleRequest,
    ) -> Result<Schedule> {
        // ---
        self.send_json(Method::POST, &format!("/api/schedules/{garden_id}"), request)
            .await
    }

    pub async fn update_schedule(
        &self,
        garden_id: i64,
        schedule_id: i64,
        request: &ScheduleRequest,
    ) -> Result<Schedule> {
        // ---
        self.send_json(
            Method::PUT,
            &format!("/api/schedules/{garden_id}/{schedule_id}"),
            request,
        )
        .await
    }

    pub async fn delete_schedule(&self, garden_id: i64, schedule_id: i64) -> Result<()> {
        // ---
        self.send_empty(
            Method::DELETE,
            &format!("/api/schedules/{garden_id}/{schedule_id}"),
        )
        .await
    }
}
