// Repository trait for transmitter reading access
use crate::domain::reading::Reading;
use crate::domain::time_window::TimeWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// List all node (station) ids that have reported readings
    async fn list_nodes(&self) -> anyhow::Result<Vec<String>>;

    /// List the base stations that have reported under a node
    async fn list_base_stations(&self, node: &str) -> anyhow::Result<Vec<String>>;

    /// Timestamp of the most recent reading, optionally restricted to a base station
    async fn latest_timestamp(
        &self,
        node: &str,
        base_station: Option<&str>,
    ) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Readings inside the window (inclusive), ordered by timestamp
    async fn fetch_readings(
        &self,
        node: &str,
        base_station: Option<&str>,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<Reading>>;
}
