// Telemetry service - Use case for windowed reading rows
use crate::application::reading_repository::ReadingRepository;
use crate::application::service_error::ServiceError;
use crate::domain::reading::ReadingRow;
use crate::domain::time_window::{resolve_window, Period, TimeWindow};
use std::sync::Arc;

/// Filters for one data request, as received from the dashboard.
#[derive(Debug, Clone, Default)]
pub struct ReadingQuery {
    pub node: String,
    pub base_station: Option<String>,
    pub period: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Rows for a resolved window. `window` is `None` when the station has
/// never reported, in which case `rows` is empty.
#[derive(Debug, Clone, Default)]
pub struct WindowedRows {
    pub window: Option<TimeWindow>,
    pub rows: Vec<ReadingRow>,
}

#[derive(Clone)]
pub struct TelemetryService {
    repository: Arc<dyn ReadingRepository>,
}

impl TelemetryService {
    pub fn new(repository: Arc<dyn ReadingRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_readings(&self, query: &ReadingQuery) -> Result<Vec<ReadingRow>, ServiceError> {
        Ok(self.load(query).await?.rows)
    }

    /// Resolve the window, fetch the readings and derive metrics per row.
    pub async fn load(&self, query: &ReadingQuery) -> Result<WindowedRows, ServiceError> {
        // reject bad tokens before touching the store
        let period: Period = query.period.parse()?;
        let base_station = query
            .base_station
            .as_deref()
            .filter(|bs| !bs.trim().is_empty());

        let latest = match period {
            Period::Custom => None,
            _ => {
                self.repository
                    .latest_timestamp(&query.node, base_station)
                    .await?
            }
        };

        let window = resolve_window(
            &query.period,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            latest,
        )?;

        let Some(window) = window else {
            tracing::debug!(
                "No readings stored for node {} (base station {:?}), returning empty {} window",
                query.node,
                base_station,
                period
            );
            return Ok(WindowedRows::default());
        };

        let mut readings = self
            .repository
            .fetch_readings(&query.node, base_station, &window)
            .await?;

        // the store should filter and order rows already; don't rely on it
        readings.retain(|r| window.contains(r.timestamp));
        readings.sort_by_key(|r| r.timestamp);

        tracing::debug!(
            "Fetched {} readings for node {} between {} and {}",
            readings.len(),
            query.node,
            window.start,
            window.end
        );

        Ok(WindowedRows {
            window: Some(window),
            rows: readings.into_iter().map(ReadingRow::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reading_repository::fake::FakeRepository;
    use crate::domain::error::CoreError;
    use crate::domain::reading::Reading;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 6, 0, 0).unwrap()
    }

    fn reading(node: &str, bs: &str, offset_hours: i64) -> Reading {
        let mut r = Reading::empty(node, base() + Duration::hours(offset_hours));
        r.base_station = Some(bs.to_string());
        r.forward_power = 100.0;
        r.reflected_power = 1.0;
        r
    }

    fn query(period: &str) -> ReadingQuery {
        ReadingQuery {
            node: "north".to_string(),
            period: period.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_window_anchors_on_latest_reading() {
        // latest data is long in the past; a wall-clock anchor would find nothing
        let repo = FakeRepository::with_readings(vec![
            reading("north", "bs-1", 0),
            reading("north", "bs-1", 30),
            reading("north", "bs-1", 48),
            reading("north", "bs-2", 47),
        ]);
        let service = TelemetryService::new(Arc::new(repo));

        let loaded = service.load(&query("24h")).await.unwrap();
        let window = loaded.window.unwrap();
        assert_eq!(window.end, base() + Duration::hours(48));
        assert_eq!(loaded.rows.len(), 3);
        assert!(loaded.rows.windows(2).all(|w| w[0].reading.timestamp <= w[1].reading.timestamp));
        assert!(loaded.rows.iter().all(|r| r.derived.vswr > 1.0));
    }

    #[tokio::test]
    async fn test_base_station_filter() {
        let repo = FakeRepository::with_readings(vec![
            reading("north", "bs-1", 0),
            reading("north", "bs-2", 1),
        ]);
        let service = TelemetryService::new(Arc::new(repo));

        let mut q = query("7d");
        q.base_station = Some("bs-1".to_string());
        let rows = service.get_readings(&q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reading.base_station.as_deref(), Some("bs-1"));

        // blank filter means all base stations
        q.base_station = Some(String::new());
        assert_eq!(service.get_readings(&q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_station_is_empty_without_query() {
        let repo = Arc::new(FakeRepository::with_readings(vec![reading("north", "bs-1", 0)]));
        let service = TelemetryService::new(repo.clone());

        let mut q = query("30d");
        q.node = "south".to_string();
        let loaded = service.load(&q).await.unwrap();
        assert!(loaded.window.is_none());
        assert!(loaded.rows.is_empty());
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_range() {
        let repo = FakeRepository::with_readings(vec![
            reading("north", "bs-1", 0),
            reading("north", "bs-1", 17),
            reading("north", "bs-1", 18),
        ]);
        let service = TelemetryService::new(Arc::new(repo));

        let mut q = query("custom");
        q.start_date = Some("2024-11-20".to_string());
        q.end_date = Some("2024-11-20".to_string());
        // 06:00 and 23:00 on the 20th, not 00:00 on the 21st
        assert_eq!(service.get_readings(&q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let repo = Arc::new(FakeRepository::failing());
        let service = TelemetryService::new(repo.clone());

        let err = service.get_readings(&query("bogus")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::InvalidPeriod(_))));

        let mut q = query("custom");
        q.start_date = Some("2025-02-05".to_string());
        q.end_date = Some("2025-02-03".to_string());
        let err = service.get_readings(&q).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::InvalidRange(_))));
    }

    #[tokio::test]
    async fn test_repository_failure_propagates() {
        let service = TelemetryService::new(Arc::new(FakeRepository::failing()));
        let err = service.get_readings(&query("24h")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Repository(_)));
    }
}
