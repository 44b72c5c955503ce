// InfluxDB repository implementation
use crate::application::reading_repository::ReadingRepository;
use crate::domain::reading::{DigitalChannel, Reading};
use crate::domain::time_window::TimeWindow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const DIGITAL_PREFIX: &str = "digital_";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl InfluxQLResponse {
    fn series(&self) -> impl Iterator<Item = &InfluxQLSeries> {
        self.results
            .first()
            .and_then(|r| r.series.as_ref())
            .into_iter()
            .flatten()
    }
}

impl InfluxRepository {
    pub fn new(
        host: String,
        token: String,
        database: String,
        retention_policy: String,
        measurement: String,
    ) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
            measurement,
            client: reqwest::Client::new(),
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host, self.database, self.retention_policy, encoded_query
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        tracing::debug!("Executing InfluxQL: {}", query);
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        if let Some(error) = data.results.first().and_then(|r| r.error.as_ref()) {
            anyhow::bail!("InfluxDB query error: {}", error);
        }

        Ok(data)
    }

    fn station_filter(node: &str, base_station: Option<&str>) -> String {
        let mut filter = format!("\"node\" = '{}'", escape_literal(node));
        if let Some(bs) = base_station {
            filter.push_str(&format!(" AND \"base_station\" = '{}'", escape_literal(bs)));
        }
        filter
    }

    /// Newest row of any field; `LAST(field)` would skip rows where that
    /// field is null, and `LAST(*)` reports epoch-0 times.
    fn latest_query(&self, node: &str, base_station: Option<&str>) -> String {
        format!(
            "SELECT * FROM \"{}\" WHERE {} ORDER BY time DESC LIMIT 1",
            self.measurement,
            Self::station_filter(node, base_station)
        )
    }

    fn readings_query(&self, node: &str, base_station: Option<&str>, window: &TimeWindow) -> String {
        format!(
            "SELECT * FROM \"{}\" WHERE {} AND time >= '{}' AND time <= '{}' ORDER BY time ASC",
            self.measurement,
            Self::station_filter(node, base_station),
            window.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            window.end.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

#[async_trait]
impl ReadingRepository for InfluxRepository {
    async fn list_nodes(&self) -> Result<Vec<String>> {
        let query = format!("SHOW TAG VALUES FROM \"{}\" WITH KEY = \"node\"", self.measurement);
        let response = self.execute_query(&query).await?;
        Ok(tag_values(&response))
    }

    async fn list_base_stations(&self, node: &str) -> Result<Vec<String>> {
        let query = format!(
            "SHOW TAG VALUES FROM \"{}\" WITH KEY = \"base_station\" WHERE {}",
            self.measurement,
            Self::station_filter(node, None)
        );
        let response = self.execute_query(&query).await?;
        Ok(tag_values(&response))
    }

    async fn latest_timestamp(
        &self,
        node: &str,
        base_station: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>> {
        let query = self.latest_query(node, base_station);
        let response = self.execute_query(&query).await?;

        Ok(latest_time(&response))
    }

    async fn fetch_readings(
        &self,
        node: &str,
        base_station: Option<&str>,
        window: &TimeWindow,
    ) -> Result<Vec<Reading>> {
        let query = self.readings_query(node, base_station, window);
        let response = self.execute_query(&query).await?;

        let readings: Vec<Reading> = response
            .series()
            .flat_map(|s| parse_readings(s, node))
            .collect();

        tracing::debug!("Parsed {} readings for node {}", readings.len(), node);
        Ok(readings)
    }
}

/// Time column of the first row of the first series.
fn latest_time(response: &InfluxQLResponse) -> Option<DateTime<Utc>> {
    response.series().find_map(|s| {
        let time_idx = s.columns.iter().position(|c| c == "time")?;
        s.values.first()?.get(time_idx).and_then(parse_time)
    })
}

/// Values of a `SHOW TAG VALUES` result (column 1 is the value).
fn tag_values(response: &InfluxQLResponse) -> Vec<String> {
    response
        .series()
        .flat_map(|s| s.values.iter())
        .filter_map(|row| row.get(1)?.as_str().map(str::to_string))
        .collect()
}

/// Map every row of a `SELECT *` series to a reading. Rows without a
/// parseable time are skipped; missing analog fields default to zero.
fn parse_readings(series: &InfluxQLSeries, node: &str) -> Vec<Reading> {
    let mut readings = Vec::with_capacity(series.values.len());

    for row in &series.values {
        let fields: BTreeMap<&str, &Value> = series
            .columns
            .iter()
            .map(String::as_str)
            .zip(row.iter())
            .collect();

        let Some(timestamp) = fields.get("time").and_then(|v| parse_time(v)) else {
            tracing::warn!("Skipping reading for node {} without a valid time", node);
            continue;
        };

        let number = |name: &str| fields.get(name).and_then(|v| v.as_f64()).unwrap_or(0.0);

        let node_name = fields.get("node").and_then(|v| v.as_str()).unwrap_or(node);
        let mut reading = Reading::empty(node_name, timestamp);
        reading.base_station = fields
            .get("base_station")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        reading.forward_power = number("forward_power");
        reading.reflected_power = number("reflected_power");
        reading.temperature = number("temperature");
        reading.voltage = number("voltage");
        reading.current = number("current");
        reading.power = number("power");
        reading.digital = parse_digital(&fields);
        readings.push(reading);
    }

    readings
}

/// Digital channels are stored as `digital_<name>_value` and
/// `digital_<name>_alarm` field pairs.
fn parse_digital(fields: &BTreeMap<&str, &Value>) -> Vec<DigitalChannel> {
    let mut channels: BTreeMap<&str, DigitalChannel> = BTreeMap::new();

    for (column, value) in fields {
        let Some(rest) = column.strip_prefix(DIGITAL_PREFIX) else {
            continue;
        };
        let Some(flag) = as_flag(value) else {
            continue;
        };

        let (name, is_alarm) = if let Some(name) = rest.strip_suffix("_alarm") {
            (name, true)
        } else if let Some(name) = rest.strip_suffix("_value") {
            (name, false)
        } else {
            continue;
        };

        let channel = channels.entry(name).or_insert_with(|| DigitalChannel {
            name: name.to_string(),
            value: false,
            alarm: false,
        });
        if is_alarm {
            channel.alarm = flag;
        } else {
            channel.value = flag;
        }
    }

    channels.into_values().collect()
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
