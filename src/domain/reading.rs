// Raw transmitter reading domain models
use super::metrics::{derive_metrics, DerivedMetrics};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One digital status channel: the flag itself and whether it is in alarm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitalChannel {
    pub name: String,
    pub value: bool,
    pub alarm: bool,
}

/// One row of raw telemetry for a node (station), optionally scoped to a
/// base station. Missing analog channels are carried as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub node: String,
    pub base_station: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub forward_power: f64,
    pub reflected_power: f64,
    pub temperature: f64,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub digital: Vec<DigitalChannel>,
}

impl Reading {
    /// A reading with every analog channel at zero and no digital flags.
    pub fn empty(node: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            node: node.into(),
            base_station: None,
            timestamp,
            forward_power: 0.0,
            reflected_power: 0.0,
            temperature: 0.0,
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            digital: Vec::new(),
        }
    }

    /// Digital channels currently raising an alarm.
    pub fn active_alarms(&self) -> impl Iterator<Item = &DigitalChannel> {
        self.digital.iter().filter(|d| d.alarm)
    }
}

/// A reading together with the quantities derived from it, as served to
/// the dashboard table and charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRow {
    #[serde(flatten)]
    pub reading: Reading,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
}

impl From<Reading> for ReadingRow {
    fn from(reading: Reading) -> Self {
        let derived = derive_metrics(&reading);
        Self { reading, derived }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_row_carries_derived_metrics() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap();
        let mut reading = Reading::empty("node-1", ts);
        reading.forward_power = 100.0;
        reading.reflected_power = 1.0;

        let row = ReadingRow::from(reading);
        assert!(row.derived.vswr > 1.0);
        assert!(row.derived.return_loss_db < 0.0);
    }

    #[test]
    fn test_row_serializes_flat_camel_case() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap();
        let mut reading = Reading::empty("node-1", ts);
        reading.base_station = Some("bs-7".to_string());
        reading.digital.push(DigitalChannel {
            name: "door".to_string(),
            value: true,
            alarm: true,
        });

        let json = serde_json::to_value(ReadingRow::from(reading)).unwrap();
        assert_eq!(json["node"], "node-1");
        assert_eq!(json["baseStation"], "bs-7");
        assert_eq!(json["forwardPower"], 0.0);
        assert_eq!(json["vswr"], 1.0);
        assert_eq!(json["returnLossDb"], 0.0);
        assert_eq!(json["digital"][0]["alarm"], true);
    }

    #[test]
    fn test_active_alarms() {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 12, 0, 0).unwrap();
        let mut reading = Reading::empty("node-1", ts);
        reading.digital = vec![
            DigitalChannel { name: "door".to_string(), value: true, alarm: false },
            DigitalChannel { name: "psu".to_string(), value: false, alarm: true },
        ];

        let alarms: Vec<&str> = reading.active_alarms().map(|d| d.name.as_str()).collect();
        assert_eq!(alarms, vec!["psu"]);
    }
}
