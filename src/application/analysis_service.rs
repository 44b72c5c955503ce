// Analysis service - Use case for generating the narration report
use crate::application::service_error::ServiceError;
use crate::application::telemetry_service::{ReadingQuery, TelemetryService};
use crate::domain::error::CoreError;
use crate::domain::metrics::{derive_return_loss, derive_vswr};
use crate::domain::narration::{generate_narration, Metric, NarrationReport};
use crate::domain::reading::ReadingRow;
use crate::domain::statistics::{summarize, MetricSummary};
use crate::domain::time_window::TimeWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A metric array as posted by the dashboard; `null` entries are missing
/// samples and count as zero.
pub type Series = Vec<Option<f64>>;

/// Body of `POST /api/analyze`: the series the dashboard is currently
/// charting for one station.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub station_id: String,
    #[serde(default)]
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub forward_power: Series,
    #[serde(default)]
    pub reflected_power: Series,
    /// Derived from forward/reflected power when absent.
    pub vswr: Option<Series>,
    pub return_loss: Option<Series>,
    #[serde(default)]
    pub temperature: Series,
    #[serde(default)]
    pub voltage: Series,
    #[serde(default)]
    pub current: Series,
    #[serde(default)]
    pub power: Series,
    pub latency: Option<Series>,
    pub packet_loss: Option<Series>,
    pub signal_strength: Option<Series>,
}

impl AnalysisRequest {
    /// At least one timestamp and one non-empty metric array.
    fn has_samples(&self) -> bool {
        let required = [
            &self.forward_power,
            &self.reflected_power,
            &self.temperature,
            &self.voltage,
            &self.current,
            &self.power,
        ];
        let optional = [
            &self.vswr,
            &self.return_loss,
            &self.latency,
            &self.packet_loss,
            &self.signal_strength,
        ];

        !self.timestamps.is_empty()
            && (required.iter().any(|s| !s.is_empty())
                || optional.into_iter().flatten().any(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub station_id: String,
    pub window: Option<TimeWindow>,
    pub sample_count: usize,
    pub summaries: BTreeMap<Metric, MetricSummary>,
    /// Digital channels that raised an alarm at least once in the window.
    pub active_alarms: Vec<String>,
    /// Absent when there were no samples to analyse.
    pub report: Option<NarrationReport>,
    pub text: String,
    pub html: String,
}

impl AnalysisOutcome {
    fn from_report(
        report: NarrationReport,
        window: Option<TimeWindow>,
        sample_count: usize,
        summaries: BTreeMap<Metric, MetricSummary>,
    ) -> Self {
        Self {
            station_id: report.station_id.clone(),
            window,
            sample_count,
            summaries,
            active_alarms: Vec::new(),
            text: report.render_text(),
            html: report.render_html(),
            report: Some(report),
        }
    }

    fn no_data(station_id: &str, window: Option<TimeWindow>) -> Self {
        let message = format!("No data available for station {} in the selected period.", station_id);
        Self {
            station_id: station_id.to_string(),
            window,
            sample_count: 0,
            summaries: BTreeMap::new(),
            active_alarms: Vec::new(),
            report: None,
            html: format!("<p>{}</p>", message),
            text: message,
        }
    }
}

#[derive(Clone)]
pub struct AnalysisService {
    telemetry: TelemetryService,
}

impl AnalysisService {
    pub fn new(telemetry: TelemetryService) -> Self {
        Self { telemetry }
    }

    /// Narration for the readings of a resolved window.
    pub async fn analyze_window(&self, query: &ReadingQuery) -> Result<AnalysisOutcome, ServiceError> {
        let loaded = self.telemetry.load(query).await?;
        if loaded.rows.is_empty() {
            return Ok(AnalysisOutcome::no_data(&query.node, loaded.window));
        }

        let summaries = summarize_rows(&loaded.rows);
        let report = generate_narration(&query.node, &summaries)?;
        tracing::info!(
            "Generated analysis for node {} over {} readings",
            query.node,
            loaded.rows.len()
        );

        let mut outcome =
            AnalysisOutcome::from_report(report, loaded.window, loaded.rows.len(), summaries);
        outcome.active_alarms = active_alarms(&loaded.rows);
        Ok(outcome)
    }

    /// Narration for series supplied directly by the client.
    pub fn analyze_series(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, ServiceError> {
        let station_id = request.station_id.trim();
        if station_id.is_empty() {
            return Err(CoreError::InvalidInput("station id is empty".to_string()).into());
        }
        if !request.has_samples() {
            return Ok(AnalysisOutcome::no_data(station_id, None));
        }

        let summaries = summarize_request(request)?;
        let report = generate_narration(&request.station_id, &summaries)?;
        Ok(AnalysisOutcome::from_report(
            report,
            None,
            request.timestamps.len(),
            summaries,
        ))
    }
}

/// One summary per required metric over a set of rows.
pub fn summarize_rows(rows: &[ReadingRow]) -> BTreeMap<Metric, MetricSummary> {
    let timestamps: Vec<DateTime<Utc>> = rows.iter().map(|r| r.reading.timestamp).collect();
    let column = |pick: fn(&ReadingRow) -> f64| -> Vec<f64> { rows.iter().map(pick).collect() };

    let columns: [(Metric, fn(&ReadingRow) -> f64); 8] = [
        (Metric::ForwardPower, |r| r.reading.forward_power),
        (Metric::ReflectedPower, |r| r.reading.reflected_power),
        (Metric::Vswr, |r| r.derived.vswr),
        (Metric::ReturnLoss, |r| r.derived.return_loss_db),
        (Metric::Temperature, |r| r.reading.temperature),
        (Metric::Voltage, |r| r.reading.voltage),
        (Metric::Current, |r| r.reading.current),
        (Metric::Power, |r| r.reading.power),
    ];

    columns
        .into_iter()
        .map(|(metric, pick)| (metric, summarize(&column(pick), &timestamps)))
        .collect()
}

fn active_alarms(rows: &[ReadingRow]) -> Vec<String> {
    let names: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.reading.active_alarms())
        .map(|d| d.name.as_str())
        .collect();
    names.into_iter().map(str::to_string).collect()
}

fn summarize_request(request: &AnalysisRequest) -> Result<BTreeMap<Metric, MetricSummary>, CoreError> {
    let forward = fill_missing(&request.forward_power);
    let reflected = fill_missing(&request.reflected_power);

    let vswr = match &request.vswr {
        Some(series) => fill_missing(series),
        None => forward.iter().zip(&reflected).map(|(f, r)| derive_vswr(*f, *r)).collect(),
    };
    let return_loss = match &request.return_loss {
        Some(series) => fill_missing(series),
        None => forward
            .iter()
            .zip(&reflected)
            .map(|(f, r)| derive_return_loss(*f, *r))
            .collect(),
    };

    let mut series: Vec<(Metric, Vec<f64>)> = vec![
        (Metric::ForwardPower, forward),
        (Metric::ReflectedPower, reflected),
        (Metric::Vswr, vswr),
        (Metric::ReturnLoss, return_loss),
        (Metric::Temperature, fill_missing(&request.temperature)),
        (Metric::Voltage, fill_missing(&request.voltage)),
        (Metric::Current, fill_missing(&request.current)),
        (Metric::Power, fill_missing(&request.power)),
    ];
    let optional = [
        (Metric::Latency, &request.latency),
        (Metric::PacketLoss, &request.packet_loss),
        (Metric::SignalStrength, &request.signal_strength),
    ];
    for (metric, values) in optional {
        if let Some(values) = values {
            series.push((metric, fill_missing(values)));
        }
    }

    let expected = request.timestamps.len();
    let mut summaries = BTreeMap::new();
    for (metric, values) in series {
        // an omitted array is missing data; a short one is malformed
        if !values.is_empty() && values.len() != expected {
            return Err(CoreError::InvalidInput(format!(
                "{} has {} values for {} timestamps",
                metric.title(),
                values.len(),
                expected
            )));
        }
        summaries.insert(metric, summarize(&values, &request.timestamps));
    }
    Ok(summaries)
}

fn fill_missing(series: &[Option<f64>]) -> Vec<f64> {
    series.iter().map(|v| v.unwrap_or(0.0)).collect()
}
