//! Summary statistics and trend classification over one metric series.

use super::metrics::zero_if_missing;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Number of most recent samples the trend is computed over.
const TREND_WINDOW: usize = 10;

/// Changes smaller than this (in percent) are reported as stable.
const STABLE_THRESHOLD_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trend {
    InsufficientData,
    Stable,
    /// Signed percent change between the halves of the recent window.
    Increasing(f64),
    Decreasing(f64),
}

impl Trend {
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::InsufficientData => write!(f, "insufficient data for trend analysis"),
            Trend::Stable => write!(f, "stable"),
            Trend::Increasing(pct) => write!(f, "increasing ({:+.1}%)", pct),
            Trend::Decreasing(pct) => write!(f, "decreasing ({:+.1}%)", pct),
        }
    }
}

impl Serialize for Trend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub standard_deviation: f64,
    pub trend: Trend,
    pub max_timestamp: Option<DateTime<Utc>>,
    pub min_timestamp: Option<DateTime<Utc>>,
}

impl MetricSummary {
    /// Summary of a series with no samples.
    pub fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            average: 0.0,
            standard_deviation: 0.0,
            trend: Trend::InsufficientData,
            max_timestamp: None,
            min_timestamp: None,
        }
    }
}

/// Summarize a metric series.
///
/// Values are paired with timestamps (extra entries on either side are
/// dropped) and stably ordered by timestamp first, so out-of-order or
/// duplicated rows are tolerated. Non-finite values count as 0.
pub fn summarize(values: &[f64], timestamps: &[DateTime<Utc>]) -> MetricSummary {
    let mut samples: Vec<(DateTime<Utc>, f64)> = timestamps
        .iter()
        .copied()
        .zip(values.iter().map(|v| zero_if_missing(*v)))
        .collect();

    if samples.is_empty() {
        return MetricSummary::empty();
    }

    samples.sort_by_key(|(ts, _)| *ts);

    let n = samples.len() as f64;
    let (mut min_idx, mut max_idx) = (0, 0);
    let mut sum = 0.0;
    for (idx, (_, value)) in samples.iter().enumerate() {
        // strict comparisons keep the earliest occurrence
        if *value < samples[min_idx].1 {
            min_idx = idx;
        }
        if *value > samples[max_idx].1 {
            max_idx = idx;
        }
        sum += value;
    }

    let average = sum / n;
    let variance = samples
        .iter()
        .map(|(_, v)| (v - average).powi(2))
        .sum::<f64>()
        / n;

    let ordered: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();

    MetricSummary {
        min: samples[min_idx].1,
        max: samples[max_idx].1,
        average,
        standard_deviation: variance.sqrt(),
        trend: classify_trend(&ordered),
        max_timestamp: Some(samples[max_idx].0),
        min_timestamp: Some(samples[min_idx].0),
    }
}

/// Compare the mean of the newer half of the last ten samples with the
/// older half.
///
/// The percent change is taken against |older mean| rather than the signed
/// older mean, so for negative baselines (return loss, dBm) the sign follows
/// the direction of the values instead of flipping.
fn classify_trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::InsufficientData;
    }

    let recent = &values[values.len().saturating_sub(TREND_WINDOW)..];
    let (older, newer) = recent.split_at(recent.len() / 2);

    let older_avg = mean(older);
    let newer_avg = mean(newer);

    // a zero baseline has no meaningful percentage
    if older_avg == 0.0 {
        return Trend::Stable;
    }

    let pct = (newer_avg - older_avg) / older_avg.abs() * 100.0;
    if !pct.is_finite() || pct.abs() < STABLE_THRESHOLD_PCT {
        Trend::Stable
    } else if pct > 0.0 {
        Trend::Increasing(pct)
    } else {
        Trend::Decreasing(pct)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
