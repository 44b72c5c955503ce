//! Narrative analysis report for one station.
//!
//! The report is built from per-metric [`MetricSummary`] values plus fixed
//! threshold bands. Rendering is deterministic: the same summaries always
//! produce the same text.

use super::error::CoreError;
use super::statistics::MetricSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    ForwardPower,
    ReflectedPower,
    Vswr,
    ReturnLoss,
    Temperature,
    Voltage,
    Current,
    Power,
    Latency,
    PacketLoss,
    SignalStrength,
}

impl Metric {
    /// Metrics every report must cover.
    pub const REQUIRED: [Metric; 8] = [
        Metric::ForwardPower,
        Metric::ReflectedPower,
        Metric::Vswr,
        Metric::ReturnLoss,
        Metric::Temperature,
        Metric::Voltage,
        Metric::Current,
        Metric::Power,
    ];

    /// Link-quality metrics, reported only when supplied.
    pub const OPTIONAL: [Metric; 3] = [Metric::Latency, Metric::PacketLoss, Metric::SignalStrength];

    pub fn title(&self) -> &'static str {
        match self {
            Metric::ForwardPower => "Forward Power",
            Metric::ReflectedPower => "Reflected Power",
            Metric::Vswr => "VSWR",
            Metric::ReturnLoss => "Return Loss",
            Metric::Temperature => "Temperature",
            Metric::Voltage => "Voltage",
            Metric::Current => "Current",
            Metric::Power => "Power",
            Metric::Latency => "Latency",
            Metric::PacketLoss => "Packet Loss",
            Metric::SignalStrength => "Signal Strength",
        }
    }

    /// Physical unit suffix; VSWR is dimensionless.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::ForwardPower | Metric::ReflectedPower | Metric::Power => " W",
            Metric::Vswr => "",
            Metric::ReturnLoss => " dB",
            Metric::Temperature => " °C",
            Metric::Voltage => " V",
            Metric::Current => " A",
            Metric::Latency => " ms",
            Metric::PacketLoss => "%",
            Metric::SignalStrength => " dBm",
        }
    }

    fn format(&self, value: f64) -> String {
        format!("{:.2}{}", value, self.unit())
    }
}

/// Qualitative verdict for one metric. `problem` is set when the verdict
/// belongs in the overall list of issues.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub sentence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

impl Assessment {
    fn ok(sentence: String) -> Self {
        Self { sentence, problem: None }
    }

    fn problem(sentence: String, problem: &str) -> Self {
        Self {
            sentence,
            problem: Some(problem.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSection {
    pub metric: Metric,
    pub title: String,
    pub lines: Vec<String>,
    pub assessment: Option<Assessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationReport {
    pub station_id: String,
    pub sections: Vec<MetricSection>,
    pub overall: String,
}

/// Build the report for `station_id`.
///
/// Every metric in [`Metric::REQUIRED`] must have a summary; an absent
/// entry is a caller bug and is rejected rather than zero-filled.
pub fn generate_narration(
    station_id: &str,
    summaries: &BTreeMap<Metric, MetricSummary>,
) -> Result<NarrationReport, CoreError> {
    let station_id = station_id.trim();
    if station_id.is_empty() {
        return Err(CoreError::InvalidInput("station id is empty".to_string()));
    }

    let missing: Vec<&str> = Metric::REQUIRED
        .iter()
        .filter(|m| !summaries.contains_key(m))
        .map(|m| m.title())
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::InvalidInput(format!(
            "missing summaries for: {}",
            missing.join(", ")
        )));
    }

    let sections: Vec<MetricSection> = Metric::REQUIRED
        .iter()
        .chain(Metric::OPTIONAL.iter())
        .filter_map(|metric| summaries.get(metric).map(|s| build_section(*metric, s)))
        .collect();

    let problems: Vec<&str> = sections
        .iter()
        .filter_map(|s| s.assessment.as_ref()?.problem.as_deref())
        .collect();

    let overall = if problems.is_empty() {
        format!(
            "Station {} is performing optimally, with all monitored parameters within normal ranges.",
            station_id
        )
    } else {
        format!(
            "Station {} requires attention: {}.",
            station_id,
            problems.join("; ")
        )
    };

    Ok(NarrationReport {
        station_id: station_id.to_string(),
        sections,
        overall,
    })
}

fn build_section(metric: Metric, summary: &MetricSummary) -> MetricSection {
    let lines = vec![
        format!(
            "Maximum: {} at {}",
            metric.format(summary.max),
            format_timestamp(summary.max_timestamp)
        ),
        format!(
            "Minimum: {} at {}",
            metric.format(summary.min),
            format_timestamp(summary.min_timestamp)
        ),
        format!("Average: {}", metric.format(summary.average)),
        format!("Standard deviation: {}", metric.format(summary.standard_deviation)),
        format!("Trend: {}", summary.trend),
    ];

    MetricSection {
        metric,
        title: metric.title().to_string(),
        lines,
        assessment: assess(metric, summary),
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

/// Threshold bands per metric. Forward, reflected and total power have no
/// band of their own; their health shows up through VSWR and return loss.
pub fn assess(metric: Metric, summary: &MetricSummary) -> Option<Assessment> {
    let avg = summary.average;
    let assessment = match metric {
        Metric::Vswr => {
            if avg > 1.5 {
                Assessment::problem(
                    format!("Average VSWR of {avg:.2} indicates high VSWR, check antenna and feed line."),
                    "high VSWR, check antenna",
                )
            } else {
                Assessment::ok(format!("Average VSWR of {avg:.2} is within acceptable range."))
            }
        }
        Metric::ReturnLoss => {
            if avg < -20.0 {
                Assessment::ok(format!(
                    "Average return loss of {avg:.2} dB indicates good impedance matching."
                ))
            } else {
                Assessment::problem(
                    format!("Average return loss of {avg:.2} dB indicates poor return loss."),
                    "poor return loss",
                )
            }
        }
        Metric::Temperature => {
            let max = summary.max;
            if max > 50.0 {
                Assessment::problem(
                    format!("Peak temperature of {max:.2} °C is high, check cooling."),
                    "high temperature, check cooling",
                )
            } else {
                Assessment::ok(format!("Peak temperature of {max:.2} °C is normal."))
            }
        }
        Metric::Voltage => {
            if avg < 200.0 {
                Assessment::problem(
                    format!("Average voltage of {avg:.2} V is low."),
                    "low voltage",
                )
            } else {
                Assessment::ok(format!("Average voltage of {avg:.2} V is normal."))
            }
        }
        Metric::Current => {
            if avg > 10.0 {
                Assessment::problem(
                    format!("Average current of {avg:.2} A is high, check for shorts."),
                    "high current, check for shorts",
                )
            } else {
                Assessment::ok(format!("Average current of {avg:.2} A is normal."))
            }
        }
        Metric::Latency => {
            let sentence = |verdict: &str| format!("Average latency of {avg:.2} ms: {verdict}.");
            if avg < 50.0 {
                Assessment::ok(sentence("excellent responsiveness"))
            } else if avg < 100.0 {
                Assessment::ok(sentence("good responsiveness"))
            } else if avg < 200.0 {
                Assessment::problem(sentence("moderate congestion"), "moderate network congestion")
            } else {
                Assessment::problem(sentence("significant delays"), "significant network delays")
            }
        }
        Metric::PacketLoss => {
            let sentence = |verdict: &str| format!("Average packet loss of {avg:.2}%: {verdict}.");
            if avg < 1.0 {
                Assessment::ok(sentence("excellent reliability"))
            } else if avg < 3.0 {
                Assessment::ok(sentence("acceptable"))
            } else if avg < 5.0 {
                Assessment::problem(sentence("stability issues"), "link stability issues")
            } else {
                Assessment::problem(sentence("significant problems"), "significant packet loss")
            }
        }
        Metric::SignalStrength => {
            let sentence = |verdict: &str| format!("Average signal strength of {avg:.2} dBm: {verdict}.");
            if avg > -50.0 {
                Assessment::ok(sentence("excellent"))
            } else if avg > -70.0 {
                Assessment::ok(sentence("good"))
            } else if avg > -85.0 {
                Assessment::ok(sentence("adequate"))
            } else {
                Assessment::problem(sentence("weak"), "weak signal")
            }
        }
        Metric::ForwardPower | Metric::ReflectedPower | Metric::Power => return None,
    };
    Some(assessment)
}

impl NarrationReport {
    /// Plain-text rendering, one block per metric followed by the overall
    /// assessment.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Analysis for station {}", self.station_id);
        for section in &self.sections {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", section.title);
            for line in &section.lines {
                let _ = writeln!(out, "  {}", line);
            }
            if let Some(assessment) = &section.assessment {
                let _ = writeln!(out, "  {}", assessment.sentence);
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Overall Assessment");
        let _ = writeln!(out, "  {}", self.overall);
        out
    }

    /// HTML fragment for the dashboard's narration editor.
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "<h2>Analysis for station {}</h2>", escape_html(&self.station_id));
        for section in &self.sections {
            let _ = write!(out, "<h3>{}</h3><ul>", escape_html(&section.title));
            for line in &section.lines {
                let _ = write!(out, "<li>{}</li>", escape_html(line));
            }
            out.push_str("</ul>");
            if let Some(assessment) = &section.assessment {
                let _ = write!(out, "<p>{}</p>", escape_html(&assessment.sentence));
            }
        }
        let _ = write!(
            out,
            "<h3>Overall Assessment</h3><p>{}</p>",
            escape_html(&self.overall)
        );
        out
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::statistics::Trend;
    use chrono::TimeZone;

    fn summary(average: f64) -> MetricSummary {
        let ts = Utc.with_ymd_and_hms(2025, 2, 3, 8, 30, 0).unwrap();
        MetricSummary {
            min: average,
            max: average,
            average,
            standard_deviation: 0.0,
            trend: Trend::Stable,
            max_timestamp: Some(ts),
            min_timestamp: Some(ts),
        }
    }

    fn healthy() -> BTreeMap<Metric, MetricSummary> {
        BTreeMap::from([
            (Metric::ForwardPower, summary(100.0)),
            (Metric::ReflectedPower, summary(0.5)),
            (Metric::Vswr, summary(1.2)),
            (Metric::ReturnLoss, summary(-25.0)),
            (Metric::Temperature, summary(35.0)),
            (Metric::Voltage, summary(230.0)),
            (Metric::Current, summary(4.0)),
            (Metric::Power, summary(900.0)),
        ])
    }

    #[test]
    fn test_healthy_station_is_optimal() {
        let report = generate_narration("TX-01", &healthy()).unwrap();
        assert_eq!(report.sections.len(), 8);
        assert!(report.overall.contains("performing optimally"));

        let text = report.render_text();
        assert!(text.contains("within acceptable range"));
        assert!(text.contains("good impedance matching"));
        assert!(text.contains("Maximum: 35.00 °C at 2025-02-03 08:30:00"));
        assert!(text.contains("Average: 100.00 W"));
        assert!(text.contains("Average: -25.00 dB"));
        assert!(text.contains("Trend: stable"));
    }

    #[test]
    fn test_high_vswr_warning() {
        let mut summaries = healthy();
        summaries.insert(Metric::Vswr, summary(2.0));

        let report = generate_narration("TX-01", &summaries).unwrap();
        let text = report.render_text();
        assert!(text.contains("high VSWR"));
        assert!(!text.contains("within acceptable range"));
        assert!(report.overall.contains("requires attention"));
        assert!(report.overall.contains("high VSWR, check antenna"));
    }

    #[test]
    fn test_all_rf_problems_listed() {
        let mut summaries = healthy();
        summaries.insert(Metric::Vswr, summary(3.0));
        summaries.insert(Metric::ReturnLoss, summary(-6.0));
        summaries.insert(Metric::Temperature, summary(61.0));
        summaries.insert(Metric::Voltage, summary(180.0));
        summaries.insert(Metric::Current, summary(12.5));

        let report = generate_narration("TX-01", &summaries).unwrap();
        assert_eq!(
            report.overall,
            "Station TX-01 requires attention: high VSWR, check antenna; poor return loss; \
             high temperature, check cooling; low voltage; high current, check for shorts."
        );
    }

    #[test]
    fn test_band_edges() {
        assert!(assess(Metric::Vswr, &summary(1.5)).unwrap().problem.is_none());
        assert!(assess(Metric::ReturnLoss, &summary(-20.0)).unwrap().problem.is_some());
        assert!(assess(Metric::Voltage, &summary(200.0)).unwrap().problem.is_none());
        assert!(assess(Metric::Current, &summary(10.0)).unwrap().problem.is_none());
        assert!(assess(Metric::Temperature, &summary(50.0)).unwrap().problem.is_none());
        assert!(assess(Metric::Power, &summary(1.0)).is_none());
    }

    #[test]
    fn test_link_quality_bands() {
        let verdict = |m, v| assess(m, &summary(v)).unwrap().sentence;
        assert!(verdict(Metric::Latency, 49.0).contains("excellent"));
        assert!(verdict(Metric::Latency, 99.0).contains("good"));
        assert!(verdict(Metric::Latency, 150.0).contains("moderate congestion"));
        assert!(verdict(Metric::Latency, 200.0).contains("significant delays"));
        assert!(verdict(Metric::PacketLoss, 0.5).contains("excellent reliability"));
        assert!(verdict(Metric::PacketLoss, 2.0).contains("acceptable"));
        assert!(verdict(Metric::PacketLoss, 4.0).contains("stability issues"));
        assert!(verdict(Metric::PacketLoss, 5.0).contains("significant problems"));
        assert!(verdict(Metric::SignalStrength, -40.0).contains("excellent"));
        assert!(verdict(Metric::SignalStrength, -60.0).contains("good"));
        assert!(verdict(Metric::SignalStrength, -80.0).contains("adequate"));
        assert!(verdict(Metric::SignalStrength, -85.0).contains("weak"));
    }

    #[test]
    fn test_optional_metrics_reported_when_present() {
        let mut summaries = healthy();
        summaries.insert(Metric::SignalStrength, summary(-90.0));

        let report = generate_narration("TX-01", &summaries).unwrap();
        assert_eq!(report.sections.len(), 9);
        assert_eq!(report.sections.last().unwrap().metric, Metric::SignalStrength);
        assert!(report.overall.contains("weak signal"));
    }

    #[test]
    fn test_missing_metric_is_invalid_input() {
        let mut summaries = healthy();
        summaries.remove(&Metric::Current);

        let err = generate_narration("TX-01", &summaries).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(ref msg) if msg.contains("Current")));
    }

    #[test]
    fn test_empty_station_is_invalid_input() {
        let err = generate_narration("  ", &healthy()).unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn test_zero_filled_summary_renders() {
        let mut summaries = healthy();
        summaries.insert(Metric::Power, MetricSummary::empty());

        let text = generate_narration("TX-01", &summaries).unwrap().render_text();
        assert!(text.contains("Maximum: 0.00 W at n/a"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let summaries = healthy();
        let first = generate_narration("TX-01", &summaries).unwrap();
        let second = generate_narration("TX-01", &summaries).unwrap();
        assert_eq!(first.render_text(), second.render_text());
        assert_eq!(first.render_html(), second.render_html());
    }

    #[test]
    fn test_html_escapes_station() {
        let html = generate_narration("<TX>&", &healthy()).unwrap().render_html();
        assert!(html.starts_with("<h2>Analysis for station &lt;TX&gt;&amp;</h2>"));
        assert!(html.contains("<h3>Overall Assessment</h3>"));
    }
}
