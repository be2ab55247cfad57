//! JSON snapshot of a run report
//!
//! Hand-off artifact for presentation layers: run-level and per-endpoint
//! statistics, each with its diff against the preceding build.

use crate::build::BuildRecord;
use crate::report::RunReport;
use crate::stats::StatsSummary;
use crate::trend::{diff_reports, MetricDiff};
use serde::Serialize;

/// Statistics of one endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    /// Normalized endpoint key
    pub key: String,
    /// Endpoint name as reported
    pub label: String,
    pub stats: StatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<MetricDiff>,
}

/// Complete snapshot of one report
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub report: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<u32>,
    pub overall: StatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<MetricDiff>,
    pub endpoints: Vec<EndpointSnapshot>,
}

impl RunSnapshot {
    /// Snapshot of `report`, diffed against `previous` when given
    pub fn from_report(report: &RunReport, previous: Option<&RunReport>) -> Self {
        let summary = report.summary();
        let previous_summary = previous.map(RunReport::summary);
        let diff = previous_summary
            .as_deref()
            .map(|before| diff_reports(&summary, Some(before)));

        let endpoints = summary
            .endpoints
            .iter()
            .map(|(key, stats)| EndpointSnapshot {
                key: key.clone(),
                label: summary.labels.get(key).cloned().unwrap_or_else(|| key.clone()),
                stats: stats.clone(),
                diff: diff.as_ref().and_then(|d| d.endpoints.get(key).cloned()),
            })
            .collect();

        Self {
            report: report.name().to_string(),
            build: None,
            overall: summary.overall.clone(),
            diff: diff.map(|d| d.overall),
            endpoints,
        }
    }

    /// Snapshots of every report of the evaluated build (`history[0]`)
    ///
    /// Each report is diffed against the same-named report of `history[1]`.
    pub fn from_history(history: &[BuildRecord]) -> Vec<Self> {
        let Some(current) = history.first() else {
            return Vec::new();
        };
        let previous = history.get(1);

        current
            .reports
            .iter()
            .map(|(name, report)| {
                let before = previous.and_then(|b| b.report(name)).map(|r| &**r);
                let mut snapshot = Self::from_report(report, before);
                snapshot.build = Some(current.number);
                snapshot
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildResult;
    use crate::sample::Sample;
    use chrono::Utc;

    fn report(durations: &[u64]) -> RunReport {
        let report = RunReport::with_defaults("results.jtl");
        for d in durations {
            report.add_sample("http://host/api/login", Sample::new(Utc::now(), *d, true, "200", 2.0));
        }
        report
    }

    #[test]
    fn test_snapshot_without_predecessor() {
        let snapshot = RunSnapshot::from_report(&report(&[100, 200]), None);
        assert_eq!(snapshot.report, "results.jtl");
        assert_eq!(snapshot.overall.count, 2);
        assert!(snapshot.diff.is_none());
        assert_eq!(snapshot.endpoints.len(), 1);
        assert_eq!(snapshot.endpoints[0].key, "host_api_login");
        assert_eq!(snapshot.endpoints[0].label, "http://host/api/login");
    }

    #[test]
    fn test_snapshot_from_history_diffs_previous_build() {
        let history = vec![
            BuildRecord::new(2, Utc::now(), BuildResult::Success).with_report(report(&[300])),
            BuildRecord::new(1, Utc::now(), BuildResult::Success).with_report(report(&[100])),
        ];
        let snapshots = RunSnapshot::from_history(&history);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].build, Some(2));
        assert_eq!(snapshots[0].diff.as_ref().unwrap().average_diff, 200.0);
        assert_eq!(
            snapshots[0].endpoints[0].diff.as_ref().unwrap().median_diff,
            200.0
        );
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = RunSnapshot::from_report(&report(&[10]), None);
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["report"], "results.jtl");
        assert_eq!(value["overall"]["count"], 1);
        assert!(value.get("diff").is_none());
    }
}
