//! Build-over-build deltas
//!
//! Compares a report with the same-named report of the immediately preceding
//! build. Both inputs are only read; the result is a standalone value.

use crate::report::RunSummary;
use crate::stats::StatsSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `current - previous` for every tracked statistic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDiff {
    pub average_diff: f64,
    pub median_diff: f64,
    pub p90_diff: f64,
    pub error_percent_diff: f64,
    pub count_diff: i64,
    /// One entry per configured percentile, `(percentile, diff)`
    pub percentile_diffs: Vec<(f64, f64)>,
}

impl MetricDiff {
    /// Diff of two summaries
    pub fn between(current: &StatsSummary, previous: &StatsSummary) -> Self {
        let percentile_diffs = current
            .percentiles
            .iter()
            .map(|p| {
                let before = previous.percentile(p.percentile).unwrap_or(0) as f64;
                (p.percentile, p.duration_ms as f64 - before)
            })
            .collect();

        Self {
            average_diff: finite_or_zero(current.average) - finite_or_zero(previous.average),
            median_diff: current.median as f64 - previous.median as f64,
            p90_diff: current.p90 as f64 - previous.p90 as f64,
            error_percent_diff: current.error_percent - previous.error_percent,
            count_diff: saturating_signed(current.count) - saturating_signed(previous.count),
            percentile_diffs,
        }
    }

    /// All-zero diff carrying the current percentile list
    pub fn zero(current: &StatsSummary) -> Self {
        Self {
            percentile_diffs: current
                .percentiles
                .iter()
                .map(|p| (p.percentile, 0.0))
                .collect(),
            ..Default::default()
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn saturating_signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Deltas of a whole report against its predecessor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDiff {
    /// Run-level diff
    pub overall: MetricDiff,
    /// Per-endpoint diffs keyed by normalized endpoint
    pub endpoints: BTreeMap<String, MetricDiff>,
}

/// Compute deltas of `current` against `previous`
///
/// Endpoints are matched by identical key; an endpoint absent from the
/// predecessor, or a missing predecessor, yields zero diffs.
///
/// # Example
/// ```
/// use perfgate::report::RunReport;
/// use perfgate::sample::Sample;
/// use perfgate::trend::diff_reports;
/// use chrono::Utc;
///
/// let previous = RunReport::with_defaults("r");
/// previous.add_sample("a", Sample::new(Utc::now(), 100, true, "200", 0.0));
/// let current = RunReport::with_defaults("r");
/// current.add_sample("a", Sample::new(Utc::now(), 130, true, "200", 0.0));
///
/// let diff = diff_reports(&current.summary(), Some(&previous.summary()));
/// assert_eq!(diff.overall.average_diff, 30.0);
/// ```
pub fn diff_reports(current: &RunSummary, previous: Option<&RunSummary>) -> ReportDiff {
    let Some(previous) = previous else {
        return ReportDiff {
            overall: MetricDiff::zero(&current.overall),
            endpoints: current
                .endpoints
                .iter()
                .map(|(key, stats)| (key.clone(), MetricDiff::zero(stats)))
                .collect(),
        };
    };

    let endpoints = current
        .endpoints
        .iter()
        .map(|(key, stats)| {
            let diff = match previous.endpoints.get(key) {
                Some(before) => MetricDiff::between(stats, before),
                None => MetricDiff::zero(stats),
            };
            (key.clone(), diff)
        })
        .collect();

    ReportDiff {
        overall: MetricDiff::between(&current.overall, &previous.overall),
        endpoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RunReport;
    use crate::sample::Sample;
    use chrono::{TimeZone, Utc};

    fn report(samples: &[(&str, u64, bool)]) -> RunReport {
        let report = RunReport::with_defaults("r");
        for (i, (endpoint, duration, ok)) in samples.iter().enumerate() {
            let ts = Utc.timestamp_millis_opt(i as i64 * 10).unwrap();
            report.add_sample(endpoint, Sample::new(ts, *duration, *ok, "200", 0.0));
        }
        report
    }

    #[test]
    fn test_no_predecessor_yields_zero() {
        let current = report(&[("a", 100, true), ("b", 300, false)]);
        let diff = diff_reports(&current.summary(), None);
        assert_eq!(diff.overall.average_diff, 0.0);
        assert_eq!(diff.overall.error_percent_diff, 0.0);
        assert_eq!(diff.endpoints.len(), 2);
        assert!(diff.overall.percentile_diffs.iter().all(|(_, d)| *d == 0.0));
        assert_eq!(diff.overall.percentile_diffs.len(), 4);
    }

    #[test]
    fn test_diff_against_predecessor() {
        let previous = report(&[("a", 100, true), ("a", 200, true)]);
        let current = report(&[("a", 150, true), ("a", 250, false), ("a", 350, true)]);
        let diff = diff_reports(&current.summary(), Some(&previous.summary()));

        assert_eq!(diff.overall.average_diff, 100.0);
        assert_eq!(diff.overall.count_diff, 1);
        assert_eq!(diff.overall.error_percent_diff, 33.333);
        // p100: 350 - 200
        assert!(diff.overall.percentile_diffs.contains(&(100.0, 150.0)));
        assert_eq!(diff.endpoints["a"], diff.overall);
    }

    #[test]
    fn test_new_endpoint_has_zero_diff() {
        let previous = report(&[("a", 100, true)]);
        let current = report(&[("a", 100, true), ("b", 900, true)]);
        let diff = diff_reports(&current.summary(), Some(&previous.summary()));
        assert_eq!(diff.endpoints["b"].average_diff, 0.0);
        assert_eq!(diff.endpoints["a"].average_diff, 0.0);
    }

    #[test]
    fn test_predecessor_not_mutated() {
        let previous = report(&[("a", 100, true)]);
        let before = previous.summary();
        let current = report(&[("a", 500, true)]);
        let _ = diff_reports(&current.summary(), Some(&before));
        assert_eq!(*previous.summary(), *before);
    }
}
