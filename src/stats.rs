//! Sample accumulation and percentile computation
//!
//! [`Accumulator`] keeps running totals plus the recorded durations in
//! insertion order; a rank-ordered copy is built lazily on the first
//! percentile query and dropped on every mutation. [`EndpointStats`] wraps an
//! accumulator with the endpoint's raw samples.
//!
//! Percentiles use the rank formula `floor(n * p / 100) - 1`, clamped to
//! `[0, n - 1]`. p0 is therefore the minimum and p100 the maximum. There is
//! no interpolation between neighbouring samples.

use crate::error::{GateError, Result};
use crate::numeric::{round_to, safe_divide};
use crate::sample::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Statistic a constraint can be evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Average,
    Median,
    #[serde(alias = "line90")]
    P90,
    #[serde(alias = "minimum")]
    Min,
    #[serde(alias = "maximum")]
    Max,
    #[serde(alias = "errorprc")]
    ErrorPercent,
}

impl Metric {
    /// Unit suffix used in human-readable output
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::ErrorPercent => "%",
            _ => "ms",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Average => "AVERAGE",
            Metric::Median => "MEDIAN",
            Metric::P90 => "P90",
            Metric::Min => "MIN",
            Metric::Max => "MAX",
            Metric::ErrorPercent => "ERROR_PERCENT",
        };
        f.write_str(name)
    }
}

/// How samples of a report were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// One sample per request
    #[default]
    Samples,
    /// Pre-aggregated interval records
    Summarizer,
}

/// Percentiles to materialise for every summary
///
/// Parsed from a comma separated list such as `"0,50,90,100"`. Values are
/// validated to `[0, 100]`, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PercentileList(Vec<f64>);

/// Percentile list used when none is configured
pub const DEFAULT_PERCENTILES: &str = "0,50,90,100";

impl PercentileList {
    /// Parse a comma separated list
    pub fn parse(spec: &str) -> Result<Self> {
        let mut values = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let value: f64 = part.parse().map_err(|_| {
                GateError::config(format!("invalid percentile '{}' in '{}'", part, spec))
            })?;
            if !(0.0..=100.0).contains(&value) {
                return Err(GateError::InvalidPercentile(value));
            }
            values.push(value);
        }

        if values.is_empty() {
            return Err(GateError::config(format!(
                "percentile list '{}' contains no values",
                spec
            )));
        }

        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(Self(values))
    }

    /// Configured values in ascending order
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl Default for PercentileList {
    fn default() -> Self {
        Self(vec![0.0, 50.0, 90.0, 100.0])
    }
}

impl FromStr for PercentileList {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PercentileList {
    type Error = GateError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PercentileList> for String {
    fn from(value: PercentileList) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PercentileList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| format!("{}", p)).collect();
        f.write_str(&parts.join(","))
    }
}

/// Look up a percentile in ascending data by rank
///
/// Returns 0 for empty data.
///
/// # Example
/// ```
/// use perfgate::stats::percentile_by_rank;
///
/// let sorted = [10, 20, 30, 40];
/// assert_eq!(percentile_by_rank(&sorted, 0.0).unwrap(), 10);
/// assert_eq!(percentile_by_rank(&sorted, 50.0).unwrap(), 20);
/// assert_eq!(percentile_by_rank(&sorted, 100.0).unwrap(), 40);
/// ```
pub fn percentile_by_rank(sorted: &[u64], percentile: f64) -> Result<u64> {
    if !(0.0..=100.0).contains(&percentile) {
        return Err(GateError::InvalidPercentile(percentile));
    }
    if sorted.is_empty() {
        return Ok(0);
    }

    let last = sorted.len() - 1;
    let rank = (sorted.len() as f64 * percentile / 100.0).floor() - 1.0;
    let index = if rank <= 0.0 {
        0
    } else {
        (rank as usize).min(last)
    };
    Ok(sorted[index])
}

/// One materialised percentile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub duration_ms: u64,
}

/// Derived statistics of an endpoint or a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub count: u64,
    pub errors: u64,
    pub average: f64,
    pub median: u64,
    pub p90: u64,
    pub min: u64,
    pub max: u64,
    pub error_percent: f64,
    pub throughput: f64,
    pub total_traffic_kb: f64,
    pub average_size_kb: f64,
    pub first_start: Option<DateTime<Utc>>,
    pub last_end: Option<DateTime<Utc>>,
    pub percentiles: Vec<PercentileValue>,
}

impl StatsSummary {
    /// Read the value a constraint compares
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Average => self.average,
            Metric::Median => self.median as f64,
            Metric::P90 => self.p90 as f64,
            Metric::Min => self.min as f64,
            Metric::Max => self.max as f64,
            Metric::ErrorPercent => self.error_percent,
        }
    }

    /// Materialised value of a configured percentile
    pub fn percentile(&self, percentile: f64) -> Option<u64> {
        self.percentiles
            .iter()
            .find(|p| p.percentile == percentile)
            .map(|p| p.duration_ms)
    }
}

/// Running totals and the duration set of a group of samples
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    count: u64,
    errors: u64,
    total_duration_ms: u64,
    total_size_kb: f64,
    first_start: Option<DateTime<Utc>>,
    last_end: Option<DateTime<Utc>>,
    summarizer_records: u64,
    summarizer_error_sum: f64,
    /// Fastest and slowest request reported by summarizer records
    summarizer_min_ms: Option<u64>,
    summarizer_max_ms: Option<u64>,
    /// Durations contributing to average and percentiles, insertion order
    durations: Vec<u64>,
    /// Rank-ordered copy of `durations`; `None` when stale
    sorted: Option<Vec<u64>>,
}

impl Accumulator {
    /// Fold one sample into the totals
    ///
    /// With `exclude_failed` set, a failed per-request sample still counts as
    /// a request and an error but its duration is left out of the average and
    /// the percentiles. Summarizer records always contribute their duration.
    ///
    /// A summarizer record counts as the requests it folds (at least one): its
    /// interval average is weighted by that number, its error percentage is
    /// converted back into failed requests and its min/max bound the
    /// durations. Percentiles are ranked over the interval averages.
    pub fn record(&mut self, sample: &Sample, exclude_failed: bool) {
        match &sample.summarizer {
            Some(summary) => {
                let requests = summary.samples.max(1);
                self.count += requests;
                let failed = (requests as f64 * summary.error_percent.clamp(0.0, 100.0) / 100.0)
                    .round() as u64;
                self.errors += failed.min(requests);
                self.total_duration_ms = self
                    .total_duration_ms
                    .saturating_add(sample.duration_ms.saturating_mul(requests));
                self.durations.push(sample.duration_ms);

                self.summarizer_records += 1;
                self.summarizer_error_sum += summary.error_percent;
                self.summarizer_min_ms = Some(
                    self.summarizer_min_ms
                        .map_or(summary.min_ms, |min| min.min(summary.min_ms)),
                );
                self.summarizer_max_ms = Some(
                    self.summarizer_max_ms
                        .map_or(summary.max_ms, |max| max.max(summary.max_ms)),
                );
            }
            None => {
                self.count += 1;
                if !sample.successful {
                    self.errors += 1;
                }
                if !(exclude_failed && !sample.successful) {
                    self.total_duration_ms =
                        self.total_duration_ms.saturating_add(sample.duration_ms);
                    self.durations.push(sample.duration_ms);
                }
            }
        }
        self.total_size_kb += sample.size_kb;

        let end = sample.end();
        self.first_start = Some(match self.first_start {
            Some(first) if first <= sample.timestamp => first,
            _ => sample.timestamp,
        });
        self.last_end = Some(match self.last_end {
            Some(last) if last >= end => last,
            _ => end,
        });

        self.sorted = None;
    }

    /// Number of recorded requests
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of failed samples
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Sum of contributing durations
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Sum of error percentages carried by summarizer records
    pub fn summarizer_error_sum(&self) -> f64 {
        self.summarizer_error_sum
    }

    /// Whether the rank-ordered cache is currently built
    pub fn is_sorted_cached(&self) -> bool {
        self.sorted.is_some()
    }

    fn sorted(&mut self) -> &[u64] {
        let durations = &self.durations;
        self.sorted.get_or_insert_with(|| {
            tracing::debug!(samples = durations.len(), "rebuilding sorted durations");
            let mut sorted = durations.clone();
            sorted.sort_unstable();
            sorted
        })
    }

    /// Duration at a percentile, `0 <= percentile <= 100`
    pub fn duration_at_percentile(&mut self, percentile: f64) -> Result<u64> {
        if !(0.0..=100.0).contains(&percentile) {
            return Err(GateError::InvalidPercentile(percentile));
        }
        percentile_by_rank(self.sorted(), percentile)
    }

    /// Total contributing duration over the request count
    ///
    /// Failed requests excluded from timing still count in the divisor. An
    /// empty accumulator is NaN through `safe_divide`.
    pub fn average(&self) -> f64 {
        safe_divide(self.total_duration_ms as f64, self.count as f64)
    }

    /// Failed samples as a percentage, three decimals
    pub fn error_percent(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        round_to(self.errors as f64 / self.count as f64 * 100.0, 3)
    }

    /// Mean error percentage of summarizer records, clamped to `[0, 100]`
    pub fn summarizer_error_percent(&self) -> f64 {
        if self.summarizer_records == 0 {
            return 0.0;
        }
        let mean = self.summarizer_error_sum / self.summarizer_records as f64;
        round_to(mean.clamp(0.0, 100.0), 3)
    }

    /// Requests per second over the observed span
    ///
    /// A zero-length span yields the request count itself.
    pub fn throughput(&self) -> f64 {
        let (Some(first), Some(last)) = (self.first_start, self.last_end) else {
            return 0.0;
        };
        let span_ms = (last - first).num_milliseconds();
        if span_ms <= 0 {
            return self.count as f64;
        }
        safe_divide(self.count as f64, span_ms as f64 / 1000.0)
    }

    /// Compute every derived statistic
    pub fn summarize(&mut self, percentiles: &PercentileList, mode: ReportMode) -> StatsSummary {
        let materialised: Vec<PercentileValue> = percentiles
            .values()
            .iter()
            .map(|&p| PercentileValue {
                percentile: p,
                duration_ms: percentile_by_rank(self.sorted(), p).unwrap_or(0),
            })
            .collect();

        let sorted = self.sorted();
        let median = percentile_by_rank(sorted, 50.0).unwrap_or(0);
        let p90 = percentile_by_rank(sorted, 90.0).unwrap_or(0);
        let mut min = percentile_by_rank(sorted, 0.0).unwrap_or(0);
        let mut max = percentile_by_rank(sorted, 100.0).unwrap_or(0);
        if let Some(floor) = self.summarizer_min_ms {
            min = min.min(floor);
        }
        if let Some(ceiling) = self.summarizer_max_ms {
            max = max.max(ceiling);
        }

        let error_percent = match mode {
            ReportMode::Samples => self.error_percent(),
            ReportMode::Summarizer => self.summarizer_error_percent(),
        };

        StatsSummary {
            count: self.count,
            errors: self.errors,
            average: self.average(),
            median,
            p90,
            min,
            max,
            error_percent,
            throughput: self.throughput(),
            total_traffic_kb: self.total_size_kb,
            average_size_kb: safe_divide(self.total_size_kb, self.count as f64),
            first_start: self.first_start,
            last_end: self.last_end,
            percentiles: materialised,
        }
    }
}

/// Samples and statistics of one endpoint
#[derive(Debug, Clone)]
pub struct EndpointStats {
    /// Endpoint name as first reported (before normalization)
    label: String,
    /// Samples in insertion order
    samples: Vec<Sample>,
    totals: Accumulator,
}

impl EndpointStats {
    /// Create empty statistics for an endpoint
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            samples: Vec::new(),
            totals: Accumulator::default(),
        }
    }

    /// Record one sample
    pub fn record(&mut self, sample: Sample, exclude_failed: bool) {
        self.totals.record(&sample, exclude_failed);
        self.samples.push(sample);
    }

    /// Endpoint name as reported by the parser
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Samples in insertion order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Running totals
    pub fn totals(&self) -> &Accumulator {
        &self.totals
    }

    /// Duration at a percentile, `0 <= percentile <= 100`
    pub fn duration_at_percentile(&mut self, percentile: f64) -> Result<u64> {
        self.totals.duration_at_percentile(percentile)
    }

    /// Compute every derived statistic
    pub fn summarize(&mut self, percentiles: &PercentileList, mode: ReportMode) -> StatsSummary {
        self.totals.summarize(percentiles, mode)
    }
}
