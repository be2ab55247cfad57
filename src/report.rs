//! Per-run report aggregation
//!
//! A [`RunReport`] groups [`EndpointStats`] by normalized endpoint key and
//! keeps run-level totals across all endpoints. Ingestion may happen from
//! several parser threads at once: every mutation, and every cache rebuild,
//! happens inside one mutex per report.
//!
//! Derived statistics are memoised as an `Arc<RunSummary>` until the next
//! sample arrives.

use crate::error::Result;
use crate::filter::{normalize_endpoint, EndpointFilter};
use crate::numeric::{round_to, safe_divide, NumberFormat};
use crate::sample::Sample;
use crate::stats::{Accumulator, EndpointStats, PercentileList, ReportMode, StatsSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ingestion and aggregation options of a report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Percentiles to materialise, e.g. `"0,50,90,100"`
    pub percentiles: PercentileList,

    /// Only endpoints whose name matches this regex are recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_pattern: Option<String>,

    /// Leave failed requests out of averages and percentiles
    pub exclude_failed_response_time: bool,

    /// Per-request samples or pre-aggregated summarizer records
    pub mode: ReportMode,
}

impl ReportSettings {
    /// Validate settings
    pub fn validate(&self) -> std::result::Result<(), String> {
        EndpointFilter::from_optional(self.endpoint_pattern.as_deref())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Derived statistics of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Aggregate across every endpoint
    pub overall: StatsSummary,
    /// Per-endpoint statistics keyed by normalized endpoint
    pub endpoints: BTreeMap<String, StatsSummary>,
    /// Endpoint labels as reported, keyed by normalized endpoint
    pub labels: BTreeMap<String, String>,
}

impl RunSummary {
    /// Statistics of an endpoint, looked up by name or key
    pub fn endpoint(&self, name: &str) -> Option<&StatsSummary> {
        self.endpoints.get(&normalize_endpoint(name))
    }

    /// Render a fixed-width statistics table
    pub fn to_table_string(&self, format: &NumberFormat) -> String {
        let ms = format.with_decimals(0);
        let mut out = String::new();
        out.push_str(&format!(
            "{:<32} {:>9} {:>7} {:>10} {:>8} {:>8} {:>8} {:>8} {:>9} {:>10}\n",
            "endpoint", "samples", "errors", "average", "median", "p90", "min", "max", "error%", "req/s"
        ));
        out.push_str(&format!("{}\n", "-".repeat(120)));

        let mut row = |name: &str, s: &StatsSummary| {
            out.push_str(&format!(
                "{:<32} {:>9} {:>7} {:>10} {:>8} {:>8} {:>8} {:>8} {:>9} {:>10}\n",
                name,
                s.count,
                s.errors,
                format.format(s.average),
                ms.format(s.median as f64),
                ms.format(s.p90 as f64),
                ms.format(s.min as f64),
                ms.format(s.max as f64),
                format.format(s.error_percent),
                format.format(s.throughput),
            ));
        };

        for (key, stats) in &self.endpoints {
            let label = self.labels.get(key).map(String::as_str).unwrap_or(key);
            row(label, stats);
        }
        row("total", &self.overall);
        out
    }
}

#[derive(Debug, Default)]
struct ReportState {
    endpoints: BTreeMap<String, EndpointStats>,
    totals: Accumulator,
    summary: Option<Arc<RunSummary>>,
}

/// Aggregated statistics of one result file of one run
#[derive(Debug)]
pub struct RunReport {
    name: String,
    settings: ReportSettings,
    filter: EndpointFilter,
    state: Mutex<ReportState>,
}

impl RunReport {
    /// Create an empty report
    ///
    /// # Errors
    /// Returns a configuration error when the endpoint pattern does not compile.
    pub fn new(name: impl Into<String>, settings: ReportSettings) -> Result<Self> {
        let filter = EndpointFilter::from_optional(settings.endpoint_pattern.as_deref())?;
        Ok(Self {
            name: name.into(),
            settings,
            filter,
            state: Mutex::new(ReportState::default()),
        })
    }

    /// Create an empty report with default settings
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: ReportSettings::default(),
            filter: EndpointFilter::all(),
            state: Mutex::new(ReportState::default()),
        }
    }

    /// Report (result file) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings this report was created with
    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, ReportState> {
        // No critical section can leave the state half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a sample under an endpoint
    ///
    /// Samples with an empty endpoint name, or a name rejected by the
    /// inclusion pattern, are dropped with a warning. Returns whether the
    /// sample was recorded.
    pub fn add_sample(&self, endpoint: &str, sample: Sample) -> bool {
        if endpoint.trim().is_empty() {
            tracing::warn!(report = %self.name, "dropping sample without endpoint name");
            return false;
        }
        if !self.filter.should_include(endpoint) {
            tracing::warn!(
                report = %self.name,
                endpoint,
                pattern = self.filter.pattern().unwrap_or_default(),
                "dropping sample: endpoint excluded by pattern"
            );
            return false;
        }

        let key = normalize_endpoint(endpoint);
        let exclude_failed = self.settings.exclude_failed_response_time;

        let mut state = self.lock();
        state.totals.record(&sample, exclude_failed);
        state
            .endpoints
            .entry(key)
            .or_insert_with(|| EndpointStats::new(endpoint.trim()))
            .record(sample, exclude_failed);
        state.summary = None;
        true
    }

    /// Number of recorded samples
    pub fn sample_count(&self) -> u64 {
        self.lock().totals.count()
    }

    /// Normalized endpoint keys, sorted
    pub fn endpoint_keys(&self) -> Vec<String> {
        self.lock().endpoints.keys().cloned().collect()
    }

    /// Endpoint labels as reported, in key order
    pub fn endpoint_labels(&self) -> Vec<String> {
        self.lock()
            .endpoints
            .values()
            .map(|e| e.label().to_string())
            .collect()
    }

    /// Whether an endpoint (by name or key) has samples in this report
    pub fn has_endpoint(&self, name: &str) -> bool {
        self.lock().endpoints.contains_key(&normalize_endpoint(name))
    }

    /// Recorded samples of an endpoint in insertion order
    pub fn endpoint_samples(&self, name: &str) -> Option<Vec<Sample>> {
        self.lock()
            .endpoints
            .get(&normalize_endpoint(name))
            .map(|e| e.samples().to_vec())
    }

    /// Run-level duration at a percentile, `0 <= percentile <= 100`
    pub fn duration_at_percentile(&self, percentile: f64) -> Result<u64> {
        self.lock().totals.duration_at_percentile(percentile)
    }

    /// Endpoint duration at a percentile; `None` when the endpoint is absent
    pub fn endpoint_duration_at_percentile(
        &self,
        name: &str,
        percentile: f64,
    ) -> Option<Result<u64>> {
        self.lock()
            .endpoints
            .get_mut(&normalize_endpoint(name))
            .map(|e| e.duration_at_percentile(percentile))
    }

    /// Derived statistics, memoised until the next sample
    pub fn summary(&self) -> Arc<RunSummary> {
        let mut state = self.lock();
        if let Some(summary) = &state.summary {
            return Arc::clone(summary);
        }

        let percentiles = &self.settings.percentiles;
        let mode = self.settings.mode;
        let state = &mut *state;

        let mut endpoints = BTreeMap::new();
        let mut labels = BTreeMap::new();
        for (key, stats) in state.endpoints.iter_mut() {
            endpoints.insert(key.clone(), stats.summarize(percentiles, mode));
            labels.insert(key.clone(), stats.label().to_string());
        }

        let mut overall = state.totals.summarize(percentiles, mode);
        if mode == ReportMode::Summarizer {
            overall.error_percent = summarizer_run_error_percent(
                state.totals.summarizer_error_sum(),
                state.endpoints.len(),
            );
        }

        let summary = Arc::new(RunSummary {
            overall,
            endpoints,
            labels,
        });
        state.summary = Some(Arc::clone(&summary));
        summary
    }

    /// Mean duration across the run
    pub fn average(&self) -> f64 {
        self.summary().overall.average
    }

    /// Run-level median
    pub fn median(&self) -> u64 {
        self.summary().overall.median
    }

    /// Run-level 90th percentile
    pub fn p90(&self) -> u64 {
        self.summary().overall.p90
    }

    /// Fastest duration of the run
    pub fn min(&self) -> u64 {
        self.summary().overall.min
    }

    /// Slowest duration of the run
    pub fn max(&self) -> u64 {
        self.summary().overall.max
    }

    /// Run-level error percentage
    pub fn error_percent(&self) -> f64 {
        self.summary().overall.error_percent
    }

    /// Run-level requests per second
    pub fn throughput(&self) -> f64 {
        self.summary().overall.throughput
    }
}

/// Run error percentage in summarizer mode
///
/// The sum of every record's error percentage is divided by the number of
/// endpoints, not by the number of records.
fn summarizer_run_error_percent(error_sum: f64, endpoint_count: usize) -> f64 {
    if endpoint_count == 0 {
        return 0.0;
    }
    let value = safe_divide(error_sum, endpoint_count as f64);
    round_to(value.clamp(0.0, 100.0), 3)
}
