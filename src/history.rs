//! Build history file (JSON)
//!
//! ```json
//! [
//!   {
//!     "number": 2,
//!     "timestamp": "2026-05-02T10:00:00Z",
//!     "result": "SUCCESS",
//!     "reports": {
//!       "results.jtl": [
//!         { "endpoint": "login", "timestamp": "2026-05-02T10:00:00Z",
//!           "duration_ms": 120, "successful": true, "http_code": "200", "size_kb": 1.5 }
//!       ]
//!     }
//!   }
//! ]
//! ```
//!
//! Every sample goes through [`RunReport::add_sample`], so the configured
//! endpoint pattern and exclusion rules apply exactly as during live
//! ingestion.

use crate::build::{BuildRecord, BuildResult};
use crate::report::{ReportSettings, RunReport};
use crate::sample::Sample;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// A sample tagged with its endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySample {
    pub endpoint: String,
    #[serde(flatten)]
    pub sample: Sample,
}

/// One build as stored in the history file
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryBuild {
    pub number: u32,
    pub timestamp: DateTime<Utc>,
    pub result: BuildResult,
    #[serde(default)]
    pub reports: BTreeMap<String, Vec<HistorySample>>,
}

impl HistoryBuild {
    /// Aggregate raw samples into a build record
    pub fn into_record(self, settings: &ReportSettings) -> Result<BuildRecord> {
        let mut record = BuildRecord::new(self.number, self.timestamp, self.result);
        for (name, samples) in self.reports {
            let report = RunReport::new(name.as_str(), settings.clone())
                .with_context(|| format!("Invalid report settings for '{}'", name))?;
            let total = samples.len();
            let mut recorded = 0usize;
            for HistorySample { endpoint, sample } in samples {
                if report.add_sample(&endpoint, sample) {
                    recorded += 1;
                }
            }
            tracing::debug!(
                build = self.number,
                report = %name,
                recorded,
                dropped = total - recorded,
                "report ingested"
            );
            record = record.with_report(report);
        }
        Ok(record)
    }
}

/// Parse history JSON into newest-first build records
///
/// # Errors
/// Returns error on malformed JSON, duplicate build numbers or invalid
/// report settings.
pub fn parse_history(content: &str, settings: &ReportSettings) -> Result<Vec<BuildRecord>> {
    let mut builds: Vec<HistoryBuild> =
        serde_json::from_str(content).context("Failed to parse build history JSON")?;

    let mut seen = HashSet::new();
    for build in &builds {
        if !seen.insert(build.number) {
            anyhow::bail!("Duplicate build number #{} in history", build.number);
        }
    }

    builds.sort_by(|a, b| b.number.cmp(&a.number));
    builds
        .into_iter()
        .map(|build| build.into_record(settings))
        .collect()
}

/// Load a history file
pub fn load_history<P: AsRef<Path>>(path: P, settings: &ReportSettings) -> Result<Vec<BuildRecord>> {
    let content = fs::read_to_string(path.as_ref()).with_context(|| {
        format!("Failed to read history file: {}", path.as_ref().display())
    })?;
    parse_history(&content, settings)
        .with_context(|| format!("Invalid history file: {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = r#"[
        {
            "number": 1,
            "timestamp": "2026-05-01T10:00:00Z",
            "result": "SUCCESS",
            "reports": {
                "results.jtl": [
                    {"endpoint": "login", "timestamp": "2026-05-01T10:00:00Z", "duration_ms": 100, "successful": true},
                    {"endpoint": "health", "timestamp": "2026-05-01T10:00:01Z", "duration_ms": 5, "successful": true}
                ]
            }
        },
        {
            "number": 2,
            "timestamp": "2026-05-02T10:00:00Z",
            "result": "UNSTABLE",
            "reports": {
                "results.jtl": [
                    {"endpoint": "login", "timestamp": "2026-05-02T10:00:00Z", "duration_ms": 140, "successful": false, "http_code": "500", "size_kb": 0.5},
                    {"endpoint": "", "timestamp": "2026-05-02T10:00:01Z", "duration_ms": 9, "successful": true}
                ]
            }
        }
    ]"#;

    #[test]
    fn test_history_sorted_newest_first() {
        let history = parse_history(HISTORY, &ReportSettings::default()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].number, 2);
        assert_eq!(history[0].result, BuildResult::Unstable);
        assert_eq!(history[1].number, 1);
    }

    #[test]
    fn test_samples_go_through_ingestion() {
        let history = parse_history(HISTORY, &ReportSettings::default()).unwrap();
        let report = history[0].report("results.jtl").unwrap();
        // the sample without endpoint name is dropped
        assert_eq!(report.sample_count(), 1);
        assert_eq!(report.error_percent(), 100.0);
    }

    #[test]
    fn test_endpoint_pattern_applied() {
        let settings = ReportSettings {
            endpoint_pattern: Some("^login$".to_string()),
            ..Default::default()
        };
        let history = parse_history(HISTORY, &settings).unwrap();
        let report = history[1].report("results.jtl").unwrap();
        assert_eq!(report.endpoint_labels(), vec!["login".to_string()]);
    }

    #[test]
    fn test_duplicate_build_rejected() {
        let json = r#"[
            {"number": 1, "timestamp": "2026-05-01T10:00:00Z", "result": "SUCCESS"},
            {"number": 1, "timestamp": "2026-05-02T10:00:00Z", "result": "FAILURE"}
        ]"#;
        assert!(parse_history(json, &ReportSettings::default()).is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(parse_history("{", &ReportSettings::default()).is_err());
        assert!(load_history("/nonexistent/history.json", &ReportSettings::default()).is_err());
    }
}
