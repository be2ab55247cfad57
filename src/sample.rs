//! Per-request samples produced by load-test result parsers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One recorded request
///
/// Samples are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Request start time
    pub timestamp: DateTime<Utc>,
    /// Elapsed time in milliseconds
    pub duration_ms: u64,
    /// Whether the request succeeded
    pub successful: bool,
    /// Response code as reported by the load-test tool (may be non-numeric)
    #[serde(default)]
    pub http_code: String,
    /// Response size in kilobytes
    #[serde(default)]
    pub size_kb: f64,
    /// Present when this record pre-aggregates many requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer: Option<SummarizerRecord>,
}

/// Aggregate carried by a pre-summarised record
///
/// Summarizer-style result files report one line per interval instead of one
/// line per request; `duration_ms` of the owning sample is then the interval
/// average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerRecord {
    /// Number of requests folded into this record
    pub samples: u64,
    /// Error percentage over those requests, `0..=100`
    pub error_percent: f64,
    /// Fastest request in milliseconds
    pub min_ms: u64,
    /// Slowest request in milliseconds
    pub max_ms: u64,
}

impl Sample {
    /// Create a plain per-request sample
    pub fn new(
        timestamp: DateTime<Utc>,
        duration_ms: u64,
        successful: bool,
        http_code: impl Into<String>,
        size_kb: f64,
    ) -> Self {
        Self {
            timestamp,
            duration_ms,
            successful,
            http_code: http_code.into(),
            size_kb,
            summarizer: None,
        }
    }

    /// Attach summarizer data
    pub fn with_summarizer(mut self, record: SummarizerRecord) -> Self {
        self.summarizer = Some(record);
        self
    }

    /// Whether this record pre-aggregates several requests
    pub fn is_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    /// Time the request finished
    pub fn end(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.duration_ms).unwrap_or(i64::MAX);
        Duration::try_milliseconds(millis)
            .and_then(|d| self.timestamp.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_end() {
        let start = Utc.timestamp_millis_opt(1_000).unwrap();
        let sample = Sample::new(start, 250, true, "200", 1.5);
        assert_eq!(sample.end().timestamp_millis(), 1_250);
        assert!(!sample.is_summarizer());
    }

    #[test]
    fn test_sample_with_summarizer() {
        let start = Utc.timestamp_millis_opt(0).unwrap();
        let sample = Sample::new(start, 40, true, "", 0.0).with_summarizer(SummarizerRecord {
            samples: 120,
            error_percent: 2.5,
            min_ms: 10,
            max_ms: 90,
        });
        assert!(sample.is_summarizer());
    }

    #[test]
    fn test_sample_deserialize_defaults() {
        let json = r#"{"timestamp":"2026-03-01T10:00:00Z","duration_ms":12,"successful":false}"#;
        let sample: Sample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.http_code, "");
        assert_eq!(sample.size_kb, 0.0);
        assert!(sample.summarizer.is_none());
    }
}
