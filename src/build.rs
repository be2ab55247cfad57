//! Historical build records
//!
//! History is ordered newest first: index 0 is the build under evaluation.

use crate::report::RunReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Final status of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
        })
    }
}

impl BuildResult {
    /// Process exit status for this verdict: 0, 2 or 1
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildResult::Success => 0,
            BuildResult::Unstable => 2,
            BuildResult::Failure => 1,
        }
    }
}

/// One completed build and its reports
///
/// Reports are shared read-only between every constraint evaluated against
/// this build.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub number: u32,
    pub timestamp: DateTime<Utc>,
    pub result: BuildResult,
    /// Report file name → aggregated report
    pub reports: BTreeMap<String, Arc<RunReport>>,
}

impl BuildRecord {
    /// Create a build without reports
    pub fn new(number: u32, timestamp: DateTime<Utc>, result: BuildResult) -> Self {
        Self {
            number,
            timestamp,
            result,
            reports: BTreeMap::new(),
        }
    }

    /// Attach a report under its own name
    pub fn with_report(mut self, report: RunReport) -> Self {
        self.reports
            .insert(report.name().to_string(), Arc::new(report));
        self
    }

    /// Look up a report by file name
    pub fn report(&self, name: &str) -> Option<&Arc<RunReport>> {
        self.reports.get(name)
    }
}

/// Find a build by number
pub fn find_build(history: &[BuildRecord], number: u32) -> Option<&BuildRecord> {
    history.iter().find(|b| b.number == number)
}
