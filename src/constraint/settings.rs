//! Global constraint settings and the evaluation context
//!
//! Settings are passed into every evaluation explicitly; constraints never
//! reach for shared global state.

use crate::numeric::NumberFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings shared by every constraint of a job
///
/// # Example
/// ```
/// use perfgate::constraint::GlobalSettings;
///
/// let settings = GlobalSettings::default();
/// assert!(!settings.ignore_failed_builds);
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Leave FAILURE builds out of relative baselines
    pub ignore_failed_builds: bool,

    /// Leave UNSTABLE builds out of relative baselines
    pub ignore_unstable_builds: bool,

    /// Write the rendered constraint report next to the build
    pub persist_constraint_log: bool,

    /// Build number used by baseline-selection relative constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_build: Option<u32>,
}

impl GlobalSettings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), String> {
        if self.baseline_build == Some(0) {
            return Err("baseline_build must be a build number >= 1".to_string());
        }
        Ok(())
    }
}

/// Everything an evaluation may read besides the build history
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    pub settings: &'a GlobalSettings,
    /// Resolves the `now` end of timeframes
    pub now: DateTime<Utc>,
    /// Number rendering in result messages
    pub format: NumberFormat,
}

impl<'a> EvaluationContext<'a> {
    /// Context evaluated at the current wall-clock time
    pub fn new(settings: &'a GlobalSettings) -> Self {
        Self {
            settings,
            now: Utc::now(),
            format: NumberFormat::default(),
        }
    }

    /// Pin evaluation time
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Use a specific number format
    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }
}
