//! Gate configuration file (`perfgate.toml`)
//!
//! ```toml
//! [report]
//! percentiles = "0,50,90,100"
//!
//! [settings]
//! ignore_unstable_builds = true
//!
//! [[constraint]]
//! kind = "relative"
//! report = "results.jtl"
//! endpoint = "*"
//! metric = "average"
//! operator = "not_greater"
//! escalation = "warn"
//! tolerance = 5.0
//! previous_results = 3
//! ```

use crate::constraint::{
    BuildSelection, Constraint, ConstraintKind, Escalation, GlobalSettings, Metric, Operator,
    PreviousResults, RelativeSpec, Timeframe,
};
use crate::error::GateError;
use crate::filter::EndpointScope;
use crate::numeric::NumberFormat;
use crate::report::ReportSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Constraint flavour in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    Absolute,
    Relative,
}

/// `previous_results` accepts a number (`-1` for any) or `"*"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviousResultsSetting {
    Number(i64),
    Text(String),
}

impl PreviousResultsSetting {
    fn resolve(&self) -> crate::error::Result<PreviousResults> {
        match self {
            PreviousResultsSetting::Number(n) => PreviousResults::from_i64(*n),
            PreviousResultsSetting::Text(text) => PreviousResults::parse(text),
        }
    }
}

/// One `[[constraint]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDefinition {
    pub kind: ConstraintType,
    pub report: String,
    /// Endpoint name, `*` or a comma list; whole report when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub metric: Metric,
    pub operator: Operator,
    #[serde(default = "default_escalation")]
    pub escalation: Escalation,

    /// Absolute threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// Relative tolerance in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_results: Option<PreviousResultsSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe_end: Option<String>,
    /// Compare against `settings.baseline_build`
    #[serde(default)]
    pub baseline: bool,
    #[serde(default)]
    pub ignore_failed_builds: bool,
    #[serde(default)]
    pub ignore_unstable_builds: bool,
}

fn default_escalation() -> Escalation {
    Escalation::Error
}

impl ConstraintDefinition {
    fn selection(&self) -> crate::error::Result<BuildSelection> {
        let has_timeframe = self.timeframe_start.is_some() || self.timeframe_end.is_some();
        let chosen = [self.previous_results.is_some(), has_timeframe, self.baseline]
            .iter()
            .filter(|set| **set)
            .count();
        if chosen != 1 {
            return Err(GateError::config(format!(
                "relative constraint on '{}' needs exactly one of previous_results, timeframe_start/timeframe_end or baseline",
                self.report
            )));
        }

        if let Some(previous) = &self.previous_results {
            return Ok(BuildSelection::PreviousResults(previous.resolve()?));
        }
        if self.baseline {
            return Ok(BuildSelection::Baseline);
        }

        let start = self.timeframe_start.as_deref().ok_or_else(|| {
            GateError::config(format!("timeframe on '{}' is missing timeframe_start", self.report))
        })?;
        let end = self.timeframe_end.as_deref().unwrap_or("now");
        Ok(BuildSelection::Timeframe(Timeframe::parse(start, end)?))
    }
}

impl TryFrom<&ConstraintDefinition> for Constraint {
    type Error = GateError;

    fn try_from(def: &ConstraintDefinition) -> crate::error::Result<Self> {
        if def.report.trim().is_empty() {
            return Err(GateError::config("constraint report name must not be empty"));
        }

        let constraint = match def.kind {
            ConstraintType::Absolute => {
                let value = def.value.ok_or_else(|| {
                    GateError::config(format!(
                        "absolute constraint on '{}' requires a value",
                        def.report
                    ))
                })?;
                Constraint::absolute(
                    def.report.trim(),
                    def.metric,
                    def.operator,
                    value,
                    def.escalation,
                )
            }
            ConstraintType::Relative => {
                let tolerance = def.tolerance.ok_or_else(|| {
                    GateError::config(format!(
                        "relative constraint on '{}' requires a tolerance",
                        def.report
                    ))
                })?;
                Constraint {
                    metric: def.metric,
                    escalation: def.escalation,
                    report: def.report.trim().to_string(),
                    endpoint: EndpointScope::WholeReport,
                    kind: ConstraintKind::Relative(RelativeSpec {
                        operator: def.operator,
                        tolerance,
                        selection: def.selection()?,
                        ignore_failed: def.ignore_failed_builds,
                        ignore_unstable: def.ignore_unstable_builds,
                    }),
                }
            }
        };

        Ok(constraint.with_endpoint(EndpointScope::parse(def.endpoint.as_deref())))
    }
}

/// Complete gate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Aggregation options applied to every report
    pub report: ReportSettings,
    pub settings: GlobalSettings,
    /// Number rendering of text output
    pub format: NumberFormat,
    #[serde(rename = "constraint")]
    pub constraints: Vec<ConstraintDefinition>,
}

impl GateConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    /// Returns error if the file can't be read, isn't valid TOML, or fails
    /// validation.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GateConfig =
            toml::from_str(content).context("Failed to parse TOML gate configuration")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.report.validate()?;
        self.settings.validate()?;
        if self.format.decimals > 12 {
            return Err(format!(
                "format.decimals must be at most 12, got {}",
                self.format.decimals
            ));
        }
        for (i, def) in self.constraints.iter().enumerate() {
            Constraint::try_from(def).map_err(|e| format!("constraint #{}: {}", i + 1, e))?;
        }
        Ok(())
    }

    /// Declared constraints, in file order
    pub fn constraints(&self) -> Result<Vec<Constraint>> {
        self.constraints
            .iter()
            .enumerate()
            .map(|(i, def)| {
                Constraint::try_from(def).with_context(|| format!("constraint #{}", i + 1))
            })
            .collect()
    }
}
