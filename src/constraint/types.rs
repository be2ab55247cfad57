//! Constraint model
//!
//! A [`Constraint`] is a quality gate on one metric of one report. The
//! variant-specific part lives in [`ConstraintKind`]: an absolute constraint
//! carries a fixed value, a relative one carries a tolerance and the policy
//! that picks the historical builds it compares against.

use crate::error::{GateError, Result};
use crate::filter::EndpointScope;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::stats::Metric;

/// Comparison applied between measured value and threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    NotLess,
    NotGreater,
    /// Absolute constraints only
    NotEqual,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::NotLess => "NOT_LESS",
            Operator::NotGreater => "NOT_GREATER",
            Operator::NotEqual => "NOT_EQUAL",
        })
    }
}

/// Severity of a violation
///
/// Ordered: `Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escalation {
    #[serde(alias = "information")]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Escalation::Info => "INFO",
            Escalation::Warn => "WARN",
            Escalation::Error => "ERROR",
        })
    }
}

/// How many earlier builds a relative constraint looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousResults {
    /// At most this many qualifying builds
    Count(usize),
    /// Every qualifying build in the history (`-1` or `*`)
    Any,
}

impl PreviousResults {
    /// Interpret the numeric form: `-1` means any, `N >= 1` a count
    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(PreviousResults::Any),
            n if n >= 1 => Ok(PreviousResults::Count(n as usize)),
            n => Err(GateError::config(format!(
                "previous results must be -1 (any) or at least 1, got {}",
                n
            ))),
        }
    }

    /// Interpret the textual form: `*` or a number
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec == "*" {
            return Ok(PreviousResults::Any);
        }
        let value: i64 = spec.parse().map_err(|_| {
            GateError::config(format!("invalid previous results value '{}'", spec))
        })?;
        Self::from_i64(value)
    }
}

impl fmt::Display for PreviousResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviousResults::Count(n) => write!(f, "{}", n),
            PreviousResults::Any => write!(f, "*"),
        }
    }
}

/// Upper bound of a timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeframeEnd {
    /// Evaluation time
    Now,
    At(DateTime<Utc>),
}

/// Inclusive time window of builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeframe {
    pub start: DateTime<Utc>,
    pub end: TimeframeEnd,
}

/// Accepted layout for timeframe bounds besides RFC 3339
pub const TIMEFRAME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse a timeframe bound: `YYYY-MM-DD HH:MM` (UTC) or RFC 3339
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, TIMEFRAME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            GateError::config(format!(
                "invalid date '{}': expected '{}' or RFC 3339",
                text, "YYYY-MM-DD HH:MM"
            ))
        })
}

impl Timeframe {
    /// Parse start and end; `end` may be `now`
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_timestamp(start)?;
        let end = if end.trim().eq_ignore_ascii_case("now") {
            TimeframeEnd::Now
        } else {
            TimeframeEnd::At(parse_timestamp(end)?)
        };
        Ok(Self { start, end })
    }

    /// Concrete end at evaluation time
    pub fn resolved_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.end {
            TimeframeEnd::Now => now,
            TimeframeEnd::At(end) => end,
        }
    }

    /// Reject windows whose start lies after their end
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        let end = self.resolved_end(now);
        if self.start > end {
            return Err(GateError::config(format!(
                "timeframe start {} is after end {}",
                self.start.format(TIMEFRAME_FORMAT),
                end.format(TIMEFRAME_FORMAT)
            )));
        }
        Ok(())
    }
}

/// Which historical builds form the baseline of a relative constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSelection {
    /// The last N qualifying builds before the evaluated one
    PreviousResults(PreviousResults),
    /// Every qualifying build inside a time window
    Timeframe(Timeframe),
    /// The single baseline build named in the global settings
    Baseline,
}

impl fmt::Display for BuildSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSelection::PreviousResults(PreviousResults::Any) => {
                write!(f, "all previous builds")
            }
            BuildSelection::PreviousResults(PreviousResults::Count(n)) => {
                write!(f, "last {} build(s)", n)
            }
            BuildSelection::Timeframe(tf) => {
                let end = match tf.end {
                    TimeframeEnd::Now => "now".to_string(),
                    TimeframeEnd::At(end) => end.format(TIMEFRAME_FORMAT).to_string(),
                };
                write!(f, "builds from {} to {}", tf.start.format(TIMEFRAME_FORMAT), end)
            }
            BuildSelection::Baseline => write!(f, "baseline build"),
        }
    }
}

/// Fixed-threshold gate
#[derive(Debug, Clone, PartialEq)]
pub struct AbsoluteSpec {
    pub operator: Operator,
    /// Threshold, must not be negative
    pub value: f64,
}

/// Gate against a historical baseline
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeSpec {
    /// `NotLess` or `NotGreater`
    pub operator: Operator,
    /// Allowed deviation from the baseline in percent, must not be negative
    pub tolerance: f64,
    pub selection: BuildSelection,
    /// Skip FAILURE builds (in addition to the global setting)
    pub ignore_failed: bool,
    /// Skip UNSTABLE builds (in addition to the global setting)
    pub ignore_unstable: bool,
}

/// Variant-specific part of a constraint
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    Absolute(AbsoluteSpec),
    Relative(RelativeSpec),
}

impl ConstraintKind {
    /// Lowercase variant name
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Absolute(_) => "absolute",
            ConstraintKind::Relative(_) => "relative",
        }
    }

    /// Configured comparison
    pub fn operator(&self) -> Operator {
        match self {
            ConstraintKind::Absolute(spec) => spec.operator,
            ConstraintKind::Relative(spec) => spec.operator,
        }
    }
}

/// User-declared quality gate
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub metric: Metric,
    pub escalation: Escalation,
    /// Report file name the constraint applies to
    pub report: String,
    pub endpoint: EndpointScope,
    pub kind: ConstraintKind,
}

impl Constraint {
    /// Absolute constraint on the whole report
    pub fn absolute(
        report: impl Into<String>,
        metric: Metric,
        operator: Operator,
        value: f64,
        escalation: Escalation,
    ) -> Self {
        Self {
            metric,
            escalation,
            report: report.into(),
            endpoint: EndpointScope::WholeReport,
            kind: ConstraintKind::Absolute(AbsoluteSpec { operator, value }),
        }
    }

    /// Relative constraint on the whole report
    pub fn relative(
        report: impl Into<String>,
        metric: Metric,
        operator: Operator,
        tolerance: f64,
        selection: BuildSelection,
        escalation: Escalation,
    ) -> Self {
        Self {
            metric,
            escalation,
            report: report.into(),
            endpoint: EndpointScope::WholeReport,
            kind: ConstraintKind::Relative(RelativeSpec {
                operator,
                tolerance,
                selection,
                ignore_failed: false,
                ignore_unstable: false,
            }),
        }
    }

    /// Narrow to an endpoint scope
    pub fn with_endpoint(mut self, scope: EndpointScope) -> Self {
        self.endpoint = scope;
        self
    }

    /// Copy of this constraint bound to a single endpoint
    pub fn for_endpoint(&self, name: impl Into<String>) -> Self {
        Self {
            endpoint: EndpointScope::Single(name.into()),
            ..self.clone()
        }
    }

    /// Whether this is an absolute constraint
    pub fn is_absolute(&self) -> bool {
        matches!(self.kind, ConstraintKind::Absolute(_))
    }

    /// Whether this is a relative constraint
    pub fn is_relative(&self) -> bool {
        matches!(self.kind, ConstraintKind::Relative(_))
    }

    /// Stable identifier, used as JUnit test case name
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.kind.name(),
            self.report,
            match &self.endpoint {
                EndpointScope::WholeReport => "all".to_string(),
                other => other.to_string(),
            },
            self.metric,
            self.kind.operator()
        )
    }
}

/// Outcome of evaluating one constraint
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintEvaluation {
    pub constraint: Constraint,
    /// Value the measurement was compared against (0 without comparable builds)
    pub threshold: f64,
    /// Value of the evaluated build (0 without comparable builds)
    pub measured: f64,
    /// Averaged historical value, relative constraints only
    pub baseline: Option<f64>,
    /// Build numbers the baseline was computed from
    pub compared_builds: Vec<u32>,
    pub success: bool,
    /// Human-readable explanation
    pub message: String,
    /// JUnit-shaped record of this evaluation
    pub test_case: TestCase,
}

impl ConstraintEvaluation {
    /// Whether the constraint was violated
    pub fn is_violation(&self) -> bool {
        !self.success
    }
}

/// Machine-readable per-constraint test result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub classname: String,
    pub name: String,
    /// Failure sentence; `None` when the constraint passed
    pub failure: Option<String>,
}
