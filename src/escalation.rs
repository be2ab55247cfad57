//! Build verdict and constraint report rendering
//!
//! Verdict rule: any violated ERROR constraint fails the build, otherwise any
//! violated WARN constraint makes it unstable, otherwise it succeeds. INFO
//! violations are reported but never change the verdict.

use crate::build::BuildResult;
use crate::constraint::{ConstraintEvaluation, ConstraintKind, Escalation};
use crate::numeric::NumberFormat;
use chrono::{DateTime, Utc};

/// Overall outcome assigned to a build
pub type Verdict = BuildResult;

/// Counts over one run's evaluations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintCounts {
    pub total: usize,
    pub absolute: usize,
    pub relative: usize,
    pub successful: usize,
    pub violated: usize,
    pub violated_info: usize,
    pub violated_warn: usize,
    pub violated_error: usize,
}

impl ConstraintCounts {
    /// Tally evaluations
    pub fn from_evaluations(evaluations: &[ConstraintEvaluation]) -> Self {
        let mut counts = Self::default();
        for eval in evaluations {
            counts.total += 1;
            match eval.constraint.kind {
                ConstraintKind::Absolute(_) => counts.absolute += 1,
                ConstraintKind::Relative(_) => counts.relative += 1,
            }
            if eval.success {
                counts.successful += 1;
                continue;
            }
            counts.violated += 1;
            match eval.constraint.escalation {
                Escalation::Info => counts.violated_info += 1,
                Escalation::Warn => counts.violated_warn += 1,
                Escalation::Error => counts.violated_error += 1,
            }
        }
        counts
    }

    /// Verdict implied by the violation counts
    pub fn verdict(&self) -> Verdict {
        if self.violated_error > 0 {
            BuildResult::Failure
        } else if self.violated_warn > 0 {
            BuildResult::Unstable
        } else {
            BuildResult::Success
        }
    }
}

/// Evaluations of one build, ready for publishing
#[derive(Debug, Clone)]
pub struct ConstraintReport {
    pub build_number: u32,
    pub timestamp: DateTime<Utc>,
    pub evaluations: Vec<ConstraintEvaluation>,
    pub counts: ConstraintCounts,
    format: NumberFormat,
}

impl ConstraintReport {
    pub fn new(
        build_number: u32,
        timestamp: DateTime<Utc>,
        evaluations: Vec<ConstraintEvaluation>,
    ) -> Self {
        let counts = ConstraintCounts::from_evaluations(&evaluations);
        Self {
            build_number,
            timestamp,
            evaluations,
            counts,
            format: NumberFormat::default(),
        }
    }

    /// Number format of the text and env renderings
    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    pub fn verdict(&self) -> Verdict {
        self.counts.verdict()
    }

    /// Violated evaluations in input order
    pub fn violations(&self) -> impl Iterator<Item = &ConstraintEvaluation> {
        self.evaluations.iter().filter(|e| e.is_violation())
    }

    /// Plain-text report
    ///
    /// Header, relative results, absolute results, then a table of the
    /// violated constraints only.
    pub fn to_text(&self) -> String {
        let c = &self.counts;
        let mut out = String::new();

        out.push_str("=== Performance Constraint Report ===\n");
        out.push_str(&format!("Build:      #{}\n", self.build_number));
        out.push_str(&format!(
            "Timestamp:  {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!("Verdict:    {}\n", self.verdict()));
        out.push_str(&format!(
            "Constraints: {} total ({} absolute, {} relative), {} successful, {} violated\n",
            c.total, c.absolute, c.relative, c.successful, c.violated
        ));
        out.push_str(&format!(
            "Violations:  {} INFO, {} WARN, {} ERROR\n",
            c.violated_info, c.violated_warn, c.violated_error
        ));

        out.push_str("\n--- Relative constraints ---\n");
        self.push_messages(&mut out, |e| e.constraint.is_relative());

        out.push_str("\n--- Absolute constraints ---\n");
        self.push_messages(&mut out, |e| e.constraint.is_absolute());

        out.push_str("\n--- Violated constraints ---\n");
        if c.violated == 0 {
            out.push_str("none\n");
            return out;
        }
        out.push_str(&format!(
            "{:<24} {:<24} {:<14} {:<12} {:>14} {:<10}\n",
            "report", "endpoint", "metric", "operator", "threshold", "escalation"
        ));
        out.push_str(&format!("{}\n", "-".repeat(103)));
        for eval in self.violations() {
            let constraint = &eval.constraint;
            out.push_str(&format!(
                "{:<24} {:<24} {:<14} {:<12} {:>14} {:<10}\n",
                constraint.report,
                constraint.endpoint.to_string(),
                constraint.metric.to_string(),
                constraint.kind.operator().to_string(),
                self.format.format(eval.threshold),
                constraint.escalation.to_string(),
            ));
        }
        out
    }

    fn push_messages(&self, out: &mut String, include: impl Fn(&ConstraintEvaluation) -> bool) {
        let mut any = false;
        for eval in self.evaluations.iter().filter(|e| include(*e)) {
            out.push_str(&eval.message);
            out.push('\n');
            any = true;
        }
        if !any {
            out.push_str("none\n");
        }
    }

    /// `KEY=value` lines for the host's environment
    pub fn to_env_vars(&self) -> String {
        let c = &self.counts;
        let vars = [
            ("PERFGATE_VERDICT", self.verdict().to_string()),
            ("PERFGATE_BUILD", self.build_number.to_string()),
            ("PERFGATE_CONSTRAINTS_TOTAL", c.total.to_string()),
            ("PERFGATE_CONSTRAINTS_ABSOLUTE", c.absolute.to_string()),
            ("PERFGATE_CONSTRAINTS_RELATIVE", c.relative.to_string()),
            ("PERFGATE_CONSTRAINTS_SUCCESSFUL", c.successful.to_string()),
            ("PERFGATE_CONSTRAINTS_VIOLATED", c.violated.to_string()),
            ("PERFGATE_VIOLATED_INFO", c.violated_info.to_string()),
            ("PERFGATE_VIOLATED_WARN", c.violated_warn.to_string()),
            ("PERFGATE_VIOLATED_ERROR", c.violated_error.to_string()),
        ];
        vars.iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }

    /// JUnit XML, one test case per evaluated constraint
    pub fn to_junit_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="perfgate.build-{}" tests="{}" failures="{}" timestamp="{}">"#,
            self.build_number,
            self.counts.total,
            self.counts.violated,
            self.timestamp.to_rfc3339(),
        ));
        xml.push('\n');

        for eval in &self.evaluations {
            let case = &eval.test_case;
            xml.push_str(&format!(
                r#"  <testcase classname="{}" name="{}">"#,
                escape(&case.classname),
                escape(&case.name)
            ));
            if let Some(failure) = &case.failure {
                xml.push_str(&format!(
                    r#"<failure type="{}" message="{}"/>"#,
                    eval.constraint.escalation,
                    escape(failure)
                ));
            }
            xml.push_str("</testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape an XML attribute value
///
/// Characters XML 1.0 cannot carry (other control characters, U+FFFE,
/// U+FFFF) are dropped; tab and line breaks are kept as character references.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\u{FFFE}' | '\u{FFFF}' => {}
            c if c < ' ' => {}
            c => out.push(c),
        }
    }
    out
}
