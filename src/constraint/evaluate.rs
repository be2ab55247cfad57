//! Constraint evaluation against a build history
//!
//! ```text
//! history[0] (evaluated build) ──► target report ──► endpoint? ──► measured
//! history[1..] ── BuildSelector ──► same report/endpoint ──► mean ──► baseline
//!                                                     baseline ± tolerance ──► threshold
//! ```

use crate::build::BuildRecord;
use crate::constraint::selector::BuildSelector;
use crate::constraint::settings::EvaluationContext;
use crate::constraint::types::{
    AbsoluteSpec, Constraint, ConstraintEvaluation, ConstraintKind, Operator, RelativeSpec,
    TestCase,
};
use crate::error::{GateError, Result};
use crate::numeric::{safe_divide, NumberFormat};

impl Constraint {
    /// Evaluate against `history` (newest first, evaluated build at index 0)
    ///
    /// # Errors
    /// Configuration errors only: empty history, missing report or endpoint,
    /// unexpanded endpoint scope, negative value or tolerance, `NotEqual` on a
    /// relative constraint, inverted timeframe, missing baseline setting.
    pub fn evaluate(
        &self,
        history: &[BuildRecord],
        ctx: &EvaluationContext<'_>,
    ) -> Result<ConstraintEvaluation> {
        let current = history
            .first()
            .ok_or_else(|| GateError::config("no builds available for evaluation"))?;

        if self.endpoint.needs_expansion() {
            return Err(GateError::config(format!(
                "endpoint scope '{}' must be expanded before evaluation",
                self.endpoint
            )));
        }

        match &self.kind {
            ConstraintKind::Absolute(spec) => self.evaluate_absolute(spec, current, ctx),
            ConstraintKind::Relative(spec) => self.evaluate_relative(spec, history, ctx),
        }
    }

    /// Metric value of this constraint's report/endpoint in `build`
    ///
    /// # Errors
    /// Configuration error when the report or endpoint is absent.
    pub fn measure(&self, build: &BuildRecord) -> Result<f64> {
        let report = build.report(&self.report).ok_or_else(|| {
            GateError::config(format!(
                "report '{}' not found in build #{}",
                self.report, build.number
            ))
        })?;

        let summary = report.summary();
        match self.endpoint.single() {
            None => Ok(summary.overall.metric(self.metric)),
            Some(name) => summary
                .endpoint(name)
                .map(|stats| stats.metric(self.metric))
                .ok_or_else(|| {
                    GateError::config(format!(
                        "endpoint '{}' not found in report '{}' of build #{}",
                        name, self.report, build.number
                    ))
                }),
        }
    }

    fn evaluate_absolute(
        &self,
        spec: &AbsoluteSpec,
        current: &BuildRecord,
        ctx: &EvaluationContext<'_>,
    ) -> Result<ConstraintEvaluation> {
        if spec.value < 0.0 || spec.value.is_nan() {
            return Err(GateError::config(format!(
                "absolute value must not be negative, got {}",
                spec.value
            )));
        }

        let measured = self.measure(current)?;
        let success = match spec.operator {
            Operator::NotGreater => measured <= spec.value,
            Operator::NotLess => measured >= spec.value,
            Operator::NotEqual => measured != spec.value,
        };

        let fmt = &ctx.format;
        let message = format!(
            "Absolute constraint on report '{}' ({}): {} must be {} {}{}; measured {}{}; escalation {}. Result: {}",
            self.report,
            self.endpoint,
            self.metric,
            spec.operator,
            fmt.format(spec.value),
            self.metric.unit(),
            fmt.format(measured),
            self.metric.unit(),
            self.escalation,
            outcome(success),
        );

        Ok(ConstraintEvaluation {
            test_case: self.test_case(success, measured, spec.value, spec.value, "value", fmt),
            constraint: self.clone(),
            threshold: spec.value,
            measured,
            baseline: None,
            compared_builds: Vec::new(),
            success,
            message,
        })
    }

    fn evaluate_relative(
        &self,
        spec: &RelativeSpec,
        history: &[BuildRecord],
        ctx: &EvaluationContext<'_>,
    ) -> Result<ConstraintEvaluation> {
        if spec.operator == Operator::NotEqual {
            return Err(GateError::config(
                "relative constraints support only NOT_LESS and NOT_GREATER",
            ));
        }
        if spec.tolerance < 0.0 || spec.tolerance.is_nan() {
            return Err(GateError::config(format!(
                "tolerance must not be negative, got {}",
                spec.tolerance
            )));
        }

        // Validates report and endpoint of the evaluated build up front.
        let measured = self.measure(&history[0])?;

        let selector = BuildSelector::new(
            history,
            spec.ignore_failed || ctx.settings.ignore_failed_builds,
            spec.ignore_unstable || ctx.settings.ignore_unstable_builds,
        );
        let selected = selector.select(&spec.selection, ctx.settings.baseline_build, ctx.now)?;

        let mut values = Vec::with_capacity(selected.len());
        let mut compared_builds = Vec::with_capacity(selected.len());
        for build in selected {
            match self.measure(build) {
                Ok(value) => {
                    values.push(value);
                    compared_builds.push(build.number);
                }
                Err(e) => {
                    tracing::debug!(build = build.number, error = %e, "build skipped for baseline");
                }
            }
        }

        let fmt = &ctx.format;
        if values.is_empty() {
            return Ok(self.no_comparable_builds(spec, history.len()));
        }

        let baseline = values.iter().sum::<f64>() / values.len() as f64;
        let threshold = match spec.operator {
            Operator::NotGreater => baseline * (1.0 + spec.tolerance / 100.0),
            _ => baseline * (1.0 - spec.tolerance / 100.0),
        };
        let success = match spec.operator {
            Operator::NotGreater => threshold >= measured,
            _ => threshold < measured,
        };

        let message = format!(
            "Relative constraint on report '{}' ({}): {} must be {} {}{} (baseline {}{} over {} ({}), tolerance {}%); measured {}{}; escalation {}. Result: {}",
            self.report,
            self.endpoint,
            self.metric,
            spec.operator,
            fmt.format(threshold),
            self.metric.unit(),
            fmt.format(baseline),
            self.metric.unit(),
            spec.selection,
            build_list(&compared_builds),
            fmt.format(spec.tolerance),
            fmt.format(measured),
            self.metric.unit(),
            self.escalation,
            outcome(success),
        );

        Ok(ConstraintEvaluation {
            test_case: self.test_case(success, measured, threshold, baseline, "baseline", fmt),
            constraint: self.clone(),
            threshold,
            measured,
            baseline: Some(baseline),
            compared_builds,
            success,
            message,
        })
    }

    /// Outcome when the selection is empty
    ///
    /// Passes only while the evaluated build is the first one ever
    /// (history of length 1), so new jobs are not failed for lack of history.
    fn no_comparable_builds(&self, spec: &RelativeSpec, history_len: usize) -> ConstraintEvaluation {
        let success = history_len == 1;
        let message = format!(
            "Relative constraint on report '{}' ({}): no comparable builds found for {}; escalation {}. Result: {}",
            self.report,
            self.endpoint,
            spec.selection,
            self.escalation,
            outcome(success),
        );
        let failure = (!success).then(|| {
            format!(
                "No comparable builds found for {} of {} ({}).",
                self.metric, self.report, spec.selection
            )
        });

        ConstraintEvaluation {
            test_case: TestCase {
                classname: self.classname(),
                name: self.id(),
                failure,
            },
            constraint: self.clone(),
            threshold: 0.0,
            measured: 0.0,
            baseline: None,
            compared_builds: Vec::new(),
            success,
            message,
        }
    }

    fn classname(&self) -> String {
        format!("perfgate.{}.{}", self.kind.name(), self.report)
    }

    /// JUnit record with a standardized failure sentence
    fn test_case(
        &self,
        success: bool,
        measured: f64,
        threshold: f64,
        reference: f64,
        reference_name: &str,
        fmt: &NumberFormat,
    ) -> TestCase {
        let failure = (!success).then(|| {
            let deviation = safe_divide(measured - reference, reference) * 100.0;
            format!(
                "{} of {} ({}) measured {}{} against {} {}{} (threshold {}{}, {}): deviation {}%.",
                self.metric,
                self.report,
                self.endpoint,
                fmt.format(measured),
                self.metric.unit(),
                reference_name,
                fmt.format(reference),
                self.metric.unit(),
                self.kind.operator(),
                fmt.format(threshold),
                self.escalation,
                fmt.format(deviation),
            )
        });

        TestCase {
            classname: self.classname(),
            name: self.id(),
            failure,
        }
    }
}

fn outcome(success: bool) -> &'static str {
    if success {
        "fulfilled"
    } else {
        "violated"
    }
}

fn build_list(numbers: &[u32]) -> String {
    let parts: Vec<String> = numbers.iter().map(|n| format!("#{}", n)).collect();
    parts.join(", ")
}
