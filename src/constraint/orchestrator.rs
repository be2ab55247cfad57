//! Batch evaluation of constraints against one build history
//!
//! A constraint that fails with an error is logged and left out of the
//! results; the remaining constraints are still evaluated. Output order is
//! input order.

use crate::build::BuildRecord;
use crate::constraint::factory::ConstraintFactory;
use crate::constraint::settings::{EvaluationContext, GlobalSettings};
use crate::constraint::types::{Constraint, ConstraintEvaluation};
use crate::numeric::NumberFormat;
use chrono::{DateTime, Utc};

/// Runs expanded constraints and isolates per-constraint failures
#[derive(Debug, Clone)]
pub struct ConstraintOrchestrator {
    settings: GlobalSettings,
    format: NumberFormat,
    now: DateTime<Utc>,
}

impl ConstraintOrchestrator {
    /// Orchestrator evaluating at the current time with default formatting
    pub fn new(settings: GlobalSettings) -> Self {
        Self {
            settings,
            format: NumberFormat::default(),
            now: Utc::now(),
        }
    }

    /// Pin evaluation time (resolves `now` timeframe ends)
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Number format of result messages
    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    fn context(&self) -> EvaluationContext<'_> {
        EvaluationContext::new(&self.settings)
            .at(self.now)
            .with_format(self.format.clone())
    }

    /// Evaluate already expanded constraints
    pub fn evaluate_all(
        &self,
        constraints: &[Constraint],
        history: &[BuildRecord],
    ) -> Vec<ConstraintEvaluation> {
        let ctx = self.context();
        let mut evaluations = Vec::with_capacity(constraints.len());

        for constraint in constraints {
            match constraint.evaluate(history, &ctx) {
                Ok(evaluation) => evaluations.push(evaluation),
                Err(e) => {
                    tracing::warn!(
                        constraint = %constraint.id(),
                        error = %e,
                        "constraint skipped"
                    );
                }
            }
        }

        tracing::info!(
            evaluated = evaluations.len(),
            skipped = constraints.len() - evaluations.len(),
            "constraints evaluated"
        );
        evaluations
    }

    /// Expand declarations against the evaluated build, then evaluate
    pub fn run(
        &self,
        constraints: &[Constraint],
        history: &[BuildRecord],
    ) -> Vec<ConstraintEvaluation> {
        let expanded = ConstraintFactory::new(history).expand_all(constraints);
        tracing::debug!(
            declared = constraints.len(),
            expanded = expanded.len(),
            "constraints expanded"
        );
        self.evaluate_all(&expanded, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildResult;
    use crate::constraint::types::{Escalation, Metric, Operator};
    use crate::filter::EndpointScope;
    use crate::report::RunReport;
    use crate::sample::Sample;

    fn history() -> Vec<BuildRecord> {
        let report = RunReport::with_defaults("results.jtl");
        report.add_sample("login", Sample::new(Utc::now(), 80, true, "200", 1.0));
        report.add_sample("search", Sample::new(Utc::now(), 120, true, "200", 1.0));
        vec![BuildRecord::new(1, Utc::now(), BuildResult::Success).with_report(report)]
    }

    fn absolute(report: &str, value: f64) -> Constraint {
        Constraint::absolute(report, Metric::Max, Operator::NotGreater, value, Escalation::Error)
    }

    #[test]
    fn test_errors_are_isolated_and_order_kept() {
        let h = history();
        let constraints = vec![
            absolute("results.jtl", 200.0),
            absolute("missing.jtl", 200.0),
            absolute("results.jtl", -1.0),
            absolute("results.jtl", 100.0),
        ];
        let results = ConstraintOrchestrator::new(GlobalSettings::default())
            .evaluate_all(&constraints, &h);

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].threshold, 200.0);
        assert!(!results[1].success);
        assert_eq!(results[1].threshold, 100.0);
    }

    #[test]
    fn test_run_expands_first() {
        let h = history();
        let c = absolute("results.jtl", 100.0).with_endpoint(EndpointScope::Every);
        let results = ConstraintOrchestrator::new(GlobalSettings::default()).run(&[c], &h);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].constraint.endpoint.single(), Some("login"));
        assert!(results[0].success);
        assert_eq!(results[1].constraint.endpoint.single(), Some("search"));
        assert!(!results[1].success);
    }

    #[test]
    fn test_unexpanded_scope_is_skipped_by_evaluate_all() {
        let h = history();
        let c = absolute("results.jtl", 100.0).with_endpoint(EndpointScope::Every);
        let results = ConstraintOrchestrator::new(GlobalSettings::default()).evaluate_all(&[c], &h);
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_history() {
        let results = ConstraintOrchestrator::new(GlobalSettings::default())
            .run(&[absolute("results.jtl", 1.0)], &[]);
        assert!(results.is_empty());
    }
}
