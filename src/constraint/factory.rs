//! Endpoint expansion of user-declared constraints
//!
//! `*` expands against the endpoints present in the evaluated build's report
//! at evaluation time; a comma list expands into one constraint per entry.

use crate::build::BuildRecord;
use crate::constraint::types::Constraint;
use crate::filter::EndpointScope;

/// Expands multi-endpoint constraints into single-endpoint clones
#[derive(Debug, Clone, Copy)]
pub struct ConstraintFactory<'a> {
    history: &'a [BuildRecord],
}

impl<'a> ConstraintFactory<'a> {
    pub fn new(history: &'a [BuildRecord]) -> Self {
        Self { history }
    }

    /// Concrete constraints for one declaration
    ///
    /// A constraint whose report is missing from the evaluated build is
    /// returned unexpanded; evaluation then reports the configuration error.
    pub fn expand(&self, constraint: &Constraint) -> Vec<Constraint> {
        match &constraint.endpoint {
            EndpointScope::WholeReport | EndpointScope::Single(_) => vec![constraint.clone()],
            EndpointScope::List(names) => names
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(|name| constraint.for_endpoint(name))
                .collect(),
            EndpointScope::Every => {
                let report = self
                    .history
                    .first()
                    .and_then(|build| build.report(&constraint.report));
                match report {
                    Some(report) => {
                        let labels = report.endpoint_labels();
                        tracing::debug!(
                            report = %constraint.report,
                            endpoints = labels.len(),
                            "expanding constraint over every endpoint"
                        );
                        labels
                            .iter()
                            .map(|label| constraint.for_endpoint(label.as_str()))
                            .collect()
                    }
                    None => vec![constraint.clone()],
                }
            }
        }
    }

    /// Expand every declaration, preserving declaration order
    pub fn expand_all(&self, constraints: &[Constraint]) -> Vec<Constraint> {
        constraints.iter().flat_map(|c| self.expand(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildResult;
    use crate::constraint::types::{Escalation, Metric, Operator};
    use crate::report::RunReport;
    use crate::sample::Sample;
    use chrono::Utc;

    fn history() -> Vec<BuildRecord> {
        let report = RunReport::with_defaults("results.jtl");
        for endpoint in ["A", "B", "C"] {
            report.add_sample(endpoint, Sample::new(Utc::now(), 10, true, "200", 0.5));
        }
        vec![BuildRecord::new(1, Utc::now(), BuildResult::Success).with_report(report)]
    }

    fn constraint(scope: Option<&str>) -> Constraint {
        Constraint::absolute(
            "results.jtl",
            Metric::Average,
            Operator::NotGreater,
            100.0,
            Escalation::Warn,
        )
        .with_endpoint(EndpointScope::parse(scope))
    }

    fn endpoints(constraints: &[Constraint]) -> Vec<String> {
        constraints
            .iter()
            .map(|c| c.endpoint.single().unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_expand_every_endpoint() {
        let h = history();
        let expanded = ConstraintFactory::new(&h).expand(&constraint(Some("*")));
        assert_eq!(expanded.len(), 3);
        assert_eq!(endpoints(&expanded), vec!["A", "B", "C"]);
        assert!(expanded.iter().all(|c| c.escalation == Escalation::Warn));
    }

    #[test]
    fn test_expand_list_trims_names() {
        let h = history();
        let expanded = ConstraintFactory::new(&h).expand(&constraint(Some("a, b,c")));
        assert_eq!(endpoints(&expanded), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_whole_report_not_expanded() {
        let h = history();
        let c = constraint(None);
        assert_eq!(ConstraintFactory::new(&h).expand(&c), vec![c]);
    }

    #[test]
    fn test_every_without_report_is_kept() {
        let c = constraint(Some("*"));
        assert_eq!(ConstraintFactory::new(&[]).expand(&c), vec![c.clone()]);

        let mut other = c;
        other.report = "missing.jtl".to_string();
        let h = history();
        let expanded = ConstraintFactory::new(&h).expand(&other);
        assert_eq!(expanded.len(), 1);
        assert!(expanded[0].endpoint.needs_expansion());
    }

    #[test]
    fn test_expand_all_preserves_order() {
        let h = history();
        let all = ConstraintFactory::new(&h)
            .expand_all(&[constraint(Some("x,y")), constraint(None), constraint(Some("*"))]);
        assert_eq!(endpoints(&all), vec!["x", "y", "-", "A", "B", "C"]);
    }
}
