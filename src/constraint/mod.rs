//! Quality gates on report statistics
//!
//! Declared [`Constraint`]s are expanded per endpoint by the
//! [`ConstraintFactory`], evaluated against a newest-first build history by
//! the [`ConstraintOrchestrator`], and turned into a verdict by
//! [`crate::escalation::ConstraintReport`].
//!
//! # Example
//! ```
//! use chrono::Utc;
//! use perfgate::build::{BuildRecord, BuildResult};
//! use perfgate::constraint::{
//!     Constraint, ConstraintOrchestrator, Escalation, GlobalSettings, Metric, Operator,
//! };
//! use perfgate::report::RunReport;
//! use perfgate::sample::Sample;
//!
//! let report = RunReport::with_defaults("results.jtl");
//! report.add_sample("login", Sample::new(Utc::now(), 100, true, "200", 1.0));
//! let history = vec![BuildRecord::new(1, Utc::now(), BuildResult::Success).with_report(report)];
//!
//! let gate = Constraint::absolute(
//!     "results.jtl",
//!     Metric::Average,
//!     Operator::NotGreater,
//!     100.0,
//!     Escalation::Error,
//! );
//! let results = ConstraintOrchestrator::new(GlobalSettings::default()).run(&[gate], &history);
//! assert!(results[0].success);
//! ```

mod evaluate;
pub mod factory;
pub mod orchestrator;
pub mod selector;
pub mod settings;
pub mod types;

pub use factory::ConstraintFactory;
pub use orchestrator::ConstraintOrchestrator;
pub use selector::BuildSelector;
pub use settings::{EvaluationContext, GlobalSettings};
pub use types::{
    parse_timestamp, AbsoluteSpec, BuildSelection, Constraint, ConstraintEvaluation,
    ConstraintKind, Escalation, Metric, Operator, PreviousResults, RelativeSpec, TestCase,
    Timeframe, TimeframeEnd,
};
