//! Historical build selection for relative constraints
//!
//! History is newest first; index 0 is the build under evaluation and is
//! never part of its own baseline.

use crate::build::{find_build, BuildRecord, BuildResult};
use crate::constraint::types::{BuildSelection, PreviousResults, Timeframe};
use crate::error::{GateError, Result};
use chrono::{DateTime, Utc};

/// Filters a build history into a comparison set
#[derive(Debug, Clone, Copy)]
pub struct BuildSelector<'a> {
    history: &'a [BuildRecord],
    ignore_failed: bool,
    ignore_unstable: bool,
}

impl<'a> BuildSelector<'a> {
    /// Create a selector over `history`
    pub fn new(history: &'a [BuildRecord], ignore_failed: bool, ignore_unstable: bool) -> Self {
        Self {
            history,
            ignore_failed,
            ignore_unstable,
        }
    }

    /// Whether a build's result qualifies it for a baseline
    pub fn is_included(&self, build: &BuildRecord) -> bool {
        match build.result {
            BuildResult::Success => true,
            BuildResult::Unstable => !self.ignore_unstable,
            BuildResult::Failure => !self.ignore_failed,
        }
    }

    fn earlier_builds(&self) -> impl Iterator<Item = &'a BuildRecord> + '_ {
        self.history.iter().skip(1).filter(|b| self.is_included(b))
    }

    /// The last N qualifying builds before the evaluated one
    pub fn previous(&self, previous: PreviousResults) -> Vec<&'a BuildRecord> {
        match previous {
            PreviousResults::Any => self.earlier_builds().collect(),
            PreviousResults::Count(n) => self.earlier_builds().take(n).collect(),
        }
    }

    /// Qualifying builds with `start <= timestamp <= end`
    ///
    /// # Errors
    /// Configuration error when the window is inverted.
    pub fn timeframe(
        &self,
        timeframe: &Timeframe,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'a BuildRecord>> {
        timeframe.validate(now)?;
        let end = timeframe.resolved_end(now);
        Ok(self
            .earlier_builds()
            .filter(|b| b.timestamp >= timeframe.start && b.timestamp <= end)
            .collect())
    }

    /// The configured baseline build, if it is in the history
    ///
    /// The evaluated build itself never serves as its own baseline. No
    /// result filtering applies: the baseline is chosen explicitly.
    ///
    /// # Errors
    /// Configuration error when no baseline build is configured.
    pub fn baseline(&self, baseline_build: Option<u32>) -> Result<Vec<&'a BuildRecord>> {
        let number = baseline_build.ok_or_else(|| {
            GateError::config("baseline build selection requires settings.baseline_build")
        })?;
        let earlier = self.history.get(1..).unwrap_or_default();
        Ok(find_build(earlier, number).into_iter().collect())
    }

    /// Apply a selection policy
    pub fn select(
        &self,
        selection: &BuildSelection,
        baseline_build: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'a BuildRecord>> {
        let selected = match selection {
            BuildSelection::PreviousResults(previous) => self.previous(*previous),
            BuildSelection::Timeframe(timeframe) => self.timeframe(timeframe, now)?,
            BuildSelection::Baseline => self.baseline(baseline_build)?,
        };
        tracing::debug!(
            policy = %selection,
            selected = selected.len(),
            history = self.history.len(),
            "selected comparison builds"
        );
        Ok(selected)
    }
}
