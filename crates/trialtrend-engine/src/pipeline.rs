//! The two dashboard views: studies active per year and studies started per year.
//!
//! Both views share one [`Selection`] of statuses, phases, and result mode,
//! but each has its own year range. The active view runs over the expanded
//! table, the started view over the raw study table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;
use trialtrend_core::{IntegrityError, Phase, StudyRecord, StudyStatus};

use crate::filter::{self, FilterSpec, ResultFilter, StudyRow, YearRange};
use crate::trend::{TrendResult, fit_trend};
use crate::{CountMatrix, ExpandedRow, GroupBy, aggregate, expand};

/// Shared dashboard controls plus the per-view year ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub statuses: BTreeSet<StudyStatus>,
    pub phases: BTreeSet<Phase>,
    #[serde(default)]
    pub results: ResultFilter,
    /// Range for the active-studies view.
    pub active_years: YearRange,
    /// Range for the started-studies view.
    pub start_years: YearRange,
}

impl Selection {
    /// Active-year window preselected when the data covers it.
    pub const DEFAULT_ACTIVE_YEARS: YearRange = YearRange::new(2014, 2024);

    /// The preselected controls for a dataset.
    ///
    /// Every observed status except those in
    /// [`StudyStatus::DESELECTED_BY_DEFAULT`], every observed phase, the
    /// default active window clipped to the observed active years, and the
    /// full observed range of start years.
    pub fn defaults_for(options: &Options) -> Self {
        let statuses = options
            .statuses
            .iter()
            .copied()
            .filter(|s| !StudyStatus::DESELECTED_BY_DEFAULT.contains(s))
            .collect();
        let active_years = match options.active_years {
            Some(observed) => Self::DEFAULT_ACTIVE_YEARS
                .intersect(&observed)
                .unwrap_or(observed),
            None => Self::DEFAULT_ACTIVE_YEARS,
        };
        Self {
            statuses,
            phases: options.phases.iter().cloned().collect(),
            results: ResultFilter::Any,
            active_years,
            start_years: options.start_years.unwrap_or(Self::DEFAULT_ACTIVE_YEARS),
        }
    }

    pub fn active_spec(&self) -> FilterSpec {
        self.spec_with(self.active_years)
    }

    pub fn start_spec(&self) -> FilterSpec {
        self.spec_with(self.start_years)
    }

    fn spec_with(&self, years: YearRange) -> FilterSpec {
        FilterSpec {
            statuses: self.statuses.clone(),
            phases: self.phases.clone(),
            results: self.results,
            years,
        }
    }
}

/// What the controls can choose from, derived from the data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    /// Distinct statuses, sorted.
    pub statuses: Vec<StudyStatus>,
    /// Distinct phase labels, sorted.
    pub phases: Vec<Phase>,
    /// Bounds of the expanded table's years; `None` without studies.
    pub active_years: Option<YearRange>,
    /// Bounds of the start years; `None` without studies.
    pub start_years: Option<YearRange>,
}

/// A rendered slice: the count matrix and the trend of its yearly totals.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub matrix: CountMatrix,
    pub trend: TrendResult,
}

/// A study table together with its active-year expansion.
///
/// Expansion runs once; every view call afterwards only filters, aggregates,
/// and fits, so repeated calls with the same selection return identical views.
pub struct Dashboard<'a> {
    studies: &'a [StudyRecord],
    expanded: Vec<ExpandedRow<'a>>,
}

impl<'a> Dashboard<'a> {
    pub fn new(studies: &'a [StudyRecord]) -> Result<Self, IntegrityError> {
        let expanded = expand(studies)?;
        Ok(Self { studies, expanded })
    }

    pub fn studies(&self) -> &'a [StudyRecord] {
        self.studies
    }

    pub fn expanded(&self) -> &[ExpandedRow<'a>] {
        &self.expanded
    }

    pub fn options(&self) -> Options {
        let statuses: BTreeSet<StudyStatus> = self.studies.iter().map(|s| s.status).collect();
        let phases: BTreeSet<&Phase> = self.studies.iter().map(|s| &s.phase).collect();
        Options {
            statuses: statuses.into_iter().collect(),
            phases: phases.into_iter().cloned().collect(),
            active_years: year_bounds(&self.expanded),
            start_years: year_bounds(self.studies),
        }
    }

    /// Studies active per year, over `selection.active_years`.
    pub fn active_view(
        &self,
        selection: &Selection,
        by: GroupBy,
    ) -> Result<View, IntegrityError> {
        let view = build_view(&self.expanded, &selection.active_spec(), by)?;
        info!(
            rows = view.matrix.total(),
            years = view.matrix.years().len(),
            "built active-studies view"
        );
        Ok(view)
    }

    /// Studies started per year, over `selection.start_years`.
    pub fn start_view(
        &self,
        selection: &Selection,
        by: GroupBy,
    ) -> Result<View, IntegrityError> {
        let view = build_view(self.studies, &selection.start_spec(), by)?;
        info!(
            rows = view.matrix.total(),
            years = view.matrix.years().len(),
            "built started-studies view"
        );
        Ok(view)
    }
}

fn build_view<R: StudyRow>(
    rows: &[R],
    spec: &FilterSpec,
    by: GroupBy,
) -> Result<View, IntegrityError> {
    let kept = filter::apply(rows, spec);
    let matrix = aggregate(&kept, by);
    let trend = fit_trend(&matrix.totals_by_year())?;
    Ok(View { matrix, trend })
}

fn year_bounds<R: StudyRow>(rows: &[R]) -> Option<YearRange> {
    let min = rows.iter().map(|r| r.year()).min()?;
    let max = rows.iter().map(|r| r.year()).max()?;
    Some(YearRange::new(min, max))
}
