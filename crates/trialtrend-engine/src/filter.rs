//! Declarative filter slices over per-study or per-year rows.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use trialtrend_core::{Phase, StudyRecord, StudyStatus};

use crate::ExpandedRow;

/// A row the filter engine and aggregator can work on.
pub trait StudyRow {
    fn study(&self) -> &StudyRecord;

    /// The year used for range filtering and grouping.
    fn year(&self) -> i32;
}

/// Raw studies are keyed by their start year.
impl StudyRow for StudyRecord {
    fn study(&self) -> &StudyRecord {
        self
    }

    fn year(&self) -> i32 {
        self.start_year()
    }
}

/// Expanded rows are keyed by their own active year.
impl StudyRow for ExpandedRow<'_> {
    fn study(&self) -> &StudyRecord {
        self.study
    }

    fn year(&self) -> i32 {
        self.year
    }
}

impl<R: StudyRow + ?Sized> StudyRow for &R {
    fn study(&self) -> &StudyRecord {
        (**self).study()
    }

    fn year(&self) -> i32 {
        (**self).year()
    }
}

/// Which studies to keep based on results submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFilter {
    #[default]
    Any,
    WithResults,
    WithoutResults,
}

impl ResultFilter {
    pub fn matches(self, has_results: bool) -> bool {
        match self {
            Self::Any => true,
            Self::WithResults => has_results,
            Self::WithoutResults => !has_results,
        }
    }
}

/// Inclusive year range. A range with `min > max` contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.min <= year && year <= self.max
    }

    /// Overlap with another range, or `None` when they are disjoint.
    pub fn intersect(&self, other: &YearRange) -> Option<YearRange> {
        let range = YearRange::new(self.min.max(other.min), self.max.min(other.max));
        (range.min <= range.max).then_some(range)
    }
}

/// One filter slice.
///
/// Empty `statuses` or `phases` match nothing; there is no implicit
/// "match all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub statuses: BTreeSet<StudyStatus>,
    pub phases: BTreeSet<Phase>,
    #[serde(default)]
    pub results: ResultFilter,
    pub years: YearRange,
}

impl FilterSpec {
    /// Whether a single row passes every condition.
    pub fn matches<R: StudyRow + ?Sized>(&self, row: &R) -> bool {
        let study = row.study();
        self.statuses.contains(&study.status)
            && self.phases.contains(&study.phase)
            && self.years.contains(row.year())
            && self.results.matches(study.has_results)
    }
}

/// Rows passing `spec`, in input order. The input is left untouched.
pub fn apply<'r, R: StudyRow>(rows: &'r [R], spec: &FilterSpec) -> Vec<&'r R> {
    let kept: Vec<&R> = rows.iter().filter(|row| spec.matches(*row)).collect();
    debug!(input = rows.len(), kept = kept.len(), "applied filter");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand;
    use crate::fixtures::study;
    use trialtrend_core::StudyStatus::*;

    fn spec(statuses: &[StudyStatus], phases: &[&str], years: (i32, i32)) -> FilterSpec {
        FilterSpec {
            statuses: statuses.iter().copied().collect(),
            phases: phases.iter().map(|p| Phase::from(*p)).collect(),
            results: ResultFilter::Any,
            years: YearRange::new(years.0, years.1),
        }
    }

    fn sample() -> Vec<StudyRecord> {
        vec![
            study("a", 2010, 2012, Recruiting, "PHASE1", false),
            study("b", 2011, 2011, Completed, "PHASE2", true),
            study("c", 2013, 2015, Withdrawn, "PHASE1, PHASE2", false),
            study("d", 2009, 2014, Completed, "PHASE1", true),
        ]
    }

    fn ids<R: StudyRow>(rows: &[&R]) -> Vec<String> {
        rows.iter().map(|r| r.study().id.clone()).collect()
    }

    #[test]
    fn status_and_phase_membership() {
        let studies = sample();
        let s = spec(&[Completed], &["PHASE1", "PHASE2"], (2000, 2030));
        assert_eq!(ids(&apply(&studies, &s)), vec!["b", "d"]);
    }

    #[test]
    fn compound_phase_matches_only_itself() {
        let studies = sample();
        let s = spec(&[Withdrawn, Recruiting], &["PHASE1"], (2000, 2030));
        assert_eq!(ids(&apply(&studies, &s)), vec!["a"]);

        let s = spec(&[Withdrawn, Recruiting], &["PHASE1, PHASE2"], (2000, 2030));
        assert_eq!(ids(&apply(&studies, &s)), vec!["c"]);
    }

    #[test]
    fn raw_rows_filter_on_start_year() {
        let studies = sample();
        let s = spec(
            &[Recruiting, Completed, Withdrawn],
            &["PHASE1", "PHASE2", "PHASE1, PHASE2"],
            (2010, 2011),
        );
        assert_eq!(ids(&apply(&studies, &s)), vec!["a", "b"]);
    }

    #[test]
    fn expanded_rows_filter_on_active_year() {
        let studies = sample();
        let rows = expand(&studies).unwrap();
        let s = spec(&[Completed], &["PHASE1"], (2013, 2013));
        let kept = apply(&rows, &s);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].study.id, "d");
        assert_eq!(kept[0].year, 2013);
    }

    #[test]
    fn year_bounds_are_inclusive() {
        let studies = sample();
        let rows = expand(&studies).unwrap();
        let s = spec(&[Recruiting], &["PHASE1"], (2010, 2012));
        let years: Vec<i32> = apply(&rows, &s).iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2010, 2011, 2012]);
    }

    #[test]
    fn result_filter_modes() {
        let studies = sample();
        let mut s = spec(&[Recruiting, Completed], &["PHASE1", "PHASE2"], (2000, 2030));

        s.results = ResultFilter::WithResults;
        assert_eq!(ids(&apply(&studies, &s)), vec!["b", "d"]);

        s.results = ResultFilter::WithoutResults;
        assert_eq!(ids(&apply(&studies, &s)), vec!["a"]);

        s.results = ResultFilter::Any;
        assert_eq!(ids(&apply(&studies, &s)), vec!["a", "b", "d"]);
    }

    #[test]
    fn empty_status_set_matches_nothing() {
        let studies = sample();
        let s = spec(&[], &["PHASE1", "PHASE2"], (2000, 2030));
        assert!(apply(&studies, &s).is_empty());
    }

    #[test]
    fn empty_phase_set_matches_nothing() {
        let studies = sample();
        let s = spec(&[Recruiting, Completed], &[], (2000, 2030));
        assert!(apply(&studies, &s).is_empty());
    }

    #[test]
    fn inverted_year_range_matches_nothing() {
        let studies = sample();
        let s = spec(&[Recruiting, Completed], &["PHASE1"], (2015, 2010));
        assert!(apply(&studies, &s).is_empty());
    }

    #[test]
    fn input_is_not_mutated() {
        let studies = sample();
        let before = studies.clone();
        let _ = apply(&studies, &spec(&[Completed], &["PHASE2"], (2011, 2011)));
        assert_eq!(studies, before);
    }

    #[test]
    fn year_range_intersection() {
        let a = YearRange::new(2014, 2024);
        assert_eq!(
            a.intersect(&YearRange::new(2003, 2020)),
            Some(YearRange::new(2014, 2020))
        );
        assert_eq!(a.intersect(&YearRange::new(2025, 2030)), None);
    }

    #[test]
    fn filter_deserializes_from_json() {
        let json = r#"{
            "statuses": ["RECRUITING", "COMPLETED"],
            "phases": ["PHASE1", "PHASE1, PHASE2"],
            "results": "with_results",
            "years": {"min": 2014, "max": 2024}
        }"#;
        let parsed: FilterSpec = serde_json::from_str(json).unwrap();
        assert!(parsed.statuses.contains(&Recruiting));
        assert!(parsed.phases.contains(&Phase::from("PHASE1, PHASE2")));
        assert_eq!(parsed.results, ResultFilter::WithResults);
        assert_eq!(parsed.years, YearRange::new(2014, 2024));
    }

    #[test]
    fn filter_results_default_to_any() {
        let json = r#"{"statuses": [], "phases": [], "years": {"min": 0, "max": 1}}"#;
        let parsed: FilterSpec = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results, ResultFilter::Any);
    }
}
