//! Dense year × category count matrices.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, UInt64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use tracing::debug;
use trialtrend_core::{StudyRecord, ctg};

use crate::StudyRow;

/// Which study attribute becomes the matrix columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupBy {
    #[default]
    Phase,
    Status,
}

impl GroupBy {
    pub fn category<'s>(&self, study: &'s StudyRecord) -> &'s str {
        match self {
            Self::Phase => study.phase.as_str(),
            Self::Status => study.status.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Phase => "phase",
            Self::Status => "status",
        }
    }
}

/// Row counts per (year, category).
///
/// Rows are every year from the smallest to the largest observed, with no
/// gaps. Columns are every observed category, sorted. Absent combinations
/// count zero. An empty matrix has no years and no categories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountMatrix {
    years: Vec<i32>,
    categories: Vec<String>,
    /// Row-major, `years.len() * categories.len()` cells.
    counts: Vec<u64>,
}

impl CountMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Counts for one year, one cell per category.
    pub fn row(&self, year: i32) -> Option<&[u64]> {
        let idx = self.year_index(year)?;
        let width = self.categories.len();
        Some(&self.counts[idx * width..(idx + 1) * width])
    }

    /// Counts for one category, one cell per year.
    pub fn column(&self, category: &str) -> Option<Vec<u64>> {
        let col = self.categories.iter().position(|c| c == category)?;
        let width = self.categories.len();
        Some(
            (0..self.years.len())
                .map(|row| self.counts[row * width + col])
                .collect(),
        )
    }

    /// Count for a cell; zero for any year or category outside the matrix.
    pub fn get(&self, year: i32, category: &str) -> u64 {
        let Some(row) = self.row(year) else {
            return 0;
        };
        self.categories
            .iter()
            .position(|c| c == category)
            .map_or(0, |col| row[col])
    }

    /// Per-year sum across all categories. Covers every matrix year, zeros included.
    pub fn totals_by_year(&self) -> BTreeMap<i32, u64> {
        self.years
            .iter()
            .map(|&year| (year, self.row(year).map_or(0, |r| r.iter().sum())))
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Render as an Arrow batch: `year` then one count column per category.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let schema = Arc::new(ctg::count_matrix_schema(&self.categories));
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.categories.len() + 1);
        columns.push(Arc::new(Int32Array::from(self.years.clone())));
        for category in &self.categories {
            let values = self.column(category).unwrap_or_default();
            columns.push(Arc::new(UInt64Array::from(values)));
        }
        RecordBatch::try_new(schema, columns)
    }

    fn year_index(&self, year: i32) -> Option<usize> {
        let first = *self.years.first()?;
        let idx = usize::try_from(year.checked_sub(first)?).ok()?;
        (idx < self.years.len()).then_some(idx)
    }
}

/// Count rows per (row year, category) into a dense matrix.
///
/// The row year is whatever [`StudyRow::year`] reports: the active year for
/// expanded rows, the start year for raw studies.
pub fn aggregate<R: StudyRow>(rows: &[R], by: GroupBy) -> CountMatrix {
    let mut groups: BTreeMap<(i32, &str), u64> = BTreeMap::new();
    let mut categories: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        let category = by.category(row.study());
        categories.insert(category);
        *groups.entry((row.year(), category)).or_default() += 1;
    }

    // Keys are ordered by year first.
    let (Some(&(first, _)), Some(&(last, _))) = (groups.keys().next(), groups.keys().next_back())
    else {
        return CountMatrix::empty();
    };

    let years: Vec<i32> = (first..=last).collect();
    let categories: Vec<&str> = categories.into_iter().collect();
    let mut counts = Vec::with_capacity(years.len() * categories.len());
    for &year in &years {
        for &category in &categories {
            counts.push(groups.get(&(year, category)).copied().unwrap_or(0));
        }
    }

    debug!(
        group_by = by.label(),
        rows = rows.len(),
        years = years.len(),
        categories = categories.len(),
        "aggregated count matrix"
    );

    CountMatrix {
        years,
        categories: categories.into_iter().map(str::to_string).collect(),
        counts,
    }
}
