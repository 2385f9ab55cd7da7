//! Active-year expansion: one row per (study, active year).

use tracing::info;
use trialtrend_core::{IntegrityError, StudyRecord};

/// A study paired with one of its active years.
///
/// Borrows the study, so an expanded table cannot outlive the study table it
/// was generated from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpandedRow<'a> {
    pub study: &'a StudyRecord,
    pub year: i32,
}

/// Expand each study into one row per year in `[start_year, end_year]`.
///
/// Rows come out in input order, years ascending within a study. The
/// extractor is expected to have rejected inverted windows already; one that
/// slips through fails the whole expansion with
/// [`IntegrityError::InvertedActiveWindow`] rather than yielding an empty range.
pub fn expand(studies: &[StudyRecord]) -> Result<Vec<ExpandedRow<'_>>, IntegrityError> {
    let mut rows = Vec::with_capacity(studies.len());
    for study in studies {
        let years = study.active_years()?;
        rows.extend(years.map(|year| ExpandedRow { study, year }));
    }
    info!(
        studies = studies.len(),
        rows = rows.len(),
        "expanded active years"
    );
    Ok(rows)
}
