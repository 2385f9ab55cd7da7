//! Date parsing for registry date strings.
//!
//! ClinicalTrials.gov records carry dates at three precisions:
//!
//! - Full date: `2015-06-30`
//! - Month precision: `2015-06` (common for completion dates)
//! - Year only: `2015`
//!
//! Partial dates resolve to the first day of the missing unit, so a
//! month-precision date lands on the 1st and a bare year on 1 January.
//! Only the year feeds the activity windows, which makes the choice of day
//! irrelevant downstream.

use chrono::NaiveDate;

use crate::IntegrityError;

/// Parse a registry date string into a calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM`, and `YYYY`. Anything after a `T`
/// (a timestamp suffix) is ignored. Returns `None` for empty or malformed input.
pub fn parse_study_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let s = s.split_once('T').map_or(s, |(date, _)| date);
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }

    let mut parts = s.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    match (parts.next(), parts.next()) {
        (None, None) if s.len() == 4 => NaiveDate::from_ymd_opt(year, 1, 1),
        (Some(month), None) => NaiveDate::from_ymd_opt(year, month.parse().ok()?, 1),
        _ => None,
    }
}

/// Parse a named date field of one study, naming both on failure.
pub fn parse_field_date(
    study_id: &str,
    field: &'static str,
    value: &str,
) -> Result<NaiveDate, IntegrityError> {
    parse_study_date(value).ok_or_else(|| IntegrityError::InvalidDate {
        study_id: study_id.to_string(),
        field,
        value: value.to_string(),
    })
}

/// Render a date the way the flat tables store it (`YYYY-MM-DD`).
pub fn format_study_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
