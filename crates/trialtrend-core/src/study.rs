//! Flat study records as produced by the extractor.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::IntegrityError;

/// Overall recruitment status of a study.
///
/// Variants are declared in the lexical order of their registry labels, so the
/// derived `Ord` agrees with sorting by [`as_str`](Self::as_str).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudyStatus {
    ActiveNotRecruiting,
    ApprovedForMarketing,
    Available,
    Completed,
    EnrollingByInvitation,
    NotYetRecruiting,
    NoLongerAvailable,
    Recruiting,
    Suspended,
    TemporarilyNotAvailable,
    Terminated,
    Unknown,
    Withdrawn,
    Withheld,
}

impl StudyStatus {
    pub const ALL: [StudyStatus; 14] = [
        Self::ActiveNotRecruiting,
        Self::ApprovedForMarketing,
        Self::Available,
        Self::Completed,
        Self::EnrollingByInvitation,
        Self::NotYetRecruiting,
        Self::NoLongerAvailable,
        Self::Recruiting,
        Self::Suspended,
        Self::TemporarilyNotAvailable,
        Self::Terminated,
        Self::Unknown,
        Self::Withdrawn,
        Self::Withheld,
    ];

    /// Statuses left out of the default dashboard selection.
    pub const DESELECTED_BY_DEFAULT: [StudyStatus; 3] =
        [Self::Withdrawn, Self::Suspended, Self::Unknown];

    /// Registry label, e.g. `ACTIVE_NOT_RECRUITING`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActiveNotRecruiting => "ACTIVE_NOT_RECRUITING",
            Self::ApprovedForMarketing => "APPROVED_FOR_MARKETING",
            Self::Available => "AVAILABLE",
            Self::Completed => "COMPLETED",
            Self::EnrollingByInvitation => "ENROLLING_BY_INVITATION",
            Self::NotYetRecruiting => "NOT_YET_RECRUITING",
            Self::NoLongerAvailable => "NO_LONGER_AVAILABLE",
            Self::Recruiting => "RECRUITING",
            Self::Suspended => "SUSPENDED",
            Self::TemporarilyNotAvailable => "TEMPORARILY_NOT_AVAILABLE",
            Self::Terminated => "TERMINATED",
            Self::Unknown => "UNKNOWN",
            Self::Withdrawn => "WITHDRAWN",
            Self::Withheld => "WITHHELD",
        }
    }
}

impl fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown study status {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for StudyStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A phase label, possibly compound (`"PHASE1, PHASE2"`).
///
/// Compound labels are atomic categories: `"PHASE1, PHASE2"` is its own
/// value, distinct from both `"PHASE1"` and `"PHASE2"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phase(String);

impl Phase {
    /// Separator used when joining phase tags into one label.
    pub const DELIMITER: &'static str = ", ";

    /// Label for studies that declare no phase (e.g. observational studies).
    pub const NONE_LABEL: &'static str = "NA";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Join phase tags into a single compound label.
    ///
    /// An empty tag list yields [`NONE_LABEL`](Self::NONE_LABEL).
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        if tags.is_empty() {
            return Self(Self::NONE_LABEL.to_string());
        }
        let joined: Vec<&str> = tags.iter().map(|t| t.as_ref()).collect();
        Self(joined.join(Self::DELIMITER))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Phase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One clinical study, flattened from its registry document.
///
/// Immutable once built. [`StudyRecord::new`] establishes
/// `start_year() <= end_year()`; records assembled field by field are checked
/// again when their active years are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRecord {
    pub id: String,
    pub start_date: NaiveDate,
    /// Completion date, when the registry reports one.
    pub end_date: Option<NaiveDate>,
    pub last_update_date: NaiveDate,
    pub status: StudyStatus,
    pub phase: Phase,
    pub has_results: bool,
}

impl StudyRecord {
    /// Build a record, rejecting an end year before the start year.
    pub fn new(
        id: impl Into<String>,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        last_update_date: NaiveDate,
        status: StudyStatus,
        phase: Phase,
        has_results: bool,
    ) -> Result<Self, IntegrityError> {
        let record = Self {
            id: id.into(),
            start_date,
            end_date,
            last_update_date,
            status,
            phase,
            has_results,
        };
        record.active_years()?;
        Ok(record)
    }

    pub fn start_year(&self) -> i32 {
        self.start_date.year()
    }

    /// Year the study stopped being active.
    ///
    /// Falls back to the last update year when no completion date exists.
    /// That conflates "last known activity" with completion and is kept as a
    /// known approximation.
    pub fn end_year(&self) -> i32 {
        self.end_date.unwrap_or(self.last_update_date).year()
    }

    /// Whether the end year came from the last-update fallback.
    pub fn uses_update_fallback(&self) -> bool {
        self.end_date.is_none()
    }

    /// Inclusive range of years the study was active.
    pub fn active_years(&self) -> Result<RangeInclusive<i32>, IntegrityError> {
        let (start_year, end_year) = (self.start_year(), self.end_year());
        if end_year < start_year {
            return Err(IntegrityError::InvertedActiveWindow {
                study_id: self.id.clone(),
                start_year,
                end_year,
            });
        }
        Ok(start_year..=end_year)
    }
}

/// A geocoded study site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub study_id: String,
    pub facility: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}
