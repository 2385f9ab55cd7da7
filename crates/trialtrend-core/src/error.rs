use thiserror::Error;

/// Malformed or logically inconsistent study data.
///
/// Always fatal to the pipeline invocation that hit it. Each variant names the
/// study or year involved so the offending record can be found.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrityError {
    #[error("study {study_id}: end year {end_year} precedes start year {start_year}")]
    InvertedActiveWindow {
        study_id: String,
        start_year: i32,
        end_year: i32,
    },

    #[error("year at position {index} is not finite: {value}")]
    NonFiniteYear { index: usize, value: f64 },

    #[error("count for year {year} is not finite: {value}")]
    NonFiniteCount { year: f64, value: f64 },

    #[error("study {study_id}: invalid {field} date {value:?}")]
    InvalidDate {
        study_id: String,
        field: &'static str,
        value: String,
    },

    #[error("study {study_id}: unknown overall status {value:?}")]
    UnknownStatus { study_id: String, value: String },

    #[error("study {study_id}: missing required field {field}")]
    MissingField {
        study_id: String,
        field: &'static str,
    },
}
