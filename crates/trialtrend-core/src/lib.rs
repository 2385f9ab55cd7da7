pub mod dates;
pub mod error;
pub mod schema;
pub mod study;

pub use dates::{format_study_date, parse_field_date, parse_study_date};
pub use error::IntegrityError;
pub use schema::ctg;
pub use study::{GeoPoint, ParseStatusError, Phase, StudyRecord, StudyStatus};
