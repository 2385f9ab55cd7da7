//! Analysis engine: active-year expansion, filter slices, dense count
//! matrices, and linear / log-linear growth trends.
//!
//! Every stage is a pure transformation over in-memory rows. Filter state is
//! passed in as a [`FilterSpec`] or [`Selection`] value on each call.

pub mod aggregate;
pub mod expand;
pub mod filter;
pub mod pipeline;
mod special;
pub mod trend;

pub use aggregate::{CountMatrix, GroupBy, aggregate};
pub use expand::{ExpandedRow, expand};
pub use filter::{FilterSpec, ResultFilter, StudyRow, YearRange};
pub use pipeline::{Dashboard, Options, Selection, View};
pub use trend::{
    LinearFit, LogLinearFit, TrendFit, TrendResult, fit_linear, fit_log_linear, fit_trend,
};
