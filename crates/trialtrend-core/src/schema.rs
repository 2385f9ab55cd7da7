/// Arrow schema definitions for ClinicalTrials.gov flat tables.
pub mod ctg {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Name of the year column in count-matrix batches.
    pub const YEAR_COLUMN: &str = "year";

    /// Schema for the flat per-study table.
    ///
    /// Dates are ISO strings so month-precision registry dates survive a
    /// round trip through CSV.
    pub fn study_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("start_date", DataType::Utf8, false),
            Field::new("end_date", DataType::Utf8, true),
            Field::new("last_update_date", DataType::Utf8, false),
            Field::new("status", DataType::Utf8, false),
            Field::new("phase", DataType::Utf8, false),
            Field::new("has_results", DataType::Boolean, false),
        ])
    }

    /// Schema for geocoded study sites.
    pub fn geo_schema() -> Schema {
        Schema::new(vec![
            Field::new("study_id", DataType::Utf8, false),
            Field::new("facility", DataType::Utf8, true),
            Field::new("latitude", DataType::Float64, false),
            Field::new("longitude", DataType::Float64, false),
        ])
    }

    /// Schema for a dense year × category count matrix.
    ///
    /// One `year` column followed by one count column per category, in the
    /// order given.
    pub fn count_matrix_schema<S: AsRef<str>>(categories: &[S]) -> Schema {
        let mut fields = Vec::with_capacity(categories.len() + 1);
        fields.push(Field::new(YEAR_COLUMN, DataType::Int32, false));
        fields.extend(
            categories
                .iter()
                .map(|c| Field::new(c.as_ref(), DataType::UInt64, false)),
        );
        Schema::new(fields)
    }
}
