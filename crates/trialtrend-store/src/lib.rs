//! Storage layer: registry extraction and flat Arrow tables (CSV, Parquet).

mod error;
pub use error::StoreError;

mod extract;
pub use extract::{Extraction, extract_file, extract_studies};

mod table;
pub use table::{
    TableFormat, geo_to_batch, load_studies, read_table, studies_from_batches, studies_to_batch,
    write_table,
};
