//! Flat study and site tables as Arrow batches, stored as CSV or Parquet.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, RecordBatch, StringArray};
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, info};
use trialtrend_core::{
    GeoPoint, IntegrityError, Phase, StudyRecord, ctg, format_study_date, parse_field_date,
};

use crate::StoreError;
use crate::extract::{parse_status, required};

/// On-disk table format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") => Ok(Self::Parquet),
            _ => Err(StoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

// ── Records ↔ batches ──

pub fn studies_to_batch(studies: &[StudyRecord]) -> Result<RecordBatch, StoreError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            studies.iter().map(|s| s.id.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            studies.iter().map(|s| format_study_date(s.start_date)),
        )),
        Arc::new(
            studies
                .iter()
                .map(|s| s.end_date.map(format_study_date))
                .collect::<StringArray>(),
        ),
        Arc::new(StringArray::from_iter_values(
            studies.iter().map(|s| format_study_date(s.last_update_date)),
        )),
        Arc::new(StringArray::from_iter_values(
            studies.iter().map(|s| s.status.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            studies.iter().map(|s| s.phase.as_str()),
        )),
        Arc::new(BooleanArray::from(
            studies.iter().map(|s| s.has_results).collect::<Vec<_>>(),
        )),
    ];
    Ok(RecordBatch::try_new(Arc::new(ctg::study_schema()), columns)?)
}

pub fn geo_to_batch(points: &[GeoPoint]) -> Result<RecordBatch, StoreError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            points.iter().map(|p| p.study_id.as_str()),
        )),
        Arc::new(
            points
                .iter()
                .map(|p| p.facility.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(Float64Array::from_iter_values(
            points.iter().map(|p| p.latitude),
        )),
        Arc::new(Float64Array::from_iter_values(
            points.iter().map(|p| p.longitude),
        )),
    ];
    Ok(RecordBatch::try_new(Arc::new(ctg::geo_schema()), columns)?)
}

/// Rebuild study records from batches laid out as [`ctg::study_schema`].
///
/// Every record is validated again; an inverted active window or an
/// unreadable field is an [`IntegrityError`].
pub fn studies_from_batches(batches: &[RecordBatch]) -> Result<Vec<StudyRecord>, StoreError> {
    let mut studies = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());
    let mut offset = 0;

    for batch in batches {
        let ids = string_column(batch, "id")?;
        let starts = string_column(batch, "start_date")?;
        let ends = string_column(batch, "end_date")?;
        let updates = string_column(batch, "last_update_date")?;
        let statuses = string_column(batch, "status")?;
        let phases = string_column(batch, "phase")?;
        let results = batch
            .column_by_name("has_results")
            .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
            .ok_or_else(|| StoreError::MissingColumn("has_results".into()))?;

        for row in 0..batch.num_rows() {
            let id = cell(ids, row).ok_or_else(|| IntegrityError::MissingField {
                study_id: format!("row {}", offset + row),
                field: "id",
            })?;
            let status = parse_status(id, required(id, "status", cell(statuses, row))?)?;
            let end_date = cell(ends, row)
                .map(|v| parse_field_date(id, "end_date", v))
                .transpose()?;
            let start = required(id, "start_date", cell(starts, row))?;
            let last_update = required(id, "last_update_date", cell(updates, row))?;

            studies.push(StudyRecord::new(
                id,
                parse_field_date(id, "start_date", start)?,
                end_date,
                parse_field_date(id, "last_update_date", last_update)?,
                status,
                cell(phases, row).map_or_else(|| Phase::new(Phase::NONE_LABEL), Phase::new),
                !results.is_null(row) && results.value(row),
            )?);
        }
        offset += batch.num_rows();
    }

    Ok(studies)
}

// ── Files ──

/// Write one batch to `path`, as CSV or Parquet by extension.
pub fn write_table(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let format = TableFormat::from_path(path)?;
    let file = File::create(path)?;
    match format {
        TableFormat::Csv => {
            let mut writer = arrow::csv::WriterBuilder::new()
                .with_header(true)
                .build(file);
            writer.write(batch)?;
        }
        TableFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }
    info!(path = %path.display(), rows = batch.num_rows(), "wrote table");
    Ok(())
}

/// Read every batch from a CSV or Parquet table.
///
/// CSV has no embedded types, so `schema` decodes it. Columns are matched
/// by header name, in any order; unknown columns are skipped and a missing
/// one is [`StoreError::MissingColumn`]. Batches come back in `schema`
/// order. Parquet files carry their own schema.
pub fn read_table(path: &Path, schema: SchemaRef) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.to_path_buf()));
    }
    let format = TableFormat::from_path(path)?;
    let file = File::open(path)?;
    match format {
        TableFormat::Csv => read_csv(file, &schema),
        TableFormat::Parquet => Ok(ParquetRecordBatchReaderBuilder::try_new(file)?
            .build()?
            .collect::<Result<_, _>>()?),
    }
}

fn read_csv(mut file: File, schema: &SchemaRef) -> Result<Vec<RecordBatch>, StoreError> {
    let (header, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(0))?;
    file.rewind()?;

    let names: Vec<&str> = header.fields().iter().map(|f| f.name().trim()).collect();
    let projection = schema
        .fields()
        .iter()
        .map(|field| {
            names
                .iter()
                .position(|name| *name == field.name().as_str())
                .ok_or_else(|| StoreError::MissingColumn(field.name().clone()))
        })
        .collect::<Result<Vec<usize>, _>>()?;

    // Typed as expected where known; anything else is read as text and dropped.
    let file_schema = Schema::new(
        names
            .iter()
            .map(|name| match schema.field_with_name(name) {
                Ok(field) => field.clone(),
                Err(_) => Field::new(*name, DataType::Utf8, true),
            })
            .collect::<Vec<_>>(),
    );
    debug!(columns = ?names, "csv header");

    let reader = arrow::csv::ReaderBuilder::new(Arc::new(file_schema))
        .with_header(true)
        .with_projection(projection)
        .build(file)?;
    Ok(reader.collect::<Result<_, _>>()?)
}

/// Load a flat study table written by `extract` (or by hand).
pub fn load_studies(path: &Path) -> Result<Vec<StudyRecord>, StoreError> {
    let batches = read_table(path, Arc::new(ctg::study_schema()))?;
    let studies = studies_from_batches(&batches)?;
    info!(path = %path.display(), count = studies.len(), "loaded studies");
    Ok(studies)
}

fn string_column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
}

/// Non-null, non-blank cell value.
fn cell(col: &StringArray, row: usize) -> Option<&str> {
    if col.is_null(row) {
        return None;
    }
    let value = col.value(row).trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use trialtrend_core::StudyStatus;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<StudyRecord> {
        vec![
            StudyRecord::new(
                "NCT001",
                ymd(2012, 4, 2),
                Some(ymd(2016, 9, 1)),
                ymd(2017, 1, 15),
                StudyStatus::Completed,
                Phase::from("PHASE2"),
                true,
            )
            .unwrap(),
            StudyRecord::new(
                "NCT002",
                ymd(2019, 1, 1),
                None,
                ymd(2023, 5, 30),
                StudyStatus::Recruiting,
                Phase::from("PHASE1, PHASE2"),
                false,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            TableFormat::from_path(Path::new("a/studies.csv")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("studies.PARQUET")).unwrap(),
            TableFormat::Parquet
        );
        assert!(matches!(
            TableFormat::from_path(Path::new("studies.xlsx")),
            Err(StoreError::UnsupportedFormat(_))
        ));
        assert!(TableFormat::from_path(Path::new("studies")).is_err());
    }

    #[test]
    fn study_batch_matches_schema() {
        let batch = studies_to_batch(&sample()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().as_ref(), &ctg::study_schema());

        let ends = string_column(&batch, "end_date").unwrap();
        assert_eq!(ends.value(0), "2016-09-01");
        assert!(ends.is_null(1));
    }

    #[test]
    fn csv_table_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        let studies = sample();

        write_table(&path, &studies_to_batch(&studies).unwrap()).unwrap();
        assert_eq!(load_studies(&path).unwrap(), studies);
    }

    #[test]
    fn parquet_table_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.parquet");
        let studies = sample();

        write_table(&path, &studies_to_batch(&studies).unwrap()).unwrap();
        assert_eq!(load_studies(&path).unwrap(), studies);
    }

    #[test]
    fn hand_written_csv_loads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "id,start_date,end_date,last_update_date,status,phase,has_results\n\
             NCT100,2014-06,,2020-02-11,ACTIVE_NOT_RECRUITING,PHASE3,false\n\
             NCT101,2015,2018-12-31,2019-01-04,completed,NA,true\n",
        )
        .unwrap();

        let studies = load_studies(&path).unwrap();
        assert_eq!(studies.len(), 2);
        assert_eq!(studies[0].start_date, ymd(2014, 6, 1));
        assert_eq!(studies[0].end_date, None);
        assert_eq!(studies[0].active_years().unwrap(), 2014..=2020);
        assert_eq!(studies[1].status, StudyStatus::Completed);
        assert_eq!(studies[1].phase.as_str(), "NA");
        assert!(studies[1].has_results);
    }

    #[test]
    fn csv_columns_match_by_header_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "id,last_update_date,start_date,end_date,status,phase,has_results\n\
             NCT1,2023-05-01,2012-03-04,2024-06-01,COMPLETED,PHASE2,true\n",
        )
        .unwrap();

        let studies = load_studies(&path).unwrap();
        assert_eq!(studies[0].start_date, ymd(2012, 3, 4));
        assert_eq!(studies[0].last_update_date, ymd(2023, 5, 1));
        assert_eq!(studies[0].end_date, Some(ymd(2024, 6, 1)));
        assert_eq!(studies[0].active_years().unwrap(), 2012..=2024);
    }

    #[test]
    fn extra_csv_columns_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "sponsor,id,start_date,end_date,last_update_date,status,phase,has_results,enrollment\n\
             Acme,NCT2,2016-01-01,,2018-07-07,RECRUITING,PHASE1,false,120\n",
        )
        .unwrap();

        let studies = load_studies(&path).unwrap();
        assert_eq!(studies.len(), 1);
        assert_eq!(studies[0].id, "NCT2");
        assert_eq!(studies[0].status, StudyStatus::Recruiting);
        assert_eq!(studies[0].active_years().unwrap(), 2016..=2018);
    }

    #[test]
    fn csv_without_a_required_column_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "id,start_date,end_date,status,phase,has_results\n\
             NCT3,2016-01-01,,RECRUITING,PHASE1,false\n",
        )
        .unwrap();

        let err = load_studies(&path).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn(ref c) if c == "last_update_date"));
    }

    #[test]
    fn blank_status_cell_is_a_missing_field() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "id,start_date,end_date,last_update_date,status,phase,has_results\n\
             NCT4,2016-01-01,,2018-01-01,,PHASE1,false\n",
        )
        .unwrap();

        assert!(matches!(
            load_studies(&path),
            Err(StoreError::Integrity(IntegrityError::MissingField { field: "status", .. }))
        ));
    }

    #[test]
    fn inverted_window_in_table_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "id,start_date,end_date,last_update_date,status,phase,has_results\n\
             NCT200,2018-01-01,2015-01-01,2019-01-01,COMPLETED,PHASE1,false\n",
        )
        .unwrap();

        let err = load_studies(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Integrity(IntegrityError::InvertedActiveWindow { .. })
        ));
    }

    #[test]
    fn unknown_status_in_table_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("studies.csv");
        std::fs::write(
            &path,
            "id,start_date,end_date,last_update_date,status,phase,has_results\n\
             NCT300,2018-01-01,,2019-01-01,ON_HOLD,PHASE1,false\n",
        )
        .unwrap();

        assert!(matches!(
            load_studies(&path),
            Err(StoreError::Integrity(IntegrityError::UnknownStatus { .. }))
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["NCT400"])) as ArrayRef],
        )
        .unwrap();

        let err = studies_from_batches(&[batch]).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn(ref c) if c == "start_date"));
    }

    #[test]
    fn geo_table_writes_to_parquet() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sites.parquet");
        let points = vec![
            GeoPoint {
                study_id: "NCT001".into(),
                facility: Some("City Hospital".into()),
                latitude: 40.7,
                longitude: -74.0,
            },
            GeoPoint {
                study_id: "NCT001".into(),
                facility: None,
                latitude: 51.5,
                longitude: -0.1,
            },
        ];

        write_table(&path, &geo_to_batch(&points).unwrap()).unwrap();
        let batches = read_table(&path, Arc::new(ctg::geo_schema())).unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);

        let lat = batches[0]
            .column_by_name("latitude")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(lat.value(1), 51.5);
    }

    #[test]
    fn missing_table_is_reported() {
        let err = load_studies(Path::new("/nonexistent/studies.csv")).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }
}
