//! ClinicalTrials.gov v2 JSON → flat study and site records.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use trialtrend_core::{
    GeoPoint, IntegrityError, Phase, StudyRecord, StudyStatus, parse_field_date,
};

use crate::StoreError;

/// Flat records pulled out of one registry export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub studies: Vec<StudyRecord>,
    pub sites: Vec<GeoPoint>,
}

// ── Registry document shape (only the fields we read) ──

/// Either a bare array of studies or an API page (`{"studies": [...]}`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    List(Vec<RawStudy>),
    Page { studies: Vec<RawStudy> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStudy {
    protocol_section: ProtocolSection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    identification_module: IdentificationModule,
    #[serde(default)]
    status_module: StatusModule,
    #[serde(default)]
    design_module: DesignModule,
    #[serde(default)]
    contacts_locations_module: ContactsLocationsModule,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
    study_first_submit_date: Option<String>,
    last_update_submit_date: Option<String>,
    completion_date_struct: Option<DateStruct>,
    results_first_submit_date: Option<String>,
}

#[derive(Deserialize)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Default, Deserialize)]
struct DesignModule {
    #[serde(default)]
    phases: Vec<String>,
}

#[derive(Default, Deserialize)]
struct ContactsLocationsModule {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    facility: Option<String>,
    geo_point: Option<RawGeoPoint>,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lon: f64,
}

// ── Extraction ──

/// Parse a registry export held in memory.
///
/// Any malformed study aborts the whole extraction with an
/// [`IntegrityError`] naming the study.
pub fn extract_studies(json: &str) -> Result<Extraction, StoreError> {
    let raw = match serde_json::from_str::<Document>(json)? {
        Document::List(studies) | Document::Page { studies } => studies,
    };

    let mut out = Extraction::default();
    for study in &raw {
        out.studies.push(study_record(study)?);
        out.sites.extend(geo_points(study));
    }

    let fallbacks = out
        .studies
        .iter()
        .filter(|s| s.uses_update_fallback())
        .count();
    if fallbacks > 0 {
        warn!(
            count = fallbacks,
            "studies without a completion date; end year taken from last update"
        );
    }

    info!(
        studies = out.studies.len(),
        sites = out.sites.len(),
        "extracted registry records"
    );
    Ok(out)
}

/// Read and parse a registry export from disk.
pub fn extract_file(path: &Path) -> Result<Extraction, StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path)?;
    extract_studies(&json)
}

fn study_record(raw: &RawStudy) -> Result<StudyRecord, IntegrityError> {
    let section = &raw.protocol_section;
    let id = section.identification_module.nct_id.as_str();
    let status_module = &section.status_module;

    let status = parse_status(
        id,
        required(id, "overallStatus", status_module.overall_status.as_deref())?,
    )?;

    let start = required(
        id,
        "studyFirstSubmitDate",
        status_module.study_first_submit_date.as_deref(),
    )?;
    let last_update = required(
        id,
        "lastUpdateSubmitDate",
        status_module.last_update_submit_date.as_deref(),
    )?;
    let end = status_module
        .completion_date_struct
        .as_ref()
        .and_then(|d| d.date.as_deref())
        .map(|value| parse_field_date(id, "completionDate", value))
        .transpose()?;

    StudyRecord::new(
        id,
        parse_field_date(id, "studyFirstSubmitDate", start)?,
        end,
        parse_field_date(id, "lastUpdateSubmitDate", last_update)?,
        status,
        Phase::from_tags(&section.design_module.phases),
        status_module.results_first_submit_date.is_some(),
    )
}

fn geo_points(raw: &RawStudy) -> impl Iterator<Item = GeoPoint> + '_ {
    let section = &raw.protocol_section;
    let id = &section.identification_module.nct_id;
    section
        .contacts_locations_module
        .locations
        .iter()
        .filter_map(move |loc| {
            let point = loc.geo_point.as_ref()?;
            Some(GeoPoint {
                study_id: id.clone(),
                facility: loc.facility.clone(),
                latitude: point.lat,
                longitude: point.lon,
            })
        })
}

/// A present, non-blank field value.
pub(crate) fn required<'v>(
    study_id: &str,
    field: &'static str,
    value: Option<&'v str>,
) -> Result<&'v str, IntegrityError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| IntegrityError::MissingField {
            study_id: study_id.to_string(),
            field,
        })
}

pub(crate) fn parse_status(study_id: &str, label: &str) -> Result<StudyStatus, IntegrityError> {
    label.parse().map_err(|_| IntegrityError::UnknownStatus {
        study_id: study_id.to_string(),
        value: label.to_string(),
    })
}
