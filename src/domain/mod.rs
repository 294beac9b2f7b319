//! Typed records for every table the pipeline consumes or produces.
//!
//! The source data is spreadsheet-shaped, so the raw queue row carries
//! positional one-to-many columns (`resource_type_1..3`, `county_1..3`).
//! Those are split into normalized child tables by the fan-out step; from
//! there on everything is keyed by `project_id`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of positional slots in the raw queue's repeated columns.
pub const NUM_SLOTS: usize = 3;

/// One row of the raw interconnection queue extract, before filtering and
/// deduplication. String fields arrive as-is from the source spreadsheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQueueRow {
    pub queue_id: Option<String>,
    pub project_name: Option<String>,
    pub developer: Option<String>,
    pub entity: Option<String>,
    pub utility: Option<String>,
    /// ISO/RTO region, e.g. "MISO" or "West (non-ISO)".
    pub region: Option<String>,
    /// "active", "withdrawn", "operational" or "suspended".
    pub queue_status: String,
    pub interconnection_status_lbnl: Option<String>,
    /// Unparsed queue-entry date.
    pub queue_date: Option<String>,
    /// Unparsed proposed-online date.
    pub date_proposed: Option<String>,
    pub point_of_interconnection: Option<String>,
    /// Combined raw resource-type string, e.g. "Solar; Battery Storage".
    pub resource_type_lbnl: Option<String>,
    pub resource_types: [Option<String>; NUM_SLOTS],
    pub capacities_mw: [Option<f64>; NUM_SLOTS],
    pub counties: [Option<String>; NUM_SLOTS],
    pub state: Option<String>,
}

/// An active queue row after deduplication, date parsing and actionability
/// classification, still carrying its positional columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveProject {
    /// Dense integer id assigned over the active rows at ingest.
    pub project_id: i64,
    pub queue_id: Option<String>,
    pub project_name: Option<String>,
    pub developer: Option<String>,
    pub entity: Option<String>,
    pub utility: Option<String>,
    pub region: Option<String>,
    pub queue_status: String,
    /// Harmonized interconnection status.
    pub interconnection_status_lbnl: Option<String>,
    pub queue_date_raw: Option<String>,
    pub queue_date: Option<NaiveDate>,
    pub date_proposed_raw: Option<String>,
    pub date_proposed: Option<NaiveDate>,
    pub point_of_interconnection: Option<String>,
    pub resource_type_lbnl: Option<String>,
    pub resource_types: [Option<String>; NUM_SLOTS],
    pub capacities_mw: [Option<f64>; NUM_SLOTS],
    pub counties: [Option<String>; NUM_SLOTS],
    pub raw_state_name: Option<String>,
    pub is_actionable: bool,
    pub is_actionable_or_late_stage: bool,
}

impl ActiveProject {
    /// Proposed-online year, used for actionability year qualification.
    pub fn year_proposed(&self) -> Option<i32> {
        use chrono::Datelike;
        self.date_proposed.map(|d| d.year())
    }

    /// Queue-entry year, the fallback when the proposed year is missing.
    pub fn queue_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.queue_date.map(|d| d.year())
    }
}

/// Project-level scalars after the one-to-many columns are split off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: i64,
    pub queue_id: Option<String>,
    pub project_name: Option<String>,
    pub developer: Option<String>,
    pub entity: Option<String>,
    pub utility: Option<String>,
    pub region: Option<String>,
    pub queue_status: String,
    pub interconnection_status_lbnl: Option<String>,
    pub queue_date: Option<NaiveDate>,
    pub date_proposed: Option<NaiveDate>,
    pub point_of_interconnection: Option<String>,
    pub resource_type_lbnl: Option<String>,
    pub is_actionable: bool,
    pub is_actionable_or_late_stage: bool,
}

/// One prospective location of a project. FIPS codes and geocoder output
/// are filled by the enrichment step; they stay null when neither the
/// lookup tables nor the geocoder can resolve the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationRow {
    pub project_id: i64,
    pub raw_county_name: Option<String>,
    pub raw_state_name: Option<String>,
    pub state_id_fips: Option<String>,
    pub county_id_fips: Option<String>,
    pub geocoded_locality_name: Option<String>,
    pub geocoded_locality_type: Option<String>,
    pub geocoded_containing_county: Option<String>,
}

/// One (resource type, capacity) pair of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceCapacityRow {
    pub project_id: i64,
    /// Raw resource string from the source file.
    pub resource: Option<String>,
    pub capacity_mw: Option<f64>,
    /// Canonical resource name from the taxonomy. Filled by
    /// `clean_resource_types`; never empty afterwards.
    pub resource_clean: String,
}

/// The normalized child tables produced from one queue source.
#[derive(Debug, Clone, Default)]
pub struct NormalizedQueueTables {
    pub projects: Vec<ProjectRecord>,
    pub locations: Vec<LocationRow>,
    pub resource_capacity: Vec<ResourceCapacityRow>,
}

/// A normalized queue batch tagged with its data mart source label.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub tables: NormalizedQueueTables,
}

/// Broad class used by the data mart to bucket canonical resource names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Fossil,
    Renewable,
    Storage,
    Transmission,
    Other,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Fossil => "fossil",
            ResourceClass::Renewable => "renewable",
            ResourceClass::Storage => "storage",
            ResourceClass::Transmission => "transmission",
            ResourceClass::Other => "other",
        }
    }
}

/// County-level ordinance/opposition attributes joined onto project rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdinanceRecord {
    pub county_id_fips: String,
    pub ordinance_text: Option<String>,
    pub ordinance_jurisdiction_name: Option<String>,
    pub ordinance_jurisdiction_type: Option<String>,
    pub ordinance_earliest_year_mentioned: Option<i32>,
    pub ordinance_via_self_maintained: Option<bool>,
    pub ordinance_via_solar_nrel: Option<bool>,
    pub ordinance_via_wind_nrel: Option<bool>,
}

/// One row of the long-format projects mart: the cross product of
/// (project x location x resource). The composite key
/// (source, project_id, county_id_fips, resource_clean) is unique but
/// county_id_fips has nulls, hence the surrogate id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LongFormatRow {
    pub surrogate_id: i64,
    pub source: String,
    pub project_id: i64,
    pub queue_id: Option<String>,
    pub project_name: Option<String>,
    pub developer: Option<String>,
    pub entity: Option<String>,
    pub utility: Option<String>,
    pub iso_region: Option<String>,
    pub queue_status: String,
    pub interconnection_status: Option<String>,
    pub point_of_interconnection: Option<String>,
    pub date_entered_queue: Option<NaiveDate>,
    pub date_proposed_online: Option<NaiveDate>,
    pub is_actionable: bool,
    pub is_actionable_or_late_stage: bool,
    pub state: Option<String>,
    pub county: Option<String>,
    pub state_id_fips: Option<String>,
    pub county_id_fips: Option<String>,
    /// Allocation weight: 1/N for a project with N locations, 1.0 when the
    /// project has no location data. Multiply capacity or co2e by this when
    /// aggregating over counties, otherwise they are double-counted.
    pub frac_locations_in_county: f64,
    pub resource_clean: String,
    pub capacity_mw: Option<f64>,
    pub resource_class: Option<ResourceClass>,
    pub is_hybrid: bool,
    pub co2e_tonnes_per_year: f64,
    pub ordinance_via_reldi: bool,
    pub ordinance_is_restrictive: bool,
    pub ordinance_jurisdiction_name: Option<String>,
    pub ordinance_jurisdiction_type: Option<String>,
    pub ordinance_earliest_year_mentioned: Option<i32>,
    pub ordinance_text: Option<String>,
    pub state_permitting_type: Option<String>,
}

/// One row of the wide-format projects mart: one row per
/// (source, project_id), with the 1:m relationships flattened into
/// numbered columns. Overflowing the numbered columns is a fatal error,
/// never a truncation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WideFormatRow {
    pub source: String,
    pub project_id: i64,
    pub project_name: Option<String>,
    pub iso_region: Option<String>,
    pub entity: Option<String>,
    pub utility: Option<String>,
    pub developer: Option<String>,
    pub state_1: Option<String>,
    pub state_id_fips_1: Option<String>,
    pub county_1: Option<String>,
    pub county_id_fips_1: Option<String>,
    pub county_2: Option<String>,
    pub county_id_fips_2: Option<String>,
    pub resource_class: Option<ResourceClass>,
    pub is_hybrid: bool,
    pub generation_type_1: Option<String>,
    pub generation_capacity_mw_1: Option<f64>,
    pub generation_type_2: Option<String>,
    pub generation_capacity_mw_2: Option<f64>,
    pub storage_type: Option<String>,
    pub storage_capacity_mw: Option<f64>,
    pub co2e_tonnes_per_year: f64,
    pub date_entered_queue: Option<NaiveDate>,
    pub date_proposed_online: Option<NaiveDate>,
    pub interconnection_status: Option<String>,
    pub point_of_interconnection: Option<String>,
    pub queue_status: String,
    pub ordinance_via_reldi: bool,
    pub ordinance_jurisdiction_name: Option<String>,
    pub ordinance_jurisdiction_type: Option<String>,
    pub ordinance_earliest_year_mentioned: Option<i32>,
    pub ordinance_text: Option<String>,
    pub state_permitting_type: Option<String>,
    pub is_actionable: bool,
    pub is_actionable_or_late_stage: bool,
}
