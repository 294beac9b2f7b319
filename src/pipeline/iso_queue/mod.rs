//! Interconnection-queue transform.
//!
//! Stages run in a fixed order: filter to active rows, assign dense
//! project ids, harmonize statuses, deduplicate, parse dates, apply
//! manual corrections, trim whitespace, classify actionability, fan out
//! the positional columns, enrich locations with FIPS codes and
//! standardize resource types. Any stage failure aborts the batch.

pub mod actionable;
pub mod dedupe;
pub mod enrich;
pub mod fanout;
pub mod taxonomy;

pub use actionable::RegionStatusRules;
pub use dedupe::{ManualResourceCorrection, COLETO_CREEK_FIX};
pub use taxonomy::ResourceTaxonomy;

use tracing::info;

use crate::domain::{ActiveProject, NormalizedQueueTables, RawQueueRow};
use crate::error::Result;
use crate::fips::FipsTables;
use crate::geocoding::GeocodeClient;
use crate::pipeline::dates::parse_opt_date;

const ACTIVE_STATUS: &str = "active";

fn trim_opt(value: &mut Option<String>) {
    if let Some(s) = value {
        let trimmed = s.trim().to_string();
        *s = trimmed;
    }
}

fn trim_strings(project: &mut ActiveProject) {
    trim_opt(&mut project.queue_id);
    trim_opt(&mut project.project_name);
    trim_opt(&mut project.developer);
    trim_opt(&mut project.entity);
    trim_opt(&mut project.utility);
    trim_opt(&mut project.region);
    trim_opt(&mut project.interconnection_status_lbnl);
    trim_opt(&mut project.point_of_interconnection);
    trim_opt(&mut project.resource_type_lbnl);
    trim_opt(&mut project.raw_state_name);
    for slot in &mut project.resource_types {
        trim_opt(slot);
    }
    for slot in &mut project.counties {
        trim_opt(slot);
    }
    project.queue_status = project.queue_status.trim().to_string();
}

fn to_active(project_id: i64, row: RawQueueRow) -> ActiveProject {
    ActiveProject {
        project_id,
        queue_id: row.queue_id,
        project_name: row.project_name,
        developer: row.developer,
        entity: row.entity,
        utility: row.utility,
        region: row.region,
        queue_status: row.queue_status,
        interconnection_status_lbnl: row
            .interconnection_status_lbnl
            .map(|s| taxonomy::harmonize_interconnection_status(&s).to_string()),
        queue_date_raw: row.queue_date,
        queue_date: None,
        date_proposed_raw: row.date_proposed,
        date_proposed: None,
        point_of_interconnection: row.point_of_interconnection,
        resource_type_lbnl: row.resource_type_lbnl,
        resource_types: row.resource_types,
        capacities_mw: row.capacities_mw,
        counties: row.counties,
        raw_state_name: row.state,
        is_actionable: false,
        is_actionable_or_late_stage: false,
    }
}

/// Run the active-projects transform: raw queue rows in, deduplicated
/// and classified projects out, still carrying positional columns.
pub fn active_queue_projects(
    raw: Vec<RawQueueRow>,
    rules: &RegionStatusRules,
    corrections: &[ManualResourceCorrection],
) -> Result<Vec<ActiveProject>> {
    let total = raw.len();
    // ids are assigned over active rows before dedup, so they are dense
    // in the source file order and stable across reruns of one vintage
    let projects: Vec<ActiveProject> = raw
        .into_iter()
        .filter(|row| row.queue_status == ACTIVE_STATUS)
        .enumerate()
        .map(|(i, row)| to_active(i as i64, row))
        .collect();
    info!(total, active = projects.len(), "Filtered queue to active rows");

    let mut projects = dedupe::remove_duplicates(projects);

    for project in &mut projects {
        project.queue_date = parse_opt_date(project.queue_date_raw.as_deref());
        project.date_proposed = parse_opt_date(project.date_proposed_raw.as_deref());
    }

    for fix in corrections {
        dedupe::apply_manual_correction(&mut projects, fix)?;
    }

    for project in &mut projects {
        trim_strings(project);
    }

    rules.classify(&mut projects)?;
    Ok(projects)
}

/// Full queue transform: normalize into child tables, resolve county
/// FIPS codes and standardize resource types.
pub fn transform_active_queue(
    raw: Vec<RawQueueRow>,
    taxonomy: &ResourceTaxonomy,
    rules: &RegionStatusRules,
    fips: &FipsTables,
    geocoder: &dyn GeocodeClient,
    corrections: &[ManualResourceCorrection],
) -> Result<NormalizedQueueTables> {
    let projects = active_queue_projects(raw, rules, corrections)?;
    let mut tables = fanout::normalize_queue(projects)?;
    enrich::add_county_fips(&mut tables.locations, fips, geocoder)?;
    taxonomy.clean_resource_types(&mut tables.resource_capacity)?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fips::{CountyRecord, FipsTables};
    use crate::geocoding::GeocodeResponse;

    struct NullGeocoder;

    impl GeocodeClient for NullGeocoder {
        fn geocode(
            &self,
            _name: &str,
            _state: &str,
            _country: &str,
        ) -> Result<Option<GeocodeResponse>> {
            Ok(None)
        }
    }

    fn raw_row(status: &str, region: &str, ia_status: &str) -> RawQueueRow {
        RawQueueRow {
            queue_status: status.to_string(),
            region: Some(region.to_string()),
            interconnection_status_lbnl: Some(ia_status.to_string()),
            queue_date: Some("2023-03-01".to_string()),
            date_proposed: Some("2025-06-01".to_string()),
            point_of_interconnection: Some("Flint Road Substation".to_string()),
            resource_types: [Some("Solar".to_string()), None, None],
            capacities_mw: [Some(100.0), None, None],
            counties: [Some("Dane".to_string()), None, None],
            state: Some("WI".to_string()),
            resource_type_lbnl: Some("Solar".to_string()),
            ..Default::default()
        }
    }

    fn fips() -> FipsTables {
        FipsTables::new(vec![CountyRecord {
            county_id_fips: "55025".to_string(),
            state_id_fips: "55".to_string(),
            county_name: "Dane".to_string(),
            county_name_long: "Dane County".to_string(),
        }])
    }

    #[test]
    fn inactive_rows_are_dropped_and_ids_are_dense() {
        let raw = vec![
            raw_row("withdrawn", "MISO", "Withdrawn"),
            raw_row("active", "MISO", "System Impact Study"),
            raw_row("active", "SPP", "IA Executed"),
        ];
        let projects =
            active_queue_projects(raw, &RegionStatusRules::new(), &[]).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].project_id, 0);
        assert_eq!(projects[1].project_id, 1);
    }

    #[test]
    fn status_is_harmonized_before_classification() {
        let raw = vec![raw_row("active", "Southeast (non-ISO)", "Facilities Study")];
        let projects =
            active_queue_projects(raw, &RegionStatusRules::new(), &[]).unwrap();
        assert_eq!(
            projects[0].interconnection_status_lbnl.as_deref(),
            Some("Facility Study")
        );
        // Facility Study in the Southeast is late-stage but not actionable
        assert!(!projects[0].is_actionable);
        assert!(projects[0].is_actionable_or_late_stage);
    }

    #[test]
    fn end_to_end_transform_produces_all_tables() {
        let raw = vec![raw_row("active", "MISO", "System Impact Study")];
        let tables = transform_active_queue(
            raw,
            &ResourceTaxonomy::new(),
            &RegionStatusRules::new(),
            &fips(),
            &NullGeocoder,
            &[],
        )
        .unwrap();
        assert_eq!(tables.projects.len(), 1);
        assert!(tables.projects[0].is_actionable);
        assert_eq!(tables.locations[0].county_id_fips.as_deref(), Some("55025"));
        assert_eq!(tables.resource_capacity[0].resource_clean, "Solar");
        assert_eq!(
            tables.projects[0].queue_date,
            chrono::NaiveDate::from_ymd_opt(2023, 3, 1)
        );
    }

    #[test]
    fn whitespace_is_trimmed() {
        let mut row = raw_row("active", "MISO", "System Impact Study");
        row.project_name = Some("  Padded Name  ".to_string());
        let projects =
            active_queue_projects(vec![row], &RegionStatusRules::new(), &[]).unwrap();
        assert_eq!(projects[0].project_name.as_deref(), Some("Padded Name"));
    }
}
