//! Wide-format projects mart.
//!
//! One row per (source, project_id) with the 1:m relationships spread
//! into numbered columns: up to two generation types, one storage type
//! and two counties. Wide format is ugly but it's what spreadsheet
//! users want. Overflowing a numbered column is fatal, never silently
//! truncated.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::{LongFormatRow, WideFormatRow};
use crate::error::{EtlError, Result};

fn is_storage(resource_clean: &str) -> bool {
    resource_clean.to_lowercase().contains("storage")
}

/// Resource rows collapsed for one (source, project_id, county) group.
struct LocationGroup<'a> {
    first_row: &'a LongFormatRow,
    generation: Vec<(&'a str, Option<f64>)>,
    storage: Option<(&'a str, Option<f64>)>,
    co2e_tonnes_per_year: f64,
}

/// Restructure the long format to one row per project.
pub fn create_wide_format(long: &[LongFormatRow]) -> Result<Vec<WideFormatRow>> {
    // group by (source, project_id, county); BTreeMap keeps the output
    // ordered by (source, project_id)
    let mut location_groups: BTreeMap<(String, i64, Option<String>), LocationGroup> =
        BTreeMap::new();
    for row in long {
        let key = (
            row.source.clone(),
            row.project_id,
            row.county_id_fips.clone(),
        );
        let group = location_groups.entry(key).or_insert_with(|| LocationGroup {
            first_row: row,
            generation: Vec::new(),
            storage: None,
            co2e_tonnes_per_year: 0.0,
        });
        group.co2e_tonnes_per_year += row.co2e_tonnes_per_year;
        if is_storage(&row.resource_clean) {
            if group.storage.is_some() {
                return Err(EtlError::CardinalityViolation(format!(
                    "project ({}, {}) has more than one storage resource",
                    row.source, row.project_id
                )));
            }
            group.storage = Some((&row.resource_clean, row.capacity_mw));
        } else {
            if group.generation.len() == 2 {
                return Err(EtlError::CardinalityViolation(format!(
                    "project ({}, {}) has more than two generation types",
                    row.source, row.project_id
                )));
            }
            group.generation.push((&row.resource_clean, row.capacity_mw));
        }
    }

    // regroup the location groups by (source, project_id)
    let mut projects: BTreeMap<(String, i64), Vec<&LocationGroup>> = BTreeMap::new();
    for ((source, project_id, _), group) in &location_groups {
        let locations = projects.entry((source.clone(), *project_id)).or_default();
        if locations.len() == 2 {
            return Err(EtlError::CardinalityViolation(format!(
                "project ({source}, {project_id}) has more than two locations"
            )));
        }
        locations.push(group);
    }

    let expected = projects.len();
    let mut wide: Vec<WideFormatRow> = Vec::with_capacity(expected);
    for ((source, project_id), locations) in projects {
        // scalar columns and resource columns come from the first
        // location group; resource rows repeat identically per location
        let primary = locations[0];
        let first = primary.first_row;
        let second = locations.get(1).map(|g| g.first_row);
        wide.push(WideFormatRow {
            source,
            project_id,
            project_name: first.project_name.clone(),
            iso_region: first.iso_region.clone(),
            entity: first.entity.clone(),
            utility: first.utility.clone(),
            developer: first.developer.clone(),
            state_1: first.state.clone(),
            state_id_fips_1: first.state_id_fips.clone(),
            county_1: first.county.clone(),
            county_id_fips_1: first.county_id_fips.clone(),
            county_2: second.and_then(|r| r.county.clone()),
            county_id_fips_2: second.and_then(|r| r.county_id_fips.clone()),
            resource_class: first.resource_class,
            is_hybrid: first.is_hybrid,
            generation_type_1: primary.generation.first().map(|(t, _)| t.to_string()),
            generation_capacity_mw_1: primary.generation.first().and_then(|(_, mw)| *mw),
            generation_type_2: primary.generation.get(1).map(|(t, _)| t.to_string()),
            generation_capacity_mw_2: primary.generation.get(1).and_then(|(_, mw)| *mw),
            storage_type: primary.storage.map(|(t, _)| t.to_string()),
            storage_capacity_mw: primary.storage.and_then(|(_, mw)| mw),
            co2e_tonnes_per_year: primary.co2e_tonnes_per_year,
            date_entered_queue: first.date_entered_queue,
            date_proposed_online: first.date_proposed_online,
            interconnection_status: first.interconnection_status.clone(),
            point_of_interconnection: first.point_of_interconnection.clone(),
            queue_status: first.queue_status.clone(),
            ordinance_via_reldi: first.ordinance_via_reldi,
            ordinance_jurisdiction_name: first.ordinance_jurisdiction_name.clone(),
            ordinance_jurisdiction_type: first.ordinance_jurisdiction_type.clone(),
            ordinance_earliest_year_mentioned: first.ordinance_earliest_year_mentioned,
            ordinance_text: first.ordinance_text.clone(),
            state_permitting_type: first.state_permitting_type.clone(),
            is_actionable: first.is_actionable,
            is_actionable_or_late_stage: first.is_actionable_or_late_stage,
        });
    }

    if wide.len() != expected {
        return Err(EtlError::RowCountMismatch {
            expected,
            actual: wide.len(),
            context: "wide format must have one row per (source, project_id)".to_string(),
        });
    }
    info!(rows = wide.len(), "Built wide-format projects mart");
    Ok(wide)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_row(
        project_id: i64,
        county_fips: Option<&str>,
        resource: &str,
        mw: f64,
    ) -> LongFormatRow {
        LongFormatRow {
            source: "lbnl".to_string(),
            project_id,
            county_id_fips: county_fips.map(str::to_string),
            county: county_fips.map(|_| "Dane".to_string()),
            state: Some("Wisconsin".to_string()),
            state_id_fips: Some("55".to_string()),
            resource_clean: resource.to_string(),
            capacity_mw: Some(mw),
            frac_locations_in_county: 1.0,
            queue_status: "active".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn hybrid_project_splits_into_generation_and_storage_columns() {
        let long = vec![
            long_row(1, Some("55025"), "Solar", 100.0),
            long_row(1, Some("55025"), "Battery Storage", 50.0),
        ];
        let wide = create_wide_format(&long).unwrap();
        assert_eq!(wide.len(), 1);
        let row = &wide[0];
        assert_eq!(row.generation_type_1.as_deref(), Some("Solar"));
        assert_eq!(row.generation_capacity_mw_1, Some(100.0));
        assert!(row.generation_type_2.is_none());
        assert_eq!(row.storage_type.as_deref(), Some("Battery Storage"));
        assert_eq!(row.storage_capacity_mw, Some(50.0));
    }

    #[test]
    fn pumped_storage_counts_as_storage() {
        let long = vec![long_row(1, Some("55025"), "Pumped Storage", 300.0)];
        let wide = create_wide_format(&long).unwrap();
        assert!(wide[0].generation_type_1.is_none());
        assert_eq!(wide[0].storage_type.as_deref(), Some("Pumped Storage"));
    }

    #[test]
    fn two_locations_become_numbered_county_columns() {
        let mut second = long_row(1, Some("55105"), "Solar", 100.0);
        second.county = Some("Rock".to_string());
        second.frac_locations_in_county = 0.5;
        let mut first = long_row(1, Some("55025"), "Solar", 100.0);
        first.frac_locations_in_county = 0.5;
        let wide = create_wide_format(&[first, second]).unwrap();
        assert_eq!(wide.len(), 1);
        assert_eq!(wide[0].county_id_fips_1.as_deref(), Some("55025"));
        assert_eq!(wide[0].county_id_fips_2.as_deref(), Some("55105"));
        assert_eq!(wide[0].county_2.as_deref(), Some("Rock"));
    }

    #[test]
    fn third_generation_type_is_fatal() {
        let long = vec![
            long_row(1, Some("55025"), "Solar", 1.0),
            long_row(1, Some("55025"), "Onshore Wind", 2.0),
            long_row(1, Some("55025"), "Natural Gas", 3.0),
        ];
        let err = create_wide_format(&long).unwrap_err();
        assert!(matches!(err, EtlError::CardinalityViolation(_)));
    }

    #[test]
    fn second_storage_type_is_fatal() {
        let long = vec![
            long_row(1, Some("55025"), "Battery Storage", 1.0),
            long_row(1, Some("55025"), "Pumped Storage", 2.0),
        ];
        let err = create_wide_format(&long).unwrap_err();
        assert!(matches!(err, EtlError::CardinalityViolation(_)));
    }

    #[test]
    fn third_location_is_fatal() {
        let long = vec![
            long_row(1, Some("55025"), "Solar", 1.0),
            long_row(1, Some("55105"), "Solar", 1.0),
            long_row(1, Some("55117"), "Solar", 1.0),
        ];
        let err = create_wide_format(&long).unwrap_err();
        assert!(matches!(err, EtlError::CardinalityViolation(_)));
    }

    #[test]
    fn co2e_is_summed_within_a_location_group() {
        let mut gas = long_row(1, Some("55025"), "Natural Gas", 100.0);
        gas.co2e_tonnes_per_year = 1000.0;
        let mut coal = long_row(1, Some("55025"), "Coal", 100.0);
        coal.co2e_tonnes_per_year = 2000.0;
        let wide = create_wide_format(&[gas, coal]).unwrap();
        assert_eq!(wide[0].co2e_tonnes_per_year, 3000.0);
    }

    #[test]
    fn output_is_one_row_per_project_sorted() {
        let long = vec![
            long_row(2, Some("55025"), "Solar", 1.0),
            long_row(1, None, "Onshore Wind", 2.0),
        ];
        let wide = create_wide_format(&long).unwrap();
        let ids: Vec<i64> = wide.iter().map(|r| r.project_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(wide[0].county_id_fips_1.is_none());
    }
}
