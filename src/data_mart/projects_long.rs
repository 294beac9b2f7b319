//! Long-format projects mart.
//!
//! One row per (source, project_id, county_id_fips, resource_clean):
//! the cross product of a project's resources and prospective locations,
//! with county ordinance data joined on. Projects with several locations
//! are deliberately duplicated; `frac_locations_in_county` carries the
//! allocation weight so aggregations do not double-count capacity.

use std::collections::HashMap;

use tracing::info;

use crate::constants::FRAC_ALLOCATION_TOLERANCE;
use crate::data_mart::emissions::estimate_co2e_tonnes_per_year;
use crate::domain::{LongFormatRow, OrdinanceRecord, ResourceClass, SourceBatch};
use crate::error::{EtlError, Result};
use crate::fips::FipsTables;

/// Canonical resource name -> mart class. An `Ok(None)` entry is a
/// resource the mart deliberately leaves unclassified (pure steam,
/// unknown fuels). A name absent from this table is fatal.
fn resource_class(resource_clean: &str) -> Result<Option<ResourceClass>> {
    use ResourceClass::*;
    let class = match resource_clean {
        "Battery Storage" => Some(Storage),
        "Biofuel" => Some(Renewable),
        "Biomass" => Some(Renewable),
        "Coal" => Some(Fossil),
        "Combustion Turbine" => Some(Fossil),
        "CSP" => Some(Renewable),
        "Fuel Cell" => Some(Renewable),
        "Geothermal" => Some(Renewable),
        "Hydro" => Some(Renewable),
        "Landfill Gas" => Some(Fossil),
        "Methane; Solar" => Some(Other),
        "Municipal Solid Waste" => Some(Fossil),
        "Natural Gas; Other; Storage; Solar" => Some(Fossil),
        "Natural Gas; Storage" => Some(Fossil),
        "Natural Gas" => Some(Fossil),
        "Nuclear" => Some(Other),
        "Offshore Wind" => Some(Renewable),
        "Oil; Biomass" => Some(Fossil),
        "Oil" => Some(Fossil),
        "Onshore Wind" => Some(Renewable),
        "Other Storage" => Some(Storage),
        "Other" => Some(Fossil),
        "Pumped Storage" => Some(Storage),
        "Solar; Biomass" => Some(Renewable),
        "Solar; Storage" => Some(Renewable),
        "Solar" => Some(Renewable),
        "Steam" => None,
        "Transmission" => Some(Transmission),
        "Unknown" => None,
        "Waste Heat" => Some(Fossil),
        "Wind; Storage" => Some(Renewable),
        other => {
            return Err(EtlError::UnmappedResourceClass(other.to_string()));
        }
    };
    Ok(class)
}

/// Build the long-format mart from normalized source batches.
///
/// `state_permitting` maps state FIPS codes to the state's permitting
/// regime label. Ordinances join m:1 on county FIPS.
pub fn create_long_format(
    batches: &[SourceBatch],
    ordinances: &[OrdinanceRecord],
    state_permitting: &HashMap<String, String>,
    fips: &FipsTables,
) -> Result<Vec<LongFormatRow>> {
    let mut ordinance_by_county: HashMap<&str, &OrdinanceRecord> = HashMap::new();
    for ordinance in ordinances {
        if ordinance_by_county
            .insert(&ordinance.county_id_fips, ordinance)
            .is_some()
        {
            return Err(EtlError::DuplicateKey(format!(
                "multiple ordinance records for county {}",
                ordinance.county_id_fips
            )));
        }
    }

    let mut rows: Vec<LongFormatRow> = Vec::new();
    for batch in batches {
        let mut locations_by_project: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, loc) in batch.tables.locations.iter().enumerate() {
            locations_by_project
                .entry(loc.project_id)
                .or_default()
                .push(i);
        }

        for resource in &batch.tables.resource_capacity {
            let project = batch
                .tables
                .projects
                .iter()
                .find(|p| p.project_id == resource.project_id)
                .ok_or_else(|| {
                    EtlError::Validation(format!(
                        "resource row references unknown project {}",
                        resource.project_id
                    ))
                })?;
            let co2e = estimate_co2e_tonnes_per_year(&resource.resource_clean, resource.capacity_mw);

            let location_idx = locations_by_project
                .get(&project.project_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            // a project with no location data still gets one row, fully
            // allocated, with null FIPS codes
            let frac = if location_idx.is_empty() {
                1.0
            } else {
                1.0 / location_idx.len() as f64
            };
            let location_slots: Vec<Option<usize>> = if location_idx.is_empty() {
                vec![None]
            } else {
                location_idx.iter().copied().map(Some).collect()
            };

            for slot in location_slots {
                let location = slot.map(|i| &batch.tables.locations[i]);
                let state_id_fips = location.and_then(|l| l.state_id_fips.clone());
                let county_id_fips = location.and_then(|l| l.county_id_fips.clone());
                let state = state_id_fips
                    .as_deref()
                    .and_then(|code| fips.state_by_fips(code))
                    .map(|s| s.state_name.to_string());
                let county = county_id_fips
                    .as_deref()
                    .and_then(|code| fips.county(code))
                    .map(|c| c.county_name.clone());
                let ordinance = county_id_fips
                    .as_deref()
                    .and_then(|code| ordinance_by_county.get(code).copied());
                let ordinance_via_reldi = ordinance
                    .map(|o| o.ordinance_text.is_some())
                    .unwrap_or(false);
                let ordinance_is_restrictive = match ordinance {
                    Some(o) => o.ordinance_via_self_maintained.unwrap_or(
                        ordinance_via_reldi
                            || o.ordinance_via_solar_nrel.unwrap_or(false)
                            || o.ordinance_via_wind_nrel.unwrap_or(false),
                    ),
                    None => false,
                };

                rows.push(LongFormatRow {
                    surrogate_id: 0,
                    source: batch.source.clone(),
                    project_id: project.project_id,
                    queue_id: project.queue_id.clone(),
                    project_name: project.project_name.clone(),
                    developer: project.developer.clone(),
                    entity: project.entity.clone(),
                    utility: project.utility.clone(),
                    iso_region: project.region.clone(),
                    queue_status: project.queue_status.clone(),
                    interconnection_status: project.interconnection_status_lbnl.clone(),
                    point_of_interconnection: project.point_of_interconnection.clone(),
                    date_entered_queue: project.queue_date,
                    date_proposed_online: project.date_proposed,
                    is_actionable: project.is_actionable,
                    is_actionable_or_late_stage: project.is_actionable_or_late_stage,
                    state,
                    county,
                    state_permitting_type: state_id_fips
                        .as_deref()
                        .and_then(|code| state_permitting.get(code))
                        .cloned(),
                    state_id_fips,
                    county_id_fips,
                    frac_locations_in_county: frac,
                    resource_clean: resource.resource_clean.clone(),
                    capacity_mw: resource.capacity_mw,
                    resource_class: resource_class(&resource.resource_clean)?,
                    is_hybrid: false,
                    co2e_tonnes_per_year: co2e,
                    ordinance_via_reldi,
                    ordinance_is_restrictive,
                    ordinance_jurisdiction_name: ordinance
                        .and_then(|o| o.ordinance_jurisdiction_name.clone()),
                    ordinance_jurisdiction_type: ordinance
                        .and_then(|o| o.ordinance_jurisdiction_type.clone()),
                    ordinance_earliest_year_mentioned: ordinance
                        .and_then(|o| o.ordinance_earliest_year_mentioned),
                    ordinance_text: ordinance.and_then(|o| o.ordinance_text.clone()),
                });
            }
        }
    }

    mark_hybrids(&mut rows);
    check_primary_key(&rows)?;
    check_allocation(&rows)?;

    for (i, row) in rows.iter_mut().enumerate() {
        row.surrogate_id = i as i64;
    }
    info!(rows = rows.len(), "Built long-format projects mart");
    Ok(rows)
}

/// A project is hybrid when one location carries more than one resource
/// row (solar + storage, wind + storage, and so on).
fn mark_hybrids(rows: &mut [LongFormatRow]) {
    let mut counts: HashMap<(String, i64, Option<String>), usize> = HashMap::new();
    for row in rows.iter() {
        *counts
            .entry((
                row.source.clone(),
                row.project_id,
                row.county_id_fips.clone(),
            ))
            .or_insert(0) += 1;
    }
    for row in rows.iter_mut() {
        let key = (
            row.source.clone(),
            row.project_id,
            row.county_id_fips.clone(),
        );
        row.is_hybrid = counts[&key] > 1;
    }
}

fn check_primary_key(rows: &[LongFormatRow]) -> Result<()> {
    let mut seen: HashMap<(String, i64, Option<String>, String), ()> = HashMap::new();
    for row in rows {
        let key = (
            row.source.clone(),
            row.project_id,
            row.county_id_fips.clone(),
            row.resource_clean.clone(),
        );
        if seen.insert(key, ()).is_some() {
            return Err(EtlError::DuplicateKey(format!(
                "long format: ({}, {}, {:?}, {})",
                row.source, row.project_id, row.county_id_fips, row.resource_clean
            )));
        }
    }
    Ok(())
}

/// Allocation fractions for one (source, project, resource) must sum
/// to 1.0 over its locations.
fn check_allocation(rows: &[LongFormatRow]) -> Result<()> {
    let mut sums: HashMap<(String, i64, String), f64> = HashMap::new();
    for row in rows {
        *sums
            .entry((
                row.source.clone(),
                row.project_id,
                row.resource_clean.clone(),
            ))
            .or_insert(0.0) += row.frac_locations_in_county;
    }
    for ((_, project_id, _), sum) in sums {
        if (sum - 1.0).abs() > FRAC_ALLOCATION_TOLERANCE {
            return Err(EtlError::AllocationInvariant { project_id, sum });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        LocationRow, NormalizedQueueTables, ProjectRecord, ResourceCapacityRow,
    };
    use crate::fips::CountyRecord;

    fn fips() -> FipsTables {
        FipsTables::new(vec![
            CountyRecord {
                county_id_fips: "55025".to_string(),
                state_id_fips: "55".to_string(),
                county_name: "Dane".to_string(),
                county_name_long: "Dane County".to_string(),
            },
            CountyRecord {
                county_id_fips: "55105".to_string(),
                state_id_fips: "55".to_string(),
                county_name: "Rock".to_string(),
                county_name_long: "Rock County".to_string(),
            },
        ])
    }

    fn location(project_id: i64, county_fips: &str) -> LocationRow {
        LocationRow {
            project_id,
            state_id_fips: Some("55".to_string()),
            county_id_fips: Some(county_fips.to_string()),
            ..Default::default()
        }
    }

    fn resource(project_id: i64, clean: &str, mw: f64) -> ResourceCapacityRow {
        ResourceCapacityRow {
            project_id,
            resource: Some(clean.to_string()),
            capacity_mw: Some(mw),
            resource_clean: clean.to_string(),
        }
    }

    fn batch(tables: NormalizedQueueTables) -> SourceBatch {
        SourceBatch {
            source: "lbnl".to_string(),
            tables,
        }
    }

    fn hybrid_two_county_batch() -> SourceBatch {
        batch(NormalizedQueueTables {
            projects: vec![ProjectRecord {
                project_id: 1,
                queue_status: "active".to_string(),
                ..Default::default()
            }],
            locations: vec![location(1, "55025"), location(1, "55105")],
            resource_capacity: vec![
                resource(1, "Solar", 100.0),
                resource(1, "Battery Storage", 50.0),
            ],
        })
    }

    #[test]
    fn cross_product_with_fractional_allocation() {
        let rows = create_long_format(
            &[hybrid_two_county_batch()],
            &[],
            &HashMap::new(),
            &fips(),
        )
        .unwrap();
        // 2 resources x 2 locations
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| (r.frac_locations_in_county - 0.5).abs() < 1e-9));
        assert!(rows.iter().all(|r| r.is_hybrid));
        let surrogates: Vec<i64> = rows.iter().map(|r| r.surrogate_id).collect();
        assert_eq!(surrogates, vec![0, 1, 2, 3]);
    }

    #[test]
    fn missing_location_gets_full_allocation() {
        let b = batch(NormalizedQueueTables {
            projects: vec![ProjectRecord {
                project_id: 9,
                ..Default::default()
            }],
            locations: vec![],
            resource_capacity: vec![resource(9, "Onshore Wind", 200.0)],
        });
        let rows = create_long_format(&[b], &[], &HashMap::new(), &fips()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].frac_locations_in_county, 1.0);
        assert!(rows[0].county_id_fips.is_none());
        assert!(!rows[0].is_hybrid);
        assert_eq!(rows[0].resource_class, Some(ResourceClass::Renewable));
    }

    #[test]
    fn ordinance_join_and_derived_flags() {
        let ordinances = vec![OrdinanceRecord {
            county_id_fips: "55025".to_string(),
            ordinance_text: Some("wind setback 2000ft".to_string()),
            ordinance_jurisdiction_name: Some("Dane County".to_string()),
            ..Default::default()
        }];
        let rows = create_long_format(
            &[hybrid_two_county_batch()],
            &ordinances,
            &HashMap::new(),
            &fips(),
        )
        .unwrap();
        for row in &rows {
            let in_dane = row.county_id_fips.as_deref() == Some("55025");
            assert_eq!(row.ordinance_via_reldi, in_dane);
            assert_eq!(row.ordinance_is_restrictive, in_dane);
        }
    }

    #[test]
    fn self_maintained_flag_overrides_other_sources() {
        let ordinances = vec![OrdinanceRecord {
            county_id_fips: "55025".to_string(),
            ordinance_text: Some("repealed".to_string()),
            ordinance_via_self_maintained: Some(false),
            ..Default::default()
        }];
        let rows = create_long_format(
            &[hybrid_two_county_batch()],
            &ordinances,
            &HashMap::new(),
            &fips(),
        )
        .unwrap();
        let dane_row = rows
            .iter()
            .find(|r| r.county_id_fips.as_deref() == Some("55025"))
            .unwrap();
        assert!(dane_row.ordinance_via_reldi);
        assert!(!dane_row.ordinance_is_restrictive);
    }

    #[test]
    fn fossil_rows_get_co2e_estimates() {
        let b = batch(NormalizedQueueTables {
            projects: vec![ProjectRecord {
                project_id: 2,
                ..Default::default()
            }],
            locations: vec![location(2, "55025")],
            resource_capacity: vec![resource(2, "Natural Gas", 500.0)],
        });
        let rows = create_long_format(&[b], &[], &HashMap::new(), &fips()).unwrap();
        assert!(rows[0].co2e_tonnes_per_year > 0.0);
        assert_eq!(rows[0].resource_class, Some(ResourceClass::Fossil));
    }

    #[test]
    fn unmapped_resource_class_is_fatal() {
        let b = batch(NormalizedQueueTables {
            projects: vec![ProjectRecord {
                project_id: 3,
                ..Default::default()
            }],
            locations: vec![],
            resource_capacity: vec![resource(3, "Antimatter", 1.0)],
        });
        let err = create_long_format(&[b], &[], &HashMap::new(), &fips()).unwrap_err();
        assert!(matches!(err, EtlError::UnmappedResourceClass(name) if name == "Antimatter"));
    }

    #[test]
    fn duplicate_primary_key_is_fatal() {
        let b = batch(NormalizedQueueTables {
            projects: vec![ProjectRecord {
                project_id: 4,
                ..Default::default()
            }],
            locations: vec![location(4, "55025")],
            resource_capacity: vec![
                resource(4, "Solar", 10.0),
                resource(4, "Solar", 20.0),
            ],
        });
        let err = create_long_format(&[b], &[], &HashMap::new(), &fips()).unwrap_err();
        assert!(matches!(err, EtlError::DuplicateKey(_)));
    }

    #[test]
    fn state_permitting_type_joins_on_state_fips() {
        let mut permitting = HashMap::new();
        permitting.insert("55".to_string(), "local".to_string());
        let rows = create_long_format(
            &[hybrid_two_county_batch()],
            &[],
            &permitting,
            &fips(),
        )
        .unwrap();
        assert!(rows
            .iter()
            .all(|r| r.state_permitting_type.as_deref() == Some("local")));
        assert!(rows.iter().all(|r| r.state.as_deref() == Some("Wisconsin")));
    }
}
