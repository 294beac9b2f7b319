//! Fan-out of positional one-to-many columns into child tables.
//!
//! The raw queue is spreadsheet-shaped: up to three (resource, capacity)
//! pairs and up to three counties per row. This splits them into proper
//! child tables keyed by project id. A populated third resource slot is
//! rejected here, at the boundary, because the wide-format mart can only
//! represent two generation types per project.

use tracing::info;

use crate::domain::{
    ActiveProject, LocationRow, NormalizedQueueTables, ProjectRecord, ResourceCapacityRow,
};
use crate::error::{EtlError, Result};

/// Split active projects into scalar, location and resource tables.
pub fn normalize_queue(projects: Vec<ActiveProject>) -> Result<NormalizedQueueTables> {
    let mut tables = NormalizedQueueTables::default();

    for project in &projects {
        if project.resource_types[2].is_some() || project.capacities_mw[2].is_some() {
            return Err(EtlError::CardinalityViolation(format!(
                "project {} has a third resource slot populated; only two generation \
                 types per project are representable",
                project.project_id
            )));
        }

        for slot in 0..2 {
            let resource = project.resource_types[slot].clone();
            let capacity_mw = project.capacities_mw[slot];
            if resource.is_none() && capacity_mw.is_none() {
                continue;
            }
            tables.resource_capacity.push(ResourceCapacityRow {
                project_id: project.project_id,
                resource,
                capacity_mw,
                resource_clean: String::new(),
            });
        }

        for county in project.counties.iter().flatten() {
            tables.locations.push(LocationRow {
                project_id: project.project_id,
                raw_county_name: Some(county.clone()),
                raw_state_name: project.raw_state_name.clone(),
                ..Default::default()
            });
        }

        tables.projects.push(ProjectRecord {
            project_id: project.project_id,
            queue_id: project.queue_id.clone(),
            project_name: project.project_name.clone(),
            developer: project.developer.clone(),
            entity: project.entity.clone(),
            utility: project.utility.clone(),
            region: project.region.clone(),
            queue_status: project.queue_status.clone(),
            interconnection_status_lbnl: project.interconnection_status_lbnl.clone(),
            queue_date: project.queue_date,
            date_proposed: project.date_proposed,
            point_of_interconnection: project.point_of_interconnection.clone(),
            resource_type_lbnl: project.resource_type_lbnl.clone(),
            is_actionable: project.is_actionable,
            is_actionable_or_late_stage: project.is_actionable_or_late_stage,
        });
    }

    info!(
        projects = tables.projects.len(),
        locations = tables.locations.len(),
        resources = tables.resource_capacity.len(),
        "Normalized queue into child tables"
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_slots(
        id: i64,
        resources: [Option<&str>; 3],
        capacities: [Option<f64>; 3],
        counties: [Option<&str>; 3],
    ) -> ActiveProject {
        ActiveProject {
            project_id: id,
            resource_types: resources.map(|r| r.map(str::to_string)),
            capacities_mw: capacities,
            counties: counties.map(|c| c.map(str::to_string)),
            raw_state_name: Some("NY".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn splits_resources_and_counties_into_rows() {
        let tables = normalize_queue(vec![project_with_slots(
            7,
            [Some("Solar"), Some("Battery"), None],
            [Some(100.0), Some(50.0), None],
            [Some("Ontario"), Some("Seneca"), None],
        )])
        .unwrap();
        assert_eq!(tables.projects.len(), 1);
        assert_eq!(tables.resource_capacity.len(), 2);
        assert_eq!(tables.locations.len(), 2);
        assert!(tables
            .resource_capacity
            .iter()
            .all(|r| r.project_id == 7));
        assert_eq!(tables.locations[1].raw_county_name.as_deref(), Some("Seneca"));
        assert_eq!(tables.locations[1].raw_state_name.as_deref(), Some("NY"));
    }

    #[test]
    fn empty_slots_produce_no_rows() {
        let tables = normalize_queue(vec![project_with_slots(
            0,
            [Some("Solar"), None, None],
            [Some(100.0), None, None],
            [None, None, None],
        )])
        .unwrap();
        assert_eq!(tables.resource_capacity.len(), 1);
        assert!(tables.locations.is_empty());
    }

    #[test]
    fn capacity_without_type_still_fans_out() {
        let tables = normalize_queue(vec![project_with_slots(
            0,
            [None, None, None],
            [Some(100.0), None, None],
            [None, None, None],
        )])
        .unwrap();
        assert_eq!(tables.resource_capacity.len(), 1);
        assert!(tables.resource_capacity[0].resource.is_none());
    }

    #[test]
    fn populated_third_slot_is_fatal() {
        let err = normalize_queue(vec![project_with_slots(
            3,
            [Some("Solar"), Some("Battery"), Some("Wind")],
            [Some(1.0), Some(2.0), Some(3.0)],
            [None, None, None],
        )])
        .unwrap_err();
        assert!(matches!(err, EtlError::CardinalityViolation(_)));
    }
}
