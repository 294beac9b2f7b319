//! Queue deduplication.
//!
//! The same physical project appears multiple times in the raw queue
//! under slightly different point-of-interconnection spellings. Rows are
//! grouped by a fuzzy key built from a canonicalized POI string plus
//! exact-match fields, and within each group the row with the most
//! informative combined resource string survives.

use std::collections::HashMap;

use tracing::info;

use crate::domain::ActiveProject;
use crate::error::{EtlError, Result};

/// Substrings removed outright from the POI text before tokenizing.
const POI_NOISE: &[&str] = &["substation", "kv", "station", ","];

/// Canonicalize a point-of-interconnection string: lowercase, strip
/// noise words, drop standalone "at", map "tbd" to "nan" (so unknown
/// POIs compare equal to missing ones), then sort the remaining tokens
/// so word order does not matter.
pub fn normalize_poi(poi: Option<&str>) -> String {
    let mut text = match poi {
        Some(p) => p.to_lowercase(),
        None => "nan".to_string(),
    };
    for noise in POI_NOISE {
        text = text.replace(noise, "");
    }
    text = text.replace('-', " ");
    let mut tokens: Vec<&str> = text
        .split_whitespace()
        .filter(|t| *t != "at")
        .map(|t| if t == "tbd" { "nan" } else { t })
        .collect();
    tokens.sort_unstable();
    tokens.join(" ").trim().to_string()
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct DedupeKey {
    poi_clean: String,
    // f64 keyed by bit pattern; capacities compare exactly or not at all
    capacity_bits: Option<u64>,
    county: Option<String>,
    state: Option<String>,
    region: Option<String>,
    resource_type: Option<String>,
}

impl DedupeKey {
    fn of(project: &ActiveProject) -> Self {
        Self {
            poi_clean: normalize_poi(project.point_of_interconnection.as_deref()),
            capacity_bits: project.capacities_mw[0].map(f64::to_bits),
            county: project.counties[0].clone(),
            state: project.raw_state_name.clone(),
            region: project.region.clone(),
            resource_type: project.resource_types[0].clone(),
        }
    }
}

fn resource_text_len(project: &ActiveProject) -> i64 {
    project
        .resource_type_lbnl
        .as_ref()
        .map(|s| s.chars().count() as i64)
        .unwrap_or(-1)
}

/// Remove duplicate rows, keeping per group the first row whose combined
/// resource string is longest. Output is sorted by project id.
pub fn remove_duplicates(projects: Vec<ActiveProject>) -> Vec<ActiveProject> {
    let before = projects.len();
    let mut max_len: HashMap<DedupeKey, i64> = HashMap::new();
    for project in &projects {
        let len = resource_text_len(project);
        max_len
            .entry(DedupeKey::of(project))
            .and_modify(|m| *m = (*m).max(len))
            .or_insert(len);
    }

    let mut kept: HashMap<DedupeKey, ActiveProject> = HashMap::new();
    let mut order: Vec<DedupeKey> = Vec::new();
    for project in projects {
        let key = DedupeKey::of(&project);
        if resource_text_len(&project) < max_len[&key] {
            continue;
        }
        if !kept.contains_key(&key) {
            order.push(key.clone());
            kept.insert(key, project);
        }
    }

    let mut survivors: Vec<ActiveProject> = order
        .into_iter()
        .filter_map(|key| kept.remove(&key))
        .collect();
    survivors.sort_by_key(|p| p.project_id);
    info!(
        before,
        after = survivors.len(),
        "Removed duplicate queue rows"
    );
    survivors
}

/// A hand-maintained fix to one project's raw data, guarded by the
/// project name so a changed source vintage fails loudly instead of
/// corrupting an unrelated row.
#[derive(Debug, Clone)]
pub struct ManualResourceCorrection {
    pub project_name: &'static str,
    pub resource_type_1: &'static str,
}

/// Raw data lists "battery storage" twice for this coal retrofit.
pub const COLETO_CREEK_FIX: ManualResourceCorrection = ManualResourceCorrection {
    project_name: "Coleto Creek ESS Addition",
    resource_type_1: "Coal",
};

/// Apply a manual resource correction in place. Fails if no project
/// carries the expected name.
pub fn apply_manual_correction(
    projects: &mut [ActiveProject],
    fix: &ManualResourceCorrection,
) -> Result<()> {
    let target = projects
        .iter_mut()
        .find(|p| p.project_name.as_deref() == Some(fix.project_name))
        .ok_or_else(|| EtlError::StaleManualCorrection(fix.project_name.to_string()))?;
    target.resource_types[0] = Some(fix.resource_type_1.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(
        id: i64,
        poi: &str,
        capacity: Option<f64>,
        resource_type_lbnl: &str,
    ) -> ActiveProject {
        ActiveProject {
            project_id: id,
            point_of_interconnection: Some(poi.to_string()),
            capacities_mw: [capacity, None, None],
            counties: [Some("Ontario".to_string()), None, None],
            raw_state_name: Some("NY".to_string()),
            region: Some("NYISO".to_string()),
            resource_types: [Some("Solar".to_string()), None, None],
            resource_type_lbnl: Some(resource_type_lbnl.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn poi_normalization_canonicalizes_spellings() {
        assert_eq!(
            normalize_poi(Some("Flint Road Substation 115kV")),
            normalize_poi(Some("115 flint road"))
        );
        assert_eq!(normalize_poi(Some("TBD")), "nan");
        assert_eq!(normalize_poi(None), "nan");
        assert_eq!(
            normalize_poi(Some("Tap at Maple-Oak line")),
            normalize_poi(Some("Oak Maple line tap"))
        );
    }

    #[test]
    fn poi_strips_standalone_at_but_not_within_words() {
        assert_eq!(normalize_poi(Some("at Watkins")), "watkins");
    }

    #[test]
    fn keeps_row_with_longest_resource_text() {
        let survivors = remove_duplicates(vec![
            project(0, "Flint Road Substation", Some(100.0), "Solar"),
            project(1, "flint road", Some(100.0), "Solar; Battery Storage"),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].project_id, 1);
    }

    #[test]
    fn ties_keep_the_first_row() {
        let survivors = remove_duplicates(vec![
            project(0, "Flint Road", Some(100.0), "Solar"),
            project(1, "flint road", Some(100.0), "Solar"),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].project_id, 0);
    }

    #[test]
    fn different_capacity_is_a_different_project() {
        let survivors = remove_duplicates(vec![
            project(0, "Flint Road", Some(100.0), "Solar"),
            project(1, "Flint Road", Some(200.0), "Solar"),
        ]);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn output_is_sorted_by_project_id() {
        let survivors = remove_duplicates(vec![
            project(2, "B Road", Some(1.0), "Solar"),
            project(0, "A Road", Some(1.0), "Solar"),
            project(1, "C Road", Some(1.0), "Solar"),
        ]);
        let ids: Vec<i64> = survivors.iter().map(|p| p.project_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn manual_correction_requires_matching_name() {
        let mut projects = vec![ActiveProject {
            project_name: Some("Some Other Project".to_string()),
            ..Default::default()
        }];
        let err = apply_manual_correction(&mut projects, &COLETO_CREEK_FIX).unwrap_err();
        assert!(matches!(err, EtlError::StaleManualCorrection(_)));

        projects[0].project_name = Some("Coleto Creek ESS Addition".to_string());
        apply_manual_correction(&mut projects, &COLETO_CREEK_FIX).unwrap();
        assert_eq!(projects[0].resource_types[0].as_deref(), Some("Coal"));
    }
}
