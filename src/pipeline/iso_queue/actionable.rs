//! Actionable / late-stage project classification.
//!
//! Whether a queue position is worth acting on depends on which
//! interconnection study stage it has reached, and the meaning of each
//! stage differs by region. The inclusion rules were defined row by row
//! by an analyst; a (region, status) pair missing from the table is a
//! fatal error, not a default.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::constants::ACTIONABLE_CUTOFF_YEAR;
use crate::domain::ActiveProject;
use crate::error::{EtlError, Result};

/// (region, interconnection status, include_actionable, include_projected)
static REGION_STATUS_RULES: &[(&str, &str, bool, bool)] = &[
    ("CAISO", "Feasibility Study", false, false),
    ("CAISO", "Operational", false, true),
    ("CAISO", "System Impact Study", true, false),
    ("CAISO", "IA Executed", false, true),
    ("CAISO", "Facility Study", false, false),
    ("ERCOT", "IA Executed", false, true),
    ("ERCOT", "Facility Study", false, false),
    ("ERCOT", "System Impact Study", true, true),
    ("ISO-NE", "In Progress (unknown study)", false, false),
    ("ISO-NE", "Operational", false, true),
    ("ISO-NE", "IA Executed", false, true),
    ("ISO-NE", "System Impact Study", true, true),
    ("ISO-NE", "Not Started", false, false),
    ("ISO-NE", "Feasibility Study", false, false),
    ("ISO-NE", "Facility Study", false, false),
    ("MISO", "IA Executed", false, true),
    ("MISO", "In Progress (unknown study)", false, false),
    ("MISO", "Facility Study", false, false),
    ("MISO", "Operational", false, true),
    ("MISO", "System Impact Study", true, true),
    ("MISO", "Withdrawn", false, false),
    ("MISO", "Feasibility Study", false, false),
    ("MISO", "Not Started", false, false),
    ("NYISO", "Withdrawn", false, false),
    ("NYISO", "In Progress (unknown study)", false, false),
    ("NYISO", "Facility Study", false, true),
    ("NYISO", "System Impact Study", true, true),
    ("NYISO", "Operational", false, true),
    ("NYISO", "Feasibility Study", false, false),
    ("PJM", "Feasibility Study", false, false),
    ("PJM", "Facility Study", false, true),
    ("PJM", "System Impact Study", true, true),
    ("PJM", "Withdrawn", false, false),
    ("PJM", "IA Executed", false, true),
    ("PJM", "In Progress (unknown study)", false, false),
    ("Southeast (non-ISO)", "Withdrawn", false, false),
    ("Southeast (non-ISO)", "IA Executed", false, true),
    ("Southeast (non-ISO)", "Facilities Study", false, true),
    ("Southeast (non-ISO)", "System Impact Study", true, true),
    ("Southeast (non-ISO)", "In Progress (unknown study)", false, false),
    ("Southeast (non-ISO)", "Feasibility Study", false, false),
    ("Southeast (non-ISO)", "Facility Study", false, true),
    ("Southeast (non-ISO)", "Suspended", false, false),
    ("Southeast (non-ISO)", "Not Started", false, false),
    ("Southeast (non-ISO)", "Operational", false, false),
    ("Southeast (non-ISO)", "Construction", false, true),
    ("Southeast (non-ISO)", "Feasibility", false, false),
    ("SPP", "System Impact Study", true, true),
    ("SPP", "Operational", false, true),
    ("SPP", "IA Executed", false, true),
    ("SPP", "Facility Study", false, true),
    ("SPP", "In Progress (unknown study)", false, false),
    ("SPP", "Suspended", false, false),
    ("West (non-ISO)", "System Impact Study", true, true),
    ("West (non-ISO)", "Suspended", false, false),
    ("West (non-ISO)", "Facility Study", false, true),
    ("West (non-ISO)", "IA Executed", false, true),
    ("West (non-ISO)", "Withdrawn", false, false),
    ("West (non-ISO)", "Feasibility Study", false, false),
    ("West (non-ISO)", "In Progress (unknown study)", false, false),
    ("West (non-ISO)", "Operational", false, true),
    ("West (non-ISO)", "Cluster Study", false, false),
    ("West (non-ISO)", "Feasability Study", false, false),
    ("West (non-ISO)", "Not Started", false, false),
    ("West (non-ISO)", "IA in Progress", false, true),
    ("West (non-ISO)", "Phase 4 Study", true, true),
    ("West (non-ISO)", "IA Pending", false, true),
    ("West (non-ISO)", "Combined", false, false),
    ("West (non-ISO)", "Withdrawn, Feasibility Study", false, false),
    ("West (non-ISO)", "Construction", false, false),
    ("West (non-ISO)", "Unknown", false, false),
];

#[derive(Debug, Clone, Copy)]
struct Inclusion {
    actionable: bool,
    projected: bool,
}

/// Analyst-defined inclusion rules keyed by (region, status).
pub struct RegionStatusRules {
    rules: HashMap<(&'static str, &'static str), Inclusion>,
}

impl Default for RegionStatusRules {
    fn default() -> Self {
        let rules = REGION_STATUS_RULES
            .iter()
            .map(|(region, status, actionable, projected)| {
                (
                    (*region, *status),
                    Inclusion {
                        actionable: *actionable,
                        projected: *projected,
                    },
                )
            })
            .collect();
        Self { rules }
    }
}

impl RegionStatusRules {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, region: Option<&str>, status: Option<&str>) -> Option<Inclusion> {
        let region = region?;
        let status = status?;
        self.rules.get(&(region, status)).copied()
    }

    /// Set the actionable / late-stage flags on every project. A project
    /// only qualifies if its proposed year (falling back to queue-entry
    /// year) is at least the cutoff. Fails with the full list of
    /// uncategorized (region, status) combinations.
    pub fn classify(&self, projects: &mut [ActiveProject]) -> Result<()> {
        let mut uncategorized: HashSet<(String, String)> = HashSet::new();
        for project in projects.iter_mut() {
            let inclusion = match self.lookup(
                project.region.as_deref(),
                project.interconnection_status_lbnl.as_deref(),
            ) {
                Some(inclusion) => inclusion,
                None => {
                    uncategorized.insert((
                        project.region.clone().unwrap_or_default(),
                        project
                            .interconnection_status_lbnl
                            .clone()
                            .unwrap_or_default(),
                    ));
                    continue;
                }
            };
            let year_qualifies = project
                .year_proposed()
                .or_else(|| project.queue_year())
                .map(|y| y >= ACTIONABLE_CUTOFF_YEAR)
                .unwrap_or(false);
            project.is_actionable = inclusion.actionable && year_qualifies;
            project.is_actionable_or_late_stage = inclusion.projected && year_qualifies;
        }
        if !uncategorized.is_empty() {
            let mut combos: Vec<(String, String)> = uncategorized.into_iter().collect();
            combos.sort();
            return Err(EtlError::UnmappedRegionStatus(combos));
        }
        let actionable = projects.iter().filter(|p| p.is_actionable).count();
        info!(
            total = projects.len(),
            actionable, "Classified project actionability"
        );
        Ok(())
    }
}
