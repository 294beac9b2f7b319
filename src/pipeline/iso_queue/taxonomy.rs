//! Canonical resource taxonomy and status harmonization.
//!
//! Every raw resource string in the queue must map to a canonical name.
//! An unmapped value is a fatal error so that new source vintages cannot
//! silently leak uncategorized resources into the mart.

use std::collections::HashMap;

use tracing::info;

use crate::domain::ResourceCapacityRow;
use crate::error::{EtlError, Result};

/// Broad fuel category of a canonical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Renewable,
    Fossil,
    UnknownResource,
}

struct ResourceEntry {
    clean_name: &'static str,
    codes: &'static [&'static str],
    resource_type: ResourceType,
}

/// Canonical resource names with the raw codes that map onto them.
/// Canonical names also map to themselves.
static RESOURCE_ENTRIES: &[ResourceEntry] = &[
    ResourceEntry {
        clean_name: "Battery Storage",
        codes: &["Battery", "Batteries", "BAT", "ES"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Biofuel",
        codes: &["Biogas"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Biomass",
        codes: &["Wood", "W", "BLQ WDS", "WDS"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Coal",
        codes: &["BIT", "C"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Combustion Turbine",
        codes: &["CT"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Fuel Cell",
        codes: &["Fuel Cell", "FC"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Geothermal",
        codes: &[],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Hydro",
        codes: &["WAT", "H", "Water"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Landfill Gas",
        codes: &["LFG", "L"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Municipal Solid Waste",
        codes: &["MSW"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Natural Gas",
        codes: &[
            "NG",
            "Methane",
            "CT-NG",
            "CC",
            "CC-NG",
            "ST-NG",
            "CS-NG",
            "Combined Cycle",
            "Gas",
            "Natural Gas; Other",
            "DFO KER NG",
            "DFO NG",
            "Diesel; Methane",
            "JF KER NG",
            "NG WO",
            "KER NG",
            "Natural Gas; Diesel; Other; Storage",
            "Natural Gas; Oil",
        ],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Nuclear",
        codes: &["NU", "NUC"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Offshore Wind",
        codes: &[],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Oil",
        codes: &["DFO", "Diesel", "CT-D", "CC-D", "JF", "KER", "DFO KER", "D"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Onshore Wind",
        codes: &["Wind", "WND", "Wind Turbine"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Other",
        codes: &[],
        resource_type: ResourceType::UnknownResource,
    },
    ResourceEntry {
        clean_name: "Unknown",
        codes: &["Wo", "F", "Hybrid", "M"],
        resource_type: ResourceType::UnknownResource,
    },
    ResourceEntry {
        clean_name: "Other Storage",
        codes: &["Flywheel", "Storage", "CAES", "Gravity Rail", "Hydrogen"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Pumped Storage",
        codes: &["Pump Storage", "Pumped-Storage hydro", "PS"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Solar",
        codes: &["SUN", "S"],
        resource_type: ResourceType::Renewable,
    },
    ResourceEntry {
        clean_name: "Steam",
        codes: &["ST"],
        resource_type: ResourceType::Fossil,
    },
    ResourceEntry {
        clean_name: "Waste Heat",
        codes: &["Waste Heat Recovery", "Heat Recovery", "Co-Gen"],
        resource_type: ResourceType::Fossil,
    },
];

/// Lookup from raw resource strings to canonical names.
pub struct ResourceTaxonomy {
    by_raw: HashMap<&'static str, &'static str>,
    type_by_clean: HashMap<&'static str, ResourceType>,
}

impl Default for ResourceTaxonomy {
    fn default() -> Self {
        let mut by_raw = HashMap::new();
        let mut type_by_clean = HashMap::new();
        for entry in RESOURCE_ENTRIES {
            by_raw.insert(entry.clean_name, entry.clean_name);
            for code in entry.codes {
                by_raw.insert(*code, entry.clean_name);
            }
            type_by_clean.insert(entry.clean_name, entry.resource_type);
        }
        Self {
            by_raw,
            type_by_clean,
        }
    }
}

impl ResourceTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a raw resource string to its canonical name. Missing values
    /// become "Unknown"; an unrecognized non-missing value is `None`.
    pub fn canonical(&self, raw: Option<&str>) -> Option<&'static str> {
        match raw {
            None => Some("Unknown"),
            Some(raw) => self.by_raw.get(raw).copied(),
        }
    }

    pub fn resource_type(&self, clean_name: &str) -> Option<ResourceType> {
        self.type_by_clean.get(clean_name).copied()
    }

    /// Fill `resource_clean` on every row. Fails with the full list of
    /// unmapped raw values if any raw resource is unrecognized.
    pub fn clean_resource_types(&self, rows: &mut [ResourceCapacityRow]) -> Result<()> {
        let mut unmapped: Vec<String> = Vec::new();
        for row in rows.iter_mut() {
            match self.canonical(row.resource.as_deref()) {
                Some(clean) => row.resource_clean = clean.to_string(),
                None => {
                    if let Some(raw) = &row.resource {
                        if !unmapped.contains(raw) {
                            unmapped.push(raw.clone());
                        }
                    }
                }
            }
        }
        if !unmapped.is_empty() {
            return Err(EtlError::UnmappedResource(unmapped));
        }
        info!(rows = rows.len(), "Standardized resource types");
        Ok(())
    }
}

/// Collapse known spelling variants of interconnection statuses.
pub fn harmonize_interconnection_status(status: &str) -> &str {
    match status {
        "Feasability Study" => "Feasibility Study",
        "Facilities Study" => "Facility Study",
        "IA in Progress" => "In Progress (unknown study)",
        other => other,
    }
}
