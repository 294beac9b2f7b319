//! CO2e estimates for proposed fossil power.
//!
//! Proposed plants have no measured emissions, so the estimate is
//! capacity times an assumed capacity factor times a fleet-average
//! emission rate for the fuel. Non-combustion resources estimate zero.

const HOURS_PER_YEAR: f64 = 8766.0;

/// (canonical resource, assumed capacity factor, tonnes CO2e per MWh).
/// Capacity factors are recent fleet averages for proposed plants of
/// each type; emission rates are generator-level fleet averages.
static EMISSION_FACTORS: &[(&str, f64, f64)] = &[
    ("Natural Gas", 0.44, 0.41),
    ("Combustion Turbine", 0.12, 0.55),
    ("Coal", 0.53, 0.95),
    ("Oil", 0.11, 0.73),
    ("Landfill Gas", 0.68, 0.52),
    ("Municipal Solid Waste", 0.60, 1.04),
    ("Steam", 0.44, 0.41),
    ("Waste Heat", 0.44, 0.41),
    ("Fuel Cell", 0.44, 0.41),
];

/// Estimated CO2e in tonnes per year for one (resource, capacity) pair.
/// Resources without an emission factor, and rows with no capacity,
/// estimate 0.0.
pub fn estimate_co2e_tonnes_per_year(resource_clean: &str, capacity_mw: Option<f64>) -> f64 {
    let capacity = match capacity_mw {
        Some(mw) if mw > 0.0 => mw,
        _ => return 0.0,
    };
    EMISSION_FACTORS
        .iter()
        .find(|(resource, _, _)| *resource == resource_clean)
        .map(|(_, capacity_factor, tonnes_per_mwh)| {
            capacity * HOURS_PER_YEAR * capacity_factor * tonnes_per_mwh
        })
        .unwrap_or(0.0)
}
