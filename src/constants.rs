//! Shared constants used across the pipeline and data mart layers.

/// Most recent vintage year of the LBNL queue data. A project only counts
/// toward the actionable/late-stage flags if its proposed (or queue-entry)
/// year is at least this.
pub const ACTIONABLE_CUTOFF_YEAR: i32 = 2022;

/// Floating tolerance when checking that a project's location allocation
/// fractions sum to 1.0.
pub const FRAC_ALLOCATION_TOLERANCE: f64 = 1e-6;

/// Source labels used in the data mart's (source, project_id) keys.
pub const LBNL_SOURCE: &str = "lbnl";
pub const GRIDSTATUS_SOURCE: &str = "gridstatus";

/// Parsed dates landing in these years are NaN values improperly encoded
/// by Excel and are treated as missing.
pub const EXCEL_SENTINEL_YEARS: [i32; 2] = [1899, 1900];

/// Default country code for geocoding requests.
pub const DEFAULT_GEOCODE_COUNTRY: &str = "US";
