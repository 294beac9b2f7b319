use thiserror::Error;

/// Fatal conditions that abort a batch run. The pipeline has no
/// partial-success mode: any of these halts the run before outputs
/// are shipped.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Unmapped resource type(s): {0:?}")]
    UnmappedResource(Vec<String>),

    #[error("Unmapped resource class for resource_clean value: {0}")]
    UnmappedResourceClass(String),

    #[error("Uncategorized region/interconnection-status combination(s): {0:?}")]
    UnmappedRegionStatus(Vec<(String, String)>),

    #[error("Cardinality violation: {0}")]
    CardinalityViolation(String),

    #[error("Manual correction is misidentified: {0}")]
    StaleManualCorrection(String),

    #[error("Duplicate key(s) found: {0}")]
    DuplicateKey(String),

    #[error("Row count mismatch: expected {expected}, got {actual} ({context})")]
    RowCountMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },

    #[error("Location allocation fractions for project {project_id} sum to {sum}, expected 1.0")]
    AllocationInvariant { project_id: i64, sum: f64 },

    #[error("No geocode response set. Call set_response() first.")]
    GeocoderNotReady,

    #[error("Geocoding failed: {0}")]
    Geocode(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
