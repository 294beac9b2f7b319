//! Source-specific transforms that turn raw extracts into normalized
//! tables keyed by project id.

pub mod ballot_ready;
pub mod dates;
pub mod iso_queue;
