//! Data mart assembly: published project tables in long and wide format.

pub mod emissions;
pub mod projects_long;
pub mod projects_wide;

pub use projects_long::create_long_format;
pub use projects_wide::create_wide_format;
