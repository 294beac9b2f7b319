pub mod config;
pub mod constants;
pub mod data_mart;
pub mod domain;
pub mod error;
pub mod fips;
pub mod geocoding;
pub mod logging;
pub mod pipeline;
