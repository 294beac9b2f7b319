use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeocoderConfig {
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_retries: 3,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

/// Read the Google geocoding API key from the environment (.env supported).
pub fn geocoder_api_key() -> Result<String> {
    dotenv::dotenv().ok();
    Ok(std::env::var("GOOGLE_GEOCODER_API_KEY")?)
}
