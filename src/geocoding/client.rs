//! Geocoding HTTP client and memoizing wrapper.
//!
//! Raw county names repeat heavily across the queue, so every lookup
//! goes through [`CachingGeocoder`], which memoizes both hits and
//! misses for the lifetime of the batch.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GeocoderConfig;
use crate::error::{EtlError, Result};

use super::GeocodeResponse;

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Seam for geocoding lookups. Tests substitute a canned client; the
/// production path is [`HttpGeocodeClient`].
pub trait GeocodeClient {
    /// Look up a place name within a state and country. `Ok(None)` means
    /// the service answered but found nothing.
    fn geocode(&self, name: &str, state: &str, country: &str) -> Result<Option<GeocodeResponse>>;
}

#[derive(Debug, Deserialize)]
struct GeocodeApiBody {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResponse>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Blocking client for the Google Maps geocoding API.
pub struct HttpGeocodeClient {
    http: reqwest::blocking::Client,
    api_key: String,
    max_retries: u32,
}

impl HttpGeocodeClient {
    pub fn new(api_key: String, config: &GeocoderConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn request(&self, address: &str, country: &str) -> Result<GeocodeApiBody> {
        let mut delay = Duration::from_secs(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .http
                .get(GEOCODE_ENDPOINT)
                .query(&[
                    ("address", address),
                    ("components", &format!("country:{country}")),
                    ("key", &self.api_key),
                ])
                .send()
                .and_then(|resp| resp.error_for_status())
                .and_then(|resp| resp.json::<GeocodeApiBody>());
            match result {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.max_retries => {
                    warn!(
                        attempt,
                        error = %e,
                        "Geocode request failed, retrying"
                    );
                    std::thread::sleep(delay);
                    delay *= 2;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl GeocodeClient for HttpGeocodeClient {
    fn geocode(&self, name: &str, state: &str, country: &str) -> Result<Option<GeocodeResponse>> {
        let address = format!("{name}, {state}");
        let body = self.request(&address, country)?;
        match body.status.as_str() {
            "OK" => Ok(body.results.into_iter().next()),
            "ZERO_RESULTS" => {
                debug!(address, "Geocoder found no results");
                Ok(None)
            }
            status => Err(EtlError::Geocode(format!(
                "geocode of '{address}' returned status {status}: {}",
                body.error_message.unwrap_or_default()
            ))),
        }
    }
}

/// Memoizing wrapper around any [`GeocodeClient`]. Misses are cached too,
/// so a name the service cannot resolve is only queried once per batch.
pub struct CachingGeocoder<C: GeocodeClient> {
    inner: C,
    cache: std::cell::RefCell<HashMap<(String, String, String), Option<GeocodeResponse>>>,
}

impl<C: GeocodeClient> CachingGeocoder<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: std::cell::RefCell::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

impl<C: GeocodeClient> GeocodeClient for CachingGeocoder<C> {
    fn geocode(&self, name: &str, state: &str, country: &str) -> Result<Option<GeocodeResponse>> {
        let key = (name.to_string(), state.to_string(), country.to_string());
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let fresh = self.inner.geocode(name, state, country)?;
        self.cache.borrow_mut().insert(key, fresh.clone());
        Ok(fresh)
    }
}
