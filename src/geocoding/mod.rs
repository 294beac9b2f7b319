//! Geocoding result parsing.
//!
//! A geocode response is a flat list of address components, each tagged
//! with administrative-level types. The parser disambiguates what kind of
//! place the query actually resolved to (city, township, county,
//! independent city) and extracts the containing county.

pub mod client;

pub use client::{CachingGeocoder, GeocodeClient, HttpGeocodeClient};

use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

const LOCALITY: &str = "locality";
const TOWNSHIP: &str = "administrative_area_level_3";
const COUNTY: &str = "administrative_area_level_2";

/// One address component from the geocoding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    pub types: Vec<String>,
}

/// A single geocoding result: the component list plus the top-level type
/// tags describing what kind of feature the result itself is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl GeocodeResponse {
    fn component(&self, type_tag: &str) -> Option<&AddressComponent> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == type_tag))
    }
}

/// Administrative level the query resolved to. Towns, townships and
/// independent cities all count as "city"; only a direct county match
/// (e.g. the query already said "X County") is "county".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminType {
    City,
    County,
}

impl AdminType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminType::City => "city",
            AdminType::County => "county",
        }
    }
}

/// The parsed outcome of one geocoding query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodedPlace {
    pub locality_name: String,
    pub containing_county: String,
    pub admin_type: AdminType,
}

/// Parser over one geocode response.
///
/// Constructing the parser with no response is valid (idle state), but
/// accessing any derived property before a response has been set fails
/// with [`EtlError::GeocoderNotReady`] rather than returning null or
/// stale data.
#[derive(Debug, Clone, Default)]
pub struct GeocodeParser {
    response: Option<GeocodeResponse>,
}

impl GeocodeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(response: GeocodeResponse) -> Self {
        Self {
            response: Some(response),
        }
    }

    pub fn set_response(&mut self, response: GeocodeResponse) {
        self.response = Some(response);
    }

    pub fn clear(&mut self) {
        self.response = None;
    }

    fn response(&self) -> Result<&GeocodeResponse> {
        self.response.as_ref().ok_or(EtlError::GeocoderNotReady)
    }

    /// The component that names the queried place, with its level.
    ///
    /// When the result itself is a locality, the locality component is the
    /// place. Otherwise (street addresses of town halls, county-level
    /// results) the locality component is merely the nearest town, so the
    /// most specific administrative-area component wins instead.
    fn resolved(&self) -> Result<(&AddressComponent, AdminType)> {
        let resp = self.response()?;
        if resp.types.iter().any(|t| t == LOCALITY) {
            if let Some(c) = resp.component(LOCALITY) {
                return Ok((c, AdminType::City));
            }
        }
        if let Some(c) = resp.component(TOWNSHIP) {
            return Ok((c, AdminType::City));
        }
        if let Some(c) = resp.component(COUNTY) {
            return Ok((c, AdminType::County));
        }
        if let Some(c) = resp.component(LOCALITY) {
            return Ok((c, AdminType::City));
        }
        Err(EtlError::Geocode(
            "no locality or administrative-area component in response".to_string(),
        ))
    }

    /// Canonical name of the place the query resolved to.
    pub fn locality_name(&self) -> Result<String> {
        Ok(self.resolved()?.0.long_name.clone())
    }

    /// "city" or "county".
    pub fn admin_type(&self) -> Result<AdminType> {
        Ok(self.resolved()?.1)
    }

    /// The containing county's long name. Independent cities (e.g.
    /// Virginia cities) have no county in the hierarchy; there the
    /// county-equivalent is the locality itself.
    pub fn containing_county(&self) -> Result<String> {
        let (place, _) = self.resolved()?;
        match self.response()?.component(COUNTY) {
            Some(county) => Ok(county.long_name.clone()),
            None => Ok(place.long_name.clone()),
        }
    }

    /// All three derived properties at once.
    pub fn place(&self) -> Result<GeocodedPlace> {
        Ok(GeocodedPlace {
            locality_name: self.locality_name()?,
            containing_county: self.containing_county()?,
            admin_type: self.admin_type()?,
        })
    }
}
