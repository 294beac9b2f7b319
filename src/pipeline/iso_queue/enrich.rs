//! Location enrichment: county FIPS assignment with geocoder backup.
//!
//! Raw county names are messy (typos, multi-county strings, independent
//! cities, township names). Resolution order per location row:
//!   1. hand-maintained (county, state) corrections
//!   2. direct lookup in the census FIPS tables
//!   3. geocoder query, taking the containing county of the result
//!   4. "City of X" -> "X city" rewrite for independent cities
//! Rows that survive all four stages keep null FIPS codes; downstream
//! joins treat them as location-unknown rather than dropping them.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::constants::DEFAULT_GEOCODE_COUNTRY;
use crate::domain::LocationRow;
use crate::error::Result;
use crate::fips::FipsTables;
use crate::geocoding::{GeocodeClient, GeocodeParser, GeocodedPlace};

/// (raw county, raw state) -> (corrected county, corrected state),
/// all lowercase. Collected from source vintages by hand; mostly
/// wrong-state assignments and multi-county strings.
static COUNTY_STATE_FIXES: &[(&str, &str, &str, &str)] = &[
    ("skamania", "or", "skamania", "wa"),
    ("coos & curry", "or", "coos", "or"),
    ("coos & curry", "", "coos", "or"),
    ("lake", "or", "lake county", "or"),
    ("franklin-clinton", "ny", "franklin", "ny"),
    ("san juan", "az", "san juan", "nm"),
    ("hidalgo", "co", "hidalgo", "nm"),
    ("coconino", "co", "coconino", "az"),
    ("antelope & wheeler", "ne", "antelope", "ne"),
    ("linden", "ny", "union", "nj"),
    ("church", "nv", "churchill", "nv"),
    ("churchill/pershing", "ca", "churchill", "nv"),
    ("shasta/trinity", "ca", "shasta", "ca"),
    ("san benito", "nv", "san benito", "ca"),
    ("frqanklin", "me", "franklin", "me"),
    ("logan,menard", "il", "logan", "il"),
    ("clarke", "in", "clark", "il"),
    ("lincoln", "co", "lincoln county", "co"),
    ("new york-nj", "ny", "new york", "ny"),
    ("peneobscot/washington", "me", "penobscot", "me"),
    ("bedford", "va", "bedford county", "va"),
];

static INDEPENDENT_CITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^city of (.+)").unwrap());

fn apply_manual_fixes(county: &str, state: &str) -> (String, String) {
    for (raw_county, raw_state, clean_county, clean_state) in COUNTY_STATE_FIXES {
        if county == *raw_county && state == *raw_state {
            return (clean_county.to_string(), clean_state.to_string());
        }
    }
    (county.to_string(), state.to_string())
}

/// Fill FIPS codes and geocoder columns on every location row in place.
/// Raw county and state names are preserved as-is; all matching happens
/// on lowercase working copies.
pub fn add_county_fips(
    locations: &mut [LocationRow],
    fips: &FipsTables,
    geocoder: &dyn GeocodeClient,
) -> Result<()> {
    // geocode results memoized per (county, state) query within the batch
    let mut geocoded: HashMap<(String, String), Option<GeocodedPlace>> = HashMap::new();
    let mut resolved_direct = 0usize;
    let mut resolved_geocoded = 0usize;
    let mut unresolved = 0usize;

    for row in locations.iter_mut() {
        let raw_county = row
            .raw_county_name
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let raw_state = row
            .raw_state_name
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let (county, state) = apply_manual_fixes(&raw_county, &raw_state);

        let state_info = fips.state(&state);
        row.state_id_fips = state_info.map(|s| s.state_id_fips.to_string());
        let state_fips = match state_info {
            Some(info) => info.state_id_fips,
            None => {
                unresolved += 1;
                continue;
            }
        };

        if county.is_empty() {
            unresolved += 1;
            continue;
        }

        if let Some(code) = fips.county_fips(state_fips, &county) {
            row.county_id_fips = Some(code.to_string());
            if let Some(record) = fips.county(code) {
                row.geocoded_locality_name = Some(record.county_name.clone());
                row.geocoded_locality_type = Some("county".to_string());
                row.geocoded_containing_county = Some(record.county_name.clone());
            }
            resolved_direct += 1;
            continue;
        }

        // backup geocoding
        let key = (county.clone(), state.clone());
        let place = match geocoded.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let response =
                    geocoder.geocode(&county, state_info.map(|s| s.state_abbrev).unwrap_or(""), DEFAULT_GEOCODE_COUNTRY)?;
                let place = match response {
                    Some(resp) => match GeocodeParser::with_response(resp).place() {
                        Ok(place) => Some(place),
                        Err(e) => {
                            debug!(county, state, error = %e, "Unparseable geocode result");
                            None
                        }
                    },
                    None => None,
                };
                geocoded.insert(key, place.clone());
                place
            }
        };

        if let Some(place) = place {
            row.geocoded_locality_name = Some(place.locality_name.clone());
            row.geocoded_locality_type = Some(place.admin_type.as_str().to_string());
            row.geocoded_containing_county = Some(place.containing_county.clone());
            row.county_id_fips = fips
                .county_fips(state_fips, &place.containing_county)
                .map(str::to_string);
        }

        // independent cities arrive as "City of Norfolk"; the census
        // spells them "Norfolk city"
        if row.county_id_fips.is_none() {
            if let Some(caps) = INDEPENDENT_CITY_RE.captures(&county) {
                let city_form = format!("{} city", &caps[1]);
                row.county_id_fips = fips
                    .county_fips(state_fips, &city_form)
                    .map(str::to_string);
            }
        }

        if row.county_id_fips.is_some() {
            resolved_geocoded += 1;
        } else {
            warn!(
                county = row.raw_county_name.as_deref().unwrap_or(""),
                state = row.raw_state_name.as_deref().unwrap_or(""),
                "Could not resolve county FIPS"
            );
            unresolved += 1;
        }
    }

    info!(
        resolved_direct,
        resolved_geocoded, unresolved, "Assigned county FIPS codes"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fips::CountyRecord;
    use crate::geocoding::{AddressComponent, GeocodeResponse};

    struct CannedGeocoder;

    impl GeocodeClient for CannedGeocoder {
        fn geocode(
            &self,
            name: &str,
            _state: &str,
            _country: &str,
        ) -> Result<Option<GeocodeResponse>> {
            if name != "westport" {
                return Ok(None);
            }
            Ok(Some(GeocodeResponse {
                address_components: vec![
                    AddressComponent {
                        long_name: "Westport".to_string(),
                        short_name: "Westport".to_string(),
                        types: vec!["locality".to_string(), "political".to_string()],
                    },
                    AddressComponent {
                        long_name: "Dane County".to_string(),
                        short_name: "Dane County".to_string(),
                        types: vec![
                            "administrative_area_level_2".to_string(),
                            "political".to_string(),
                        ],
                    },
                ],
                formatted_address: None,
                types: vec!["locality".to_string(), "political".to_string()],
            }))
        }
    }

    fn county(fips: &str, state: &str, name: &str, long: &str) -> CountyRecord {
        CountyRecord {
            county_id_fips: fips.to_string(),
            state_id_fips: state.to_string(),
            county_name: name.to_string(),
            county_name_long: long.to_string(),
        }
    }

    fn tables() -> FipsTables {
        FipsTables::new(vec![
            county("55025", "55", "Dane", "Dane County"),
            county("53059", "53", "Skamania", "Skamania County"),
            county("51710", "51", "Norfolk city", "Norfolk city"),
        ])
    }

    fn location(county: &str, state: &str) -> LocationRow {
        LocationRow {
            project_id: 0,
            raw_county_name: Some(county.to_string()),
            raw_state_name: Some(state.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn direct_fips_lookup() {
        let mut locs = vec![location("Dane", "WI")];
        add_county_fips(&mut locs, &tables(), &CannedGeocoder).unwrap();
        assert_eq!(locs[0].state_id_fips.as_deref(), Some("55"));
        assert_eq!(locs[0].county_id_fips.as_deref(), Some("55025"));
        assert_eq!(locs[0].geocoded_locality_type.as_deref(), Some("county"));
    }

    #[test]
    fn manual_fix_moves_county_to_correct_state() {
        // Skamania is in Washington, not Oregon
        let mut locs = vec![location("Skamania", "OR")];
        add_county_fips(&mut locs, &tables(), &CannedGeocoder).unwrap();
        assert_eq!(locs[0].state_id_fips.as_deref(), Some("53"));
        assert_eq!(locs[0].county_id_fips.as_deref(), Some("53059"));
        // raw names stay untouched
        assert_eq!(locs[0].raw_state_name.as_deref(), Some("OR"));
    }

    #[test]
    fn geocoder_backup_resolves_township_names() {
        let mut locs = vec![location("Westport", "Wisconsin")];
        add_county_fips(&mut locs, &tables(), &CannedGeocoder).unwrap();
        assert_eq!(locs[0].county_id_fips.as_deref(), Some("55025"));
        assert_eq!(locs[0].geocoded_locality_name.as_deref(), Some("Westport"));
        assert_eq!(locs[0].geocoded_locality_type.as_deref(), Some("city"));
        assert_eq!(
            locs[0].geocoded_containing_county.as_deref(),
            Some("Dane County")
        );
    }

    #[test]
    fn independent_city_rewrite() {
        let mut locs = vec![location("City of Norfolk", "VA")];
        add_county_fips(&mut locs, &tables(), &CannedGeocoder).unwrap();
        assert_eq!(locs[0].county_id_fips.as_deref(), Some("51710"));
    }

    #[test]
    fn unresolvable_rows_keep_null_fips() {
        let mut locs = vec![location("Atlantis", "WI")];
        add_county_fips(&mut locs, &tables(), &CannedGeocoder).unwrap();
        assert_eq!(locs[0].state_id_fips.as_deref(), Some("55"));
        assert!(locs[0].county_id_fips.is_none());
    }
}
