//! State and county FIPS reference tables.
//!
//! The state table is small and static, so it is embedded. The county
//! table (3000+ rows) comes from the census extract and is passed in by
//! the caller at construction time.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    pub state_id_fips: &'static str,
    pub state_name: &'static str,
    pub state_abbrev: &'static str,
}

/// US states, DC and Puerto Rico with their 2-digit FIPS codes.
pub static STATE_FIPS: &[StateInfo] = &[
    StateInfo { state_id_fips: "01", state_name: "Alabama", state_abbrev: "AL" },
    StateInfo { state_id_fips: "02", state_name: "Alaska", state_abbrev: "AK" },
    StateInfo { state_id_fips: "04", state_name: "Arizona", state_abbrev: "AZ" },
    StateInfo { state_id_fips: "05", state_name: "Arkansas", state_abbrev: "AR" },
    StateInfo { state_id_fips: "06", state_name: "California", state_abbrev: "CA" },
    StateInfo { state_id_fips: "08", state_name: "Colorado", state_abbrev: "CO" },
    StateInfo { state_id_fips: "09", state_name: "Connecticut", state_abbrev: "CT" },
    StateInfo { state_id_fips: "10", state_name: "Delaware", state_abbrev: "DE" },
    StateInfo { state_id_fips: "11", state_name: "District of Columbia", state_abbrev: "DC" },
    StateInfo { state_id_fips: "12", state_name: "Florida", state_abbrev: "FL" },
    StateInfo { state_id_fips: "13", state_name: "Georgia", state_abbrev: "GA" },
    StateInfo { state_id_fips: "15", state_name: "Hawaii", state_abbrev: "HI" },
    StateInfo { state_id_fips: "16", state_name: "Idaho", state_abbrev: "ID" },
    StateInfo { state_id_fips: "17", state_name: "Illinois", state_abbrev: "IL" },
    StateInfo { state_id_fips: "18", state_name: "Indiana", state_abbrev: "IN" },
    StateInfo { state_id_fips: "19", state_name: "Iowa", state_abbrev: "IA" },
    StateInfo { state_id_fips: "20", state_name: "Kansas", state_abbrev: "KS" },
    StateInfo { state_id_fips: "21", state_name: "Kentucky", state_abbrev: "KY" },
    StateInfo { state_id_fips: "22", state_name: "Louisiana", state_abbrev: "LA" },
    StateInfo { state_id_fips: "23", state_name: "Maine", state_abbrev: "ME" },
    StateInfo { state_id_fips: "24", state_name: "Maryland", state_abbrev: "MD" },
    StateInfo { state_id_fips: "25", state_name: "Massachusetts", state_abbrev: "MA" },
    StateInfo { state_id_fips: "26", state_name: "Michigan", state_abbrev: "MI" },
    StateInfo { state_id_fips: "27", state_name: "Minnesota", state_abbrev: "MN" },
    StateInfo { state_id_fips: "28", state_name: "Mississippi", state_abbrev: "MS" },
    StateInfo { state_id_fips: "29", state_name: "Missouri", state_abbrev: "MO" },
    StateInfo { state_id_fips: "30", state_name: "Montana", state_abbrev: "MT" },
    StateInfo { state_id_fips: "31", state_name: "Nebraska", state_abbrev: "NE" },
    StateInfo { state_id_fips: "32", state_name: "Nevada", state_abbrev: "NV" },
    StateInfo { state_id_fips: "33", state_name: "New Hampshire", state_abbrev: "NH" },
    StateInfo { state_id_fips: "34", state_name: "New Jersey", state_abbrev: "NJ" },
    StateInfo { state_id_fips: "35", state_name: "New Mexico", state_abbrev: "NM" },
    StateInfo { state_id_fips: "36", state_name: "New York", state_abbrev: "NY" },
    StateInfo { state_id_fips: "37", state_name: "North Carolina", state_abbrev: "NC" },
    StateInfo { state_id_fips: "38", state_name: "North Dakota", state_abbrev: "ND" },
    StateInfo { state_id_fips: "39", state_name: "Ohio", state_abbrev: "OH" },
    StateInfo { state_id_fips: "40", state_name: "Oklahoma", state_abbrev: "OK" },
    StateInfo { state_id_fips: "41", state_name: "Oregon", state_abbrev: "OR" },
    StateInfo { state_id_fips: "42", state_name: "Pennsylvania", state_abbrev: "PA" },
    StateInfo { state_id_fips: "44", state_name: "Rhode Island", state_abbrev: "RI" },
    StateInfo { state_id_fips: "45", state_name: "South Carolina", state_abbrev: "SC" },
    StateInfo { state_id_fips: "46", state_name: "South Dakota", state_abbrev: "SD" },
    StateInfo { state_id_fips: "47", state_name: "Tennessee", state_abbrev: "TN" },
    StateInfo { state_id_fips: "48", state_name: "Texas", state_abbrev: "TX" },
    StateInfo { state_id_fips: "49", state_name: "Utah", state_abbrev: "UT" },
    StateInfo { state_id_fips: "50", state_name: "Vermont", state_abbrev: "VT" },
    StateInfo { state_id_fips: "51", state_name: "Virginia", state_abbrev: "VA" },
    StateInfo { state_id_fips: "53", state_name: "Washington", state_abbrev: "WA" },
    StateInfo { state_id_fips: "54", state_name: "West Virginia", state_abbrev: "WV" },
    StateInfo { state_id_fips: "55", state_name: "Wisconsin", state_abbrev: "WI" },
    StateInfo { state_id_fips: "56", state_name: "Wyoming", state_abbrev: "WY" },
    StateInfo { state_id_fips: "72", state_name: "Puerto Rico", state_abbrev: "PR" },
];

/// One county (or county equivalent) from the census extract.
#[derive(Debug, Clone, Default)]
pub struct CountyRecord {
    pub county_id_fips: String,
    pub state_id_fips: String,
    pub county_name: String,
    pub county_name_long: String,
}

/// Lookup tables for deriving FIPS codes from messy place names.
#[derive(Debug, Clone)]
pub struct FipsTables {
    state_by_key: HashMap<String, &'static StateInfo>,
    county_by_name: HashMap<(String, String), String>,
    county_by_fips: HashMap<String, CountyRecord>,
}

/// Suffixes that distinguish long-form county names from their short form.
const COUNTY_SUFFIXES: &[&str] = &[
    " county",
    " parish",
    " borough",
    " census area",
    " municipality",
    " municipio",
    " city and borough",
];

impl FipsTables {
    pub fn new(counties: Vec<CountyRecord>) -> Self {
        let mut state_by_key = HashMap::new();
        for info in STATE_FIPS {
            state_by_key.insert(info.state_name.to_lowercase(), info);
            state_by_key.insert(info.state_abbrev.to_lowercase(), info);
        }

        // Several counties have short- and long-form name entries; keep the
        // shortest per FIPS code.
        let counties = dedupe_keep_shortest_name(counties);

        let mut county_by_name = HashMap::new();
        let mut county_by_fips = HashMap::new();
        for county in counties {
            let state = county.state_id_fips.clone();
            county_by_name.insert(
                (state.clone(), county.county_name.to_lowercase()),
                county.county_id_fips.clone(),
            );
            county_by_name.insert(
                (state, county.county_name_long.to_lowercase()),
                county.county_id_fips.clone(),
            );
            county_by_fips.insert(county.county_id_fips.clone(), county);
        }

        Self {
            state_by_key,
            county_by_name,
            county_by_fips,
        }
    }

    /// Resolve a state by full name or postal abbreviation, case-insensitive.
    pub fn state(&self, name_or_abbrev: &str) -> Option<&'static StateInfo> {
        self.state_by_key
            .get(name_or_abbrev.trim().to_lowercase().as_str())
            .copied()
    }

    pub fn state_by_fips(&self, state_id_fips: &str) -> Option<&'static StateInfo> {
        STATE_FIPS.iter().find(|s| s.state_id_fips == state_id_fips)
    }

    /// Resolve a county FIPS code from a state FIPS and a county name.
    /// Tries the name as given, with long-form suffixes stripped, and with
    /// " county" appended, to cover both "Ontario" and "Ontario County".
    pub fn county_fips(&self, state_id_fips: &str, county_name: &str) -> Option<&str> {
        let name = county_name.trim().to_lowercase();
        let key = (state_id_fips.to_string(), name.clone());
        if let Some(fips) = self.county_by_name.get(&key) {
            return Some(fips.as_str());
        }
        for suffix in COUNTY_SUFFIXES {
            if let Some(stripped) = name.strip_suffix(suffix) {
                let key = (state_id_fips.to_string(), stripped.to_string());
                if let Some(fips) = self.county_by_name.get(&key) {
                    return Some(fips.as_str());
                }
            }
        }
        let key = (state_id_fips.to_string(), format!("{name} county"));
        self.county_by_name.get(&key).map(|s| s.as_str())
    }

    pub fn county(&self, county_id_fips: &str) -> Option<&CountyRecord> {
        self.county_by_fips.get(county_id_fips)
    }
}

/// Several states and counties have multiple entries with short- and
/// long-form names (e.g. "Rhode Island" vs "Rhode Island and Providence
/// Plantations"). Keep only the shortest per FIPS code.
fn dedupe_keep_shortest_name(mut counties: Vec<CountyRecord>) -> Vec<CountyRecord> {
    counties.sort_by(|a, b| {
        a.county_id_fips
            .cmp(&b.county_id_fips)
            .then(a.county_name.len().cmp(&b.county_name.len()))
    });
    counties.dedup_by(|b, a| a.county_id_fips == b.county_id_fips);
    counties
}

#[cfg(test)]
mod tests {
    use super::*;

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
            county("36069", "36", "Ontario", "Ontario County"),
            county("22059", "22", "La Salle", "La Salle Parish"),
            county("51650", "51", "Hampton", "Hampton city"),
        ])
    }

    #[test]
    fn state_lookup_by_name_and_abbrev() {
        let t = tables();
        assert_eq!(t.state("New York").unwrap().state_id_fips, "36");
        assert_eq!(t.state("ny").unwrap().state_id_fips, "36");
        assert!(t.state("not a state").is_none());
    }

    #[test]
    fn county_lookup_with_and_without_suffix() {
        let t = tables();
        assert_eq!(t.county_fips("36", "Ontario"), Some("36069"));
        assert_eq!(t.county_fips("36", "Ontario County"), Some("36069"));
        assert_eq!(t.county_fips("22", "La Salle Parish"), Some("22059"));
        assert_eq!(t.county_fips("36", "Nowhere"), None);
    }

    #[test]
    fn dedupe_keeps_shortest_name() {
        let deduped = dedupe_keep_shortest_name(vec![
            county("44001", "44", "Rhode Island and Providence Plantations", "x"),
            county("44001", "44", "Rhode Island", "x"),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].county_name, "Rhode Island");
    }
}
