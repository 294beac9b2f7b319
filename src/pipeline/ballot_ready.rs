//! Ballot Ready transform: county-level election, position and race data.
//!
//! The raw extract packs a race's counties into one string column
//! (`{"Dane County", "Rock County"}`). Rows are exploded to one per
//! county, FIPS codes attached, and the flat table is normalized into
//! election, position and race entities plus a position/county
//! association table.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::fips::FipsTables;
use crate::pipeline::dates::parse_opt_date;

/// Exploded county/race duplicates known to exist in the raw vintage.
/// More than this means the source changed shape.
const MAX_DUPLICATE_COUNTY_RACES: usize = 20;

/// Valdez-Cordova Census Area (02261) was split in 2019; elections
/// recorded against it are assigned to both successor areas.
const VALDEZ_CORDOVA_FIPS: &str = "02261";
const VALDEZ_SUCCESSORS: &[(&str, &str)] = &[
    ("Chugach Census Area", "02063"),
    ("Copper River Census Area", "02066"),
];

/// One row of the raw extract, counties still packed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBallotReadyRow {
    pub election_id: i64,
    pub election_name: String,
    pub election_day: Option<String>,
    pub race_id: i64,
    pub is_primary: String,
    pub is_runoff: String,
    pub is_unexpired: String,
    pub number_of_seats: i64,
    pub race_created_at: Option<String>,
    pub race_updated_at: Option<String>,
    pub position_id: i64,
    pub position_name: String,
    pub position_description: Option<String>,
    pub reference_year: Option<i32>,
    pub sub_area_name: Option<String>,
    pub sub_area_value: Option<String>,
    pub sub_area_name_secondary: Option<String>,
    pub sub_area_value_secondary: Option<String>,
    pub level: String,
    pub tier: Option<i64>,
    pub is_judicial: String,
    pub is_retention: String,
    pub normalized_position_id: Option<i64>,
    pub normalized_position_name: Option<String>,
    pub frequency: Option<String>,
    pub partisan_type: Option<String>,
    /// Packed county list, e.g. `{"Dane County", "Rock County"}`.
    pub counties: String,
    pub state: String,
}

/// One exploded row: a single (race, county) pair with parsed types.
#[derive(Debug, Clone, Default)]
struct ExplodedRow {
    election_id: i64,
    election_name: String,
    election_day: Option<NaiveDate>,
    race_id: i64,
    is_primary: bool,
    is_runoff: bool,
    is_unexpired: bool,
    number_of_seats: i64,
    race_created_at: Option<NaiveDateTime>,
    race_updated_at: Option<NaiveDateTime>,
    position_id: i64,
    position_name: String,
    reference_year: Option<i32>,
    sub_area_name: Option<String>,
    sub_area_value: Option<String>,
    sub_area_name_secondary: Option<String>,
    sub_area_value_secondary: Option<String>,
    level: String,
    tier: Option<i64>,
    is_judicial: bool,
    is_retention: bool,
    normalized_position_id: Option<i64>,
    normalized_position_name: Option<String>,
    frequency: Option<String>,
    partisan_type: Option<String>,
    raw_county: String,
    raw_state: String,
    state_id_fips: Option<String>,
    county_id_fips: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BallotReadyElection {
    pub election_id: i64,
    pub election_name: String,
    pub election_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BallotReadyPosition {
    pub position_id: i64,
    pub position_name: String,
    pub reference_year: Option<i32>,
    pub sub_area_name: Option<String>,
    pub sub_area_value: Option<String>,
    pub sub_area_name_secondary: Option<String>,
    pub sub_area_value_secondary: Option<String>,
    pub level: String,
    pub tier: Option<i64>,
    pub is_judicial: bool,
    pub is_retention: bool,
    pub normalized_position_id: Option<i64>,
    pub normalized_position_name: Option<String>,
    pub frequency: Option<String>,
    pub partisan_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BallotReadyRace {
    pub race_id: i64,
    pub is_primary: bool,
    pub is_runoff: bool,
    pub is_unexpired: bool,
    pub number_of_seats: i64,
    pub race_created_at: Option<NaiveDateTime>,
    pub race_updated_at: Option<NaiveDateTime>,
    pub election_id: i64,
    pub position_id: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PositionCountyAssoc {
    pub position_id: i64,
    pub county_id_fips: Option<String>,
    pub raw_county: String,
    pub state_id_fips: Option<String>,
    pub raw_state: String,
}

#[derive(Debug, Clone, Default)]
pub struct BallotReadyTables {
    pub elections: Vec<BallotReadyElection>,
    pub positions: Vec<BallotReadyPosition>,
    pub races: Vec<BallotReadyRace>,
    pub position_counties: Vec<PositionCountyAssoc>,
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw {
        "t" => Ok(true),
        "f" => Ok(false),
        other => Err(EtlError::Validation(format!(
            "expected 't' or 'f' boolean, got '{other}'"
        ))),
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Unpack `{"A County", "B County"}` into its county names.
fn split_counties(packed: &str) -> Vec<String> {
    let unquoted = packed.replace('"', "");
    let trimmed = unquoted
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(&unquoted);
    trimmed
        .split(", ")
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .collect()
}

fn explode(raw: Vec<RawBallotReadyRow>, fips: &FipsTables) -> Result<Vec<ExplodedRow>> {
    let mut rows: Vec<ExplodedRow> = Vec::new();
    for source in raw {
        let is_primary = parse_bool(&source.is_primary)?;
        let is_runoff = parse_bool(&source.is_runoff)?;
        let is_unexpired = parse_bool(&source.is_unexpired)?;
        let is_judicial = parse_bool(&source.is_judicial)?;
        let is_retention = parse_bool(&source.is_retention)?;
        for county in split_counties(&source.counties) {
            // spelling fix to match the census county table
            let county = if county == "LaSalle Parish" {
                "La Salle Parish".to_string()
            } else {
                county
            };
            rows.push(ExplodedRow {
                election_id: source.election_id,
                election_name: source.election_name.clone(),
                election_day: parse_opt_date(source.election_day.as_deref()),
                race_id: source.race_id,
                is_primary,
                is_runoff,
                is_unexpired,
                number_of_seats: source.number_of_seats,
                race_created_at: parse_timestamp(source.race_created_at.as_deref()),
                race_updated_at: parse_timestamp(source.race_updated_at.as_deref()),
                position_id: source.position_id,
                position_name: source.position_name.clone(),
                reference_year: source.reference_year,
                sub_area_name: source.sub_area_name.clone(),
                sub_area_value: source.sub_area_value.clone(),
                sub_area_name_secondary: source.sub_area_name_secondary.clone(),
                sub_area_value_secondary: source.sub_area_value_secondary.clone(),
                level: source.level.clone(),
                tier: source.tier,
                is_judicial,
                is_retention,
                normalized_position_id: source.normalized_position_id,
                normalized_position_name: source.normalized_position_name.clone(),
                frequency: source.frequency.clone(),
                partisan_type: source.partisan_type.clone(),
                raw_county: county,
                raw_state: source.state.clone(),
                state_id_fips: None,
                county_id_fips: None,
            });
        }
    }

    // the raw vintage has a handful of county/race duplicates
    let mut counts: HashMap<(String, i64), usize> = HashMap::new();
    for row in &rows {
        *counts
            .entry((row.raw_county.clone(), row.race_id))
            .or_insert(0) += 1;
    }
    let duplicated: usize = counts.values().filter(|c| **c > 1).map(|c| *c).sum();
    if duplicated > MAX_DUPLICATE_COUNTY_RACES {
        return Err(EtlError::Validation(format!(
            "found {duplicated} duplicate county/race rows, expected at most \
             {MAX_DUPLICATE_COUNTY_RACES}"
        )));
    }
    let mut seen: HashSet<(String, i64)> = HashSet::new();
    rows.retain(|row| seen.insert((row.raw_county.clone(), row.race_id)));

    for row in &mut rows {
        let state = fips.state(&row.raw_state);
        row.state_id_fips = state.map(|s| s.state_id_fips.to_string());
        if let Some(state) = state {
            row.county_id_fips = fips
                .county_fips(state.state_id_fips, &row.raw_county)
                .map(str::to_string);
        }
    }

    // split Valdez-Cordova rows between its two successor census areas
    let (valdez, mut rows): (Vec<ExplodedRow>, Vec<ExplodedRow>) = rows
        .into_iter()
        .partition(|r| r.county_id_fips.as_deref() == Some(VALDEZ_CORDOVA_FIPS));
    if valdez
        .iter()
        .any(|r| r.level != "state" && r.level != "federal")
    {
        info!("Found a local election in the Valdez-Cordova Census Area");
    }
    let mut replacements = Vec::new();
    for (county, fips_code) in VALDEZ_SUCCESSORS {
        for row in &valdez {
            let mut corrected = row.clone();
            corrected.raw_county = county.to_string();
            corrected.county_id_fips = Some(fips_code.to_string());
            replacements.push(corrected);
        }
    }
    replacements.append(&mut rows);
    Ok(replacements)
}

fn normalize(mut rows: Vec<ExplodedRow>) -> Result<BallotReadyTables> {
    let mut tables = BallotReadyTables::default();

    // elections: one row per election_id, attributes must agree
    let mut election_seen: HashMap<i64, (String, Option<NaiveDate>)> = HashMap::new();
    for row in &rows {
        let attrs = (row.election_name.clone(), row.election_day);
        match election_seen.get(&row.election_id) {
            None => {
                election_seen.insert(row.election_id, attrs);
                tables.elections.push(BallotReadyElection {
                    election_id: row.election_id,
                    election_name: row.election_name.clone(),
                    election_day: row.election_day,
                });
            }
            Some(existing) if *existing != attrs => {
                return Err(EtlError::DuplicateKey(format!(
                    "election {} has conflicting attributes",
                    row.election_id
                )));
            }
            Some(_) => {}
        }
    }

    // positions: a position that changed election year or frequency
    // (redistricting, election-law changes) appears with two distinct
    // attribute tuples under one id; those ids are reassigned
    reassign_conflicting_position_ids(&mut rows);
    let mut position_seen: HashSet<i64> = HashSet::new();
    for row in &rows {
        if position_seen.insert(row.position_id) {
            tables.positions.push(BallotReadyPosition {
                position_id: row.position_id,
                position_name: row.position_name.clone(),
                reference_year: row.reference_year,
                sub_area_name: row.sub_area_name.clone(),
                sub_area_value: row.sub_area_value.clone(),
                sub_area_name_secondary: row.sub_area_name_secondary.clone(),
                sub_area_value_secondary: row.sub_area_value_secondary.clone(),
                level: row.level.clone(),
                tier: row.tier,
                is_judicial: row.is_judicial,
                is_retention: row.is_retention,
                normalized_position_id: row.normalized_position_id,
                normalized_position_name: row.normalized_position_name.clone(),
                frequency: row.frequency.clone(),
                partisan_type: row.partisan_type.clone(),
            });
        }
    }

    // races: one row per race_id, attributes must agree
    let mut race_seen: HashMap<i64, (bool, bool, bool, i64)> = HashMap::new();
    for row in &rows {
        let attrs = (
            row.is_primary,
            row.is_runoff,
            row.is_unexpired,
            row.number_of_seats,
        );
        match race_seen.get(&row.race_id) {
            None => {
                race_seen.insert(row.race_id, attrs);
                tables.races.push(BallotReadyRace {
                    race_id: row.race_id,
                    is_primary: row.is_primary,
                    is_runoff: row.is_runoff,
                    is_unexpired: row.is_unexpired,
                    number_of_seats: row.number_of_seats,
                    race_created_at: row.race_created_at,
                    race_updated_at: row.race_updated_at,
                    election_id: row.election_id,
                    position_id: row.position_id,
                });
            }
            Some(existing) if *existing != attrs => {
                return Err(EtlError::DuplicateKey(format!(
                    "race {} has conflicting attributes",
                    row.race_id
                )));
            }
            Some(_) => {}
        }
    }

    let mut assoc_seen: HashSet<(i64, Option<String>)> = HashSet::new();
    for row in &rows {
        if assoc_seen.insert((row.position_id, row.county_id_fips.clone())) {
            tables.position_counties.push(PositionCountyAssoc {
                position_id: row.position_id,
                county_id_fips: row.county_id_fips.clone(),
                raw_county: row.raw_county.clone(),
                state_id_fips: row.state_id_fips.clone(),
                raw_state: row.raw_state.clone(),
            });
        }
    }

    info!(
        elections = tables.elections.len(),
        positions = tables.positions.len(),
        races = tables.races.len(),
        assoc = tables.position_counties.len(),
        "Normalized ballot data"
    );
    Ok(tables)
}

type PositionAttrs = (
    String,
    Option<i32>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
);

fn position_attrs(row: &ExplodedRow) -> PositionAttrs {
    (
        row.position_name.clone(),
        row.reference_year,
        row.sub_area_name.clone(),
        row.sub_area_value.clone(),
        row.level.clone(),
        row.frequency.clone(),
    )
}

fn reassign_conflicting_position_ids(rows: &mut [ExplodedRow]) {
    // the first attribute tuple seen keeps the original id; each further
    // distinct tuple under that id gets a fresh one
    let mut next_id = rows.iter().map(|r| r.position_id).max().unwrap_or(0) + 1;
    let mut first_attrs: HashMap<i64, PositionAttrs> = HashMap::new();
    let mut reassigned: HashMap<(i64, PositionAttrs), i64> = HashMap::new();
    for row in rows.iter_mut() {
        let attrs = position_attrs(row);
        match first_attrs.get(&row.position_id) {
            None => {
                first_attrs.insert(row.position_id, attrs);
            }
            Some(existing) if *existing != attrs => {
                let new_id = *reassigned
                    .entry((row.position_id, attrs))
                    .or_insert_with(|| {
                        let id = next_id;
                        next_id += 1;
                        id
                    });
                row.position_id = new_id;
            }
            Some(_) => {}
        }
    }
    if !reassigned.is_empty() {
        info!(
            count = reassigned.len(),
            "Reassigned position ids with conflicting attributes"
        );
    }
}

/// Full ballot transform: explode counties, attach FIPS codes and
/// normalize into entity tables.
pub fn transform_ballot_ready(
    raw: Vec<RawBallotReadyRow>,
    fips: &FipsTables,
) -> Result<BallotReadyTables> {
    let rows = explode(raw, fips)?;
    normalize(rows)
}
