//! Response schemas for the statistics API.
//!
//! Every endpoint answers with the same envelope:
//! `{"MRData": {"limit": "30", "offset": "0", "total": "17", <table>}}`.
//! Counters are transmitted as strings. Each endpoint gets exactly one table
//! type here; a reply without that table is rejected instead of being read as
//! an empty result.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ApiError;
use crate::models::{ConstructorInfo, Season};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MRData")]
    data: Page<T>,
}

/// One page of results plus the paging counters advertised by the API.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    limit: String,
    offset: String,
    total: String,
    #[serde(flatten)]
    pub table: T,
}

impl<T> Page<T> {
    pub fn limit(&self) -> Result<u32, ApiError> {
        parse_count("limit", &self.limit)
    }

    pub fn offset(&self) -> Result<u32, ApiError> {
        parse_count("offset", &self.offset)
    }

    pub fn total(&self) -> Result<u32, ApiError> {
        parse_count("total", &self.total)
    }

    /// Fail if the API holds more rows than this page carries.
    ///
    /// `setting` names the knob an operator has to raise when the page limit
    /// is configurable, and is included in the error.
    pub fn ensure_complete(&self, returned: usize, setting: Option<&str>) -> Result<(), ApiError> {
        let limit = self.limit()?;
        let offset = self.offset()?;
        let total = self.total()?;

        let seen = u64::from(offset) + returned as u64;
        if total > limit || seen < u64::from(total) {
            let hint = setting
                .map(|s| format!(", raise `{}`", s))
                .unwrap_or_default();
            return Err(ApiError::Format(format!(
                "page truncated: {} of {} rows returned with limit {}{}",
                returned, total, limit, hint
            )));
        }
        Ok(())
    }
}

/// Table for `constructorStandings/1/constructors.json`.
#[derive(Debug, Deserialize)]
pub struct ConstructorTableBody {
    #[serde(rename = "ConstructorTable")]
    pub constructor_table: ConstructorTable,
}

#[derive(Debug, Deserialize)]
pub struct ConstructorTable {
    #[serde(rename = "Constructors")]
    pub constructors: Vec<ConstructorInfo>,
}

/// Table for the `constructorStandings` endpoints (title seasons and active seasons).
#[derive(Debug, Deserialize)]
pub struct StandingsTableBody {
    #[serde(rename = "StandingsTable")]
    pub standings_table: StandingsTable,
}

#[derive(Debug, Deserialize)]
pub struct StandingsTable {
    #[serde(rename = "StandingsLists")]
    pub standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
pub struct StandingsList {
    pub season: String,
}

impl StandingsTable {
    pub fn seasons(&self) -> Result<Vec<Season>, ApiError> {
        self.standings_lists
            .iter()
            .map(|list| parse_season(&list.season))
            .collect()
    }
}

/// Table for the `results` endpoints. Only the envelope total is used, the
/// race list itself is requested with `limit=0`.
#[derive(Debug, Deserialize)]
pub struct RaceTableBody {
    #[serde(rename = "RaceTable")]
    pub race_table: serde_json::Value,
}

pub fn decode_page<T: DeserializeOwned>(body: &str) -> Result<Page<T>, ApiError> {
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| ApiError::Format(format!("Failed to decode response envelope: {}", e)))?;
    Ok(envelope.data)
}

pub fn parse_count(field: &str, value: &str) -> Result<u32, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::Format(format!("`{}` is not a number: {:?}", field, value)))
}

pub fn parse_season(value: &str) -> Result<Season, ApiError> {
    let trimmed = value.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Format(format!("Invalid season: {:?}", value)));
    }
    trimmed
        .parse()
        .map_err(|_| ApiError::Format(format!("Invalid season: {:?}", value)))
}
