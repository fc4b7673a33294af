use serde::{Deserialize, Serialize};

use crate::utils::{compress_years_to_spans, compute_win_rate, format_win_rate};

/// A championship year, e.g. 1958.
pub type Season = u16;

/// Constructor as listed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorInfo {
    #[serde(rename = "constructorId")]
    pub id: String,
    #[serde(default)]
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub nationality: String,
}

/// Everything the league table shows for one constructor.
///
/// Derived fields are only ever computed by [`ConstructorRecord::new`] and
/// [`ConstructorRecord::with_race_stats`], which keeps `title_count` in step
/// with `title_years` and the win rate in step with the race counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorRecord {
    pub id: String,
    pub name: String,
    pub nationality: String,
    pub url: String,
    /// Flag image path for the nationality, empty when unmapped.
    #[serde(rename = "countryFlagRef")]
    pub country_flag: String,
    pub title_count: usize,
    pub title_years: Vec<Season>,
    pub active_years: Vec<Season>,
    pub active_years_display: String,
    pub race_starts: u32,
    pub race_wins: u32,
    pub win_rate: Option<f64>,
    pub win_rate_display: String,
}

impl ConstructorRecord {
    pub fn new(
        info: &ConstructorInfo,
        country_flag: String,
        mut title_years: Vec<Season>,
        mut active_years: Vec<Season>,
        race_starts: u32,
        race_wins: u32,
    ) -> Self {
        title_years.sort_unstable();
        title_years.dedup();
        active_years.sort_unstable();
        active_years.dedup();

        let record = Self {
            id: info.id.clone(),
            name: info.name.clone(),
            nationality: info.nationality.clone(),
            url: info.url.clone(),
            country_flag,
            title_count: title_years.len(),
            active_years_display: compress_years_to_spans(&active_years),
            title_years,
            active_years,
            race_starts: 0,
            race_wins: 0,
            win_rate: None,
            win_rate_display: String::new(),
        };
        record.with_race_stats(race_starts, race_wins)
    }

    /// Copy of this record with the race counters and win rate replaced.
    pub fn with_race_stats(mut self, race_starts: u32, race_wins: u32) -> Self {
        self.race_starts = race_starts;
        self.race_wins = race_wins;
        self.win_rate = compute_win_rate(race_wins, race_starts);
        self.win_rate_display = format_win_rate(self.win_rate, race_wins, race_starts);
        self
    }

    pub fn title_years_display(&self) -> String {
        self.title_years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check the invariants a stored record must satisfy.
    pub fn is_consistent(&self) -> bool {
        self.title_count == self.title_years.len()
            && self.race_wins <= self.race_starts
            && self.active_years.windows(2).all(|w| w[0] < w[1])
    }
}
