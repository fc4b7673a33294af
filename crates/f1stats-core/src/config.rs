//! Settings for the upstream client and the refresh controller.
//!
//! Both structs deserialize with every field optional, so a config file only
//! has to name what it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default API root. Any Ergast-compatible mirror works.
pub const DEFAULT_BASE_URL: &str = "https://ergast.com/api/f1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Requests allowed in flight at once across all entities.
    pub max_in_flight: usize,
    /// Page size for a constructor's title seasons.
    pub title_page_limit: u32,
    /// Page size for a constructor's active seasons. Has to cover the whole
    /// history of the sport; a constructor with more seasons than this fails
    /// to assemble until it is raised.
    pub active_seasons_limit: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 5,
            max_in_flight: 6,
            title_page_limit: 30,
            active_seasons_limit: 100,
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How a full repopulation replaces the previous data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepopulateStrategy {
    /// Build a new generation next to the live one and swap the pointer at the end.
    #[default]
    Shadow,
    /// Flush the store, then rebuild in place. Readers see a partial data set
    /// while this runs, and constructors that fail to assemble are lost.
    Flush,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Key prefix for everything this service writes.
    pub namespace: String,
    /// Constructors assembled at the same time.
    pub entity_concurrency: usize,
    /// Upper bound for a whole refresh run.
    pub refresh_timeout_secs: u64,
    pub strategy: RepopulateStrategy,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            namespace: "f1stats".to_string(),
            entity_concurrency: 4,
            refresh_timeout_secs: 300,
            strategy: RepopulateStrategy::Shadow,
        }
    }
}

impl RefreshConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}
