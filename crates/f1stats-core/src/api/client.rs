//! Client for the Ergast-style motorsport statistics API.
//!
//! This module provides the `ErgastClient`, which implements `StatsSource`
//! over plain read-only GET requests.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;

use super::envelope::{
    decode_page, ConstructorTableBody, Page, RaceTableBody, StandingsTableBody,
};
use super::{ApiError, StatsSource};
use crate::config::UpstreamConfig;
use crate::models::{ConstructorInfo, Season};

/// API client for the statistics service.
/// Clone is cheap - reqwest::Client and the request limiter are both shared.
#[derive(Clone)]
pub struct ErgastClient {
    client: Client,
    base_url: String,
    permits: Arc<Semaphore>,
    title_page_limit: u32,
    active_seasons_limit: u32,
}

impl ErgastClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            title_page_limit: config.title_page_limit,
            active_seasons_limit: config.active_seasons_limit,
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>, ApiError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ApiError::Unavailable("request limiter closed".to_string()))?;

        debug!(url = url, "GET");
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        decode_page(&text)
    }

    fn constructor_url(&self, constructor_id: &str, rest: &str) -> String {
        format!("{}/constructors/{}/{}", self.base_url, constructor_id, rest)
    }

    async fn count_results(&self, url: &str) -> Result<u32, ApiError> {
        let page: Page<RaceTableBody> = self.get_page(url).await?;
        page.total()
    }
}

#[async_trait]
impl StatsSource for ErgastClient {
    /// Every constructor that has won the constructors' championship.
    ///
    /// Fewer than twenty teams have ever done so and the default page holds
    /// thirty, so a single page is expected. A short page is an error.
    async fn list_champion_entities(&self) -> Result<Vec<ConstructorInfo>, ApiError> {
        let url = format!("{}/constructorStandings/1/constructors.json", self.base_url);
        let page: Page<ConstructorTableBody> = self.get_page(&url).await?;
        page.ensure_complete(page.table.constructor_table.constructors.len(), None)?;
        let constructors = page.table.constructor_table.constructors;
        debug!(count = constructors.len(), "Champion constructors fetched");
        Ok(constructors)
    }

    async fn list_title_seasons(&self, constructor_id: &str) -> Result<Vec<Season>, ApiError> {
        let url = self.constructor_url(
            constructor_id,
            &format!("constructorStandings/1.json?limit={}", self.title_page_limit),
        );
        let page: Page<StandingsTableBody> = self.get_page(&url).await?;
        page.ensure_complete(
            page.table.standings_table.standings_lists.len(),
            Some("title_page_limit"),
        )?;
        page.table.standings_table.seasons()
    }

    async fn count_race_starts(&self, constructor_id: &str) -> Result<u32, ApiError> {
        let url = self.constructor_url(constructor_id, "results.json?limit=0");
        self.count_results(&url).await
    }

    async fn count_race_wins(&self, constructor_id: &str) -> Result<u32, ApiError> {
        let url = self.constructor_url(constructor_id, "results/1.json?limit=0");
        self.count_results(&url).await
    }

    async fn list_active_seasons(&self, constructor_id: &str) -> Result<Vec<Season>, ApiError> {
        let url = self.constructor_url(
            constructor_id,
            &format!("constructorStandings.json?limit={}", self.active_seasons_limit),
        );
        let page: Page<StandingsTableBody> = self.get_page(&url).await?;
        page.ensure_complete(
            page.table.standings_table.standings_lists.len(),
            Some("active_seasons_limit"),
        )?;
        page.table.standings_table.seasons()
    }
}
