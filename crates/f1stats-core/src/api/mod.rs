//! Upstream statistics API.
//!
//! `StatsSource` is the read-only view of the API the rest of the crate
//! depends on; `ErgastClient` implements it over HTTP. All calls are
//! independent and hold no shared mutable state.

pub mod client;
pub mod envelope;
pub mod error;

use async_trait::async_trait;

use crate::models::{ConstructorInfo, Season};

pub use client::ErgastClient;
pub use error::ApiError;

#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Constructors that have won the constructors' championship at least once.
    async fn list_champion_entities(&self) -> Result<Vec<ConstructorInfo>, ApiError>;

    /// Seasons in which the constructor won the title.
    async fn list_title_seasons(&self, constructor_id: &str) -> Result<Vec<Season>, ApiError>;

    async fn count_race_starts(&self, constructor_id: &str) -> Result<u32, ApiError>;

    async fn count_race_wins(&self, constructor_id: &str) -> Result<u32, ApiError>;

    /// Every season the constructor took part in.
    async fn list_active_seasons(&self, constructor_id: &str) -> Result<Vec<Season>, ApiError>;
}
