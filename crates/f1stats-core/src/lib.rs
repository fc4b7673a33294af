//! f1stats core library.
//!
//! Fetches constructors' championship statistics from an Ergast-compatible
//! API, derives one denormalized record per championship-winning constructor
//! and keeps those records in a key-value cache for the HTTP front-end.
//!
//! - `api`: the upstream client and the `StatsSource` seam
//! - `assembler`: one record from several concurrent lookups
//! - `cache`: the key-value stores and the generation-aware `CacheManager`
//! - `refresh`: full repopulation and race-stats refresh

pub mod api;
pub mod assembler;
pub mod cache;
pub mod config;
pub mod flags;
pub mod models;
pub mod refresh;
pub mod utils;

#[cfg(test)]
mod testutils;

pub use api::{ApiError, ErgastClient, StatsSource};
pub use cache::{CacheError, CacheManager, CachedData, KvStore, MemoryStore, RedisStore};
pub use config::{RefreshConfig, RepopulateStrategy, UpstreamConfig};
pub use flags::FlagTable;
pub use models::{ConstructorInfo, ConstructorRecord, Season};
pub use refresh::{RefreshController, RefreshError, RefreshSummary};
