//! Full and partial refresh of the cached constructor records.
//!
//! `RefreshController` is the only writer of the cache. It keeps no state
//! between runs; everything it needs is read back from the store. At most one
//! refresh of either kind runs at a time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, StatsSource};
use crate::assembler::{AssemblyError, RecordAssembler};
use crate::cache::{CacheError, CacheManager};
use crate::config::{RefreshConfig, RepopulateStrategy};
use crate::flags::FlagTable;
use crate::models::ConstructorRecord;

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Refresh aborted, could not list constructors: {0}")]
    Aborted(#[source] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("A refresh is already running")]
    AlreadyRunning,

    #[error("Refresh did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Counts from one refresh run. Per-constructor causes only go to the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Generation written (full) or updated (partial); `None` if nothing was cached.
    pub generation: Option<u64>,
    /// Records written with fresh data.
    pub stored: usize,
    /// Constructors that could not be refreshed.
    pub failed: usize,
    /// Failed constructors whose previous record was kept.
    pub carried_over: usize,
}

/// Why one constructor was not refreshed in place.
#[derive(Error, Debug)]
enum EntityFailure {
    #[error("record disappeared from the cache")]
    Missing,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

pub struct RefreshController {
    source: Arc<dyn StatsSource>,
    assembler: RecordAssembler,
    cache: CacheManager,
    config: RefreshConfig,
    in_flight: Mutex<()>,
}

impl RefreshController {
    pub fn new(
        source: Arc<dyn StatsSource>,
        flags: Arc<FlagTable>,
        cache: CacheManager,
        config: RefreshConfig,
    ) -> Self {
        Self {
            assembler: RecordAssembler::new(Arc::clone(&source), flags),
            source,
            cache,
            config,
            in_flight: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Every record of the live generation.
    pub async fn list_all_records(&self) -> Result<Vec<ConstructorRecord>, CacheError> {
        self.cache.list_records().await
    }

    /// Rebuild every record from the API.
    ///
    /// Only failing to list the champion constructors (or losing the cache)
    /// fails the run. A constructor that cannot be assembled is logged and
    /// skipped; with the shadow strategy its previous record is kept.
    pub async fn repopulate(&self) -> Result<RefreshSummary, RefreshError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| RefreshError::AlreadyRunning)?;

        info!(strategy = ?self.config.strategy, "Starting full repopulation");
        self.bounded(self.run_repopulate()).await
    }

    /// Re-fetch race starts and wins for every cached constructor.
    ///
    /// Title and active seasons are left alone and no new constructors are
    /// discovered. Failures leave the affected record as it was.
    pub async fn refresh_race_stats(&self) -> Result<RefreshSummary, RefreshError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| RefreshError::AlreadyRunning)?;

        info!("Starting race stats refresh");
        self.bounded(self.run_race_stats()).await
    }

    async fn bounded<F>(&self, run: F) -> Result<RefreshSummary, RefreshError>
    where
        F: Future<Output = Result<RefreshSummary, RefreshError>>,
    {
        let limit = self.config.refresh_timeout();
        match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout = ?limit, "Refresh timed out");
                Err(RefreshError::TimedOut(limit))
            }
        }
    }

    async fn run_repopulate(&self) -> Result<RefreshSummary, RefreshError> {
        let seeds = self.source.list_champion_entities().await.map_err(|e| {
            error!(error = %e, "Could not list champion constructors, abandoning repopulation");
            RefreshError::Aborted(e)
        })?;
        info!(count = seeds.len(), "Champion constructors listed");

        let (generation, prior) = match self.config.strategy {
            RepopulateStrategy::Shadow => {
                let prior = self.cache.current_generation().await?;
                let next = prior.map_or(1, |g| g + 1);
                let leftover = self.cache.clear_generation(next).await?;
                if leftover > 0 {
                    warn!(generation = next, count = leftover, "Cleared records of an unfinished run");
                }
                (next, prior)
            }
            RepopulateStrategy::Flush => {
                self.cache.flush().await?;
                self.cache.promote(1).await?;
                (1, None)
            }
        };

        let mut summary = RefreshSummary {
            generation: Some(generation),
            ..RefreshSummary::default()
        };

        let mut results = stream::iter(seeds)
            .map(|info| async move {
                let result = self.assembler.assemble(&info).await;
                (info, result)
            })
            .buffer_unordered(self.config.entity_concurrency.max(1));

        while let Some((info, result)) = results.next().await {
            match result {
                Ok(record) => match self.cache.save_record(generation, &record).await {
                    Ok(()) => {
                        debug!(
                            constructor = %record.id,
                            titles = record.title_count,
                            "Record stored"
                        );
                        summary.stored += 1;
                    }
                    Err(e) => {
                        warn!(constructor = %info.id, error = %e, "Failed to write record");
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    warn!(constructor = %e.entity_id, error = %e.source, "Constructor skipped");
                    summary.failed += 1;
                    if self.carry_forward(prior, generation, &info.id).await {
                        summary.carried_over += 1;
                    }
                }
            }
        }

        if self.config.strategy == RepopulateStrategy::Shadow {
            self.cache.promote(generation).await?;
            match self.cache.discard_stale_generations(generation).await {
                Ok(removed) => debug!(removed, "Stale generations discarded"),
                Err(e) => warn!(error = %e, "Failed to discard stale generations"),
            }
        }

        info!(
            generation,
            stored = summary.stored,
            failed = summary.failed,
            carried_over = summary.carried_over,
            "Full repopulation complete"
        );
        Ok(summary)
    }

    /// Copy a constructor's record from the previous generation into the new one.
    async fn carry_forward(&self, prior: Option<u64>, generation: u64, id: &str) -> bool {
        let Some(prior) = prior else {
            return false;
        };

        let record = match self.cache.load_record(prior, id).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                warn!(constructor = %id, error = %e, "Could not read previous record");
                return false;
            }
        };

        match self.cache.save_record(generation, &record).await {
            Ok(()) => {
                info!(constructor = %id, from = prior, "Kept previous record");
                true
            }
            Err(e) => {
                warn!(constructor = %id, error = %e, "Could not carry previous record forward");
                false
            }
        }
    }

    async fn run_race_stats(&self) -> Result<RefreshSummary, RefreshError> {
        let Some(generation) = self.cache.current_generation().await? else {
            info!("Nothing cached yet, skipping race stats refresh");
            return Ok(RefreshSummary::default());
        };

        let ids = self.cache.record_ids(generation).await?;
        debug!(generation, count = ids.len(), "Refreshing race stats");

        let mut summary = RefreshSummary {
            generation: Some(generation),
            ..RefreshSummary::default()
        };

        let mut results = stream::iter(ids)
            .map(|id| async move {
                let outcome = self.refresh_one(generation, &id).await;
                (id, outcome)
            })
            .buffer_unordered(self.config.entity_concurrency.max(1));

        while let Some((id, outcome)) = results.next().await {
            match outcome {
                Ok(()) => summary.stored += 1,
                Err(e) => {
                    warn!(constructor = %id, error = %e, "Race stats not refreshed");
                    summary.failed += 1;
                }
            }
        }

        if let Err(e) = self.cache.touch().await {
            warn!(error = %e, "Failed to update refresh timestamp");
        }

        info!(
            generation,
            updated = summary.stored,
            failed = summary.failed,
            "Race stats refresh complete"
        );
        Ok(summary)
    }

    async fn refresh_one(&self, generation: u64, id: &str) -> Result<(), EntityFailure> {
        let record = self
            .cache
            .load_record(generation, id)
            .await?
            .ok_or(EntityFailure::Missing)?;
        let updated = self.assembler.refresh_race_stats(&record).await?;
        self.cache.save_record(generation, &updated).await?;
        Ok(())
    }
}
