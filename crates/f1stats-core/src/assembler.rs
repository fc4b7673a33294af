//! Builds one complete `ConstructorRecord` from several upstream calls.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::api::{ApiError, StatsSource};
use crate::flags::FlagTable;
use crate::models::{ConstructorInfo, ConstructorRecord};

/// A single constructor could not be assembled. No record was produced.
#[derive(Error, Debug)]
#[error("Failed to assemble {entity_id}: {source}")]
pub struct AssemblyError {
    pub entity_id: String,
    #[source]
    pub source: ApiError,
}

impl AssemblyError {
    fn new(entity_id: &str, source: ApiError) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            source,
        }
    }
}

#[derive(Clone)]
pub struct RecordAssembler {
    source: Arc<dyn StatsSource>,
    flags: Arc<FlagTable>,
}

impl RecordAssembler {
    pub fn new(source: Arc<dyn StatsSource>, flags: Arc<FlagTable>) -> Self {
        Self { source, flags }
    }

    /// Fetch everything known about a constructor and derive the display fields.
    ///
    /// The four lookups run concurrently. The first failure wins and nothing
    /// is returned for the constructor.
    pub async fn assemble(&self, info: &ConstructorInfo) -> Result<ConstructorRecord, AssemblyError> {
        let id = info.id.as_str();
        debug!(constructor = id, "Assembling record");

        let (title_years, race_starts, race_wins, active_years) = tokio::try_join!(
            self.source.list_title_seasons(id),
            self.source.count_race_starts(id),
            self.source.count_race_wins(id),
            self.source.list_active_seasons(id),
        )
        .map_err(|e| AssemblyError::new(id, e))?;

        check_race_counts(race_starts, race_wins).map_err(|e| AssemblyError::new(id, e))?;

        Ok(ConstructorRecord::new(
            info,
            self.flags.lookup(&info.nationality),
            title_years,
            active_years,
            race_starts,
            race_wins,
        ))
    }

    /// Re-fetch only the race counters of an existing record.
    ///
    /// Title and active seasons are the expensive part of a record and are
    /// carried over untouched.
    pub async fn refresh_race_stats(
        &self,
        record: &ConstructorRecord,
    ) -> Result<ConstructorRecord, AssemblyError> {
        let id = record.id.as_str();
        debug!(constructor = id, "Refreshing race stats");

        let (race_starts, race_wins) = tokio::try_join!(
            self.source.count_race_starts(id),
            self.source.count_race_wins(id),
        )
        .map_err(|e| AssemblyError::new(id, e))?;

        check_race_counts(race_starts, race_wins).map_err(|e| AssemblyError::new(id, e))?;

        Ok(record.clone().with_race_stats(race_starts, race_wins))
    }
}

fn check_race_counts(race_starts: u32, race_wins: u32) -> Result<(), ApiError> {
    if race_wins > race_starts {
        return Err(ApiError::Format(format!(
            "{} wins reported from only {} starts",
            race_wins, race_starts
        )));
    }
    Ok(())
}
