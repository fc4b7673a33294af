use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheError, KvStore};
use crate::models::ConstructorRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Negative ages come from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                // Round up: 1d 12h+ becomes 2d
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Constructor records in the key-value store, organised in generations.
///
/// Layout under the namespace `ns`:
/// - `ns:gen:<n>:<constructor id>` holds one serialized record
/// - `ns:current` holds a `CachedData<u64>` naming the live generation
///
/// Readers only look at the live generation, so a new one can be written in
/// full before a single `set` of the pointer makes it visible.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KvStore>,
    namespace: String,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    fn pointer_key(&self) -> String {
        format!("{}:current", self.namespace)
    }

    fn generations_prefix(&self) -> String {
        format!("{}:gen:", self.namespace)
    }

    fn generation_prefix(&self, generation: u64) -> String {
        format!("{}:gen:{}:", self.namespace, generation)
    }

    fn record_key(&self, generation: u64, id: &str) -> String {
        format!("{}{}", self.generation_prefix(generation), id)
    }

    /// The live generation and when it was last written, if any.
    ///
    /// An undecodable pointer counts as no live generation, so the next
    /// promotion replaces it.
    pub async fn current(&self) -> Result<Option<CachedData<u64>>, CacheError> {
        let key = self.pointer_key();
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring undecodable generation pointer");
                Ok(None)
            }
        }
    }

    pub async fn current_generation(&self) -> Result<Option<u64>, CacheError> {
        Ok(self.current().await?.map(|pointer| pointer.data))
    }

    /// Make `generation` the live one.
    pub async fn promote(&self, generation: u64) -> Result<(), CacheError> {
        let pointer = serde_json::to_string(&CachedData::new(generation))?;
        self.store.set(&self.pointer_key(), &pointer).await?;
        debug!(generation, "Generation promoted");
        Ok(())
    }

    /// Re-stamp the live generation after an in-place update.
    pub async fn touch(&self) -> Result<(), CacheError> {
        match self.current_generation().await? {
            Some(generation) => self.promote(generation).await,
            None => Ok(()),
        }
    }

    /// Ids of every record stored in `generation`.
    pub async fn record_ids(&self, generation: u64) -> Result<Vec<String>, CacheError> {
        let prefix = self.generation_prefix(generation);
        let keys = self.store.keys(&prefix).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    pub async fn load_record(
        &self,
        generation: u64,
        id: &str,
    ) -> Result<Option<ConstructorRecord>, CacheError> {
        let key = self.record_key(generation, id);
        match self.store.get(&key).await? {
            Some(raw) => {
                let record = serde_json::from_str(&raw)
                    .map_err(|source| CacheError::Corrupt { key, source })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub async fn save_record(
        &self,
        generation: u64,
        record: &ConstructorRecord,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(record)?;
        self.store
            .set(&self.record_key(generation, &record.id), &json)
            .await
    }

    /// Every record of the live generation, most titles first.
    ///
    /// Entries that no longer decode are logged and left out.
    pub async fn list_records(&self) -> Result<Vec<ConstructorRecord>, CacheError> {
        let Some(generation) = self.current_generation().await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for id in self.record_ids(generation).await? {
            match self.load_record(generation, &id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(constructor = %id, "Record vanished while listing"),
                Err(CacheError::Corrupt { key, source }) => {
                    warn!(key = %key, error = %source, "Skipping undecodable record");
                }
                Err(e) => return Err(e),
            }
        }

        records.sort_by(|a, b| {
            b.title_count
                .cmp(&a.title_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(records)
    }

    /// Delete every record of `generation`. Returns how many were removed.
    pub async fn clear_generation(&self, generation: u64) -> Result<usize, CacheError> {
        let keys = self.store.keys(&self.generation_prefix(generation)).await?;
        self.store.delete(&keys).await?;
        Ok(keys.len())
    }

    /// Delete the records of every generation except `keep`.
    pub async fn discard_stale_generations(&self, keep: u64) -> Result<usize, CacheError> {
        let live = self.generation_prefix(keep);
        let stale: Vec<String> = self
            .store
            .keys(&self.generations_prefix())
            .await?
            .into_iter()
            .filter(|k| !k.starts_with(&live))
            .collect();
        self.store.delete(&stale).await?;
        Ok(stale.len())
    }

    /// Empty the whole store.
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.store.flush_all().await
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.store.ping().await
    }
}
