use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, StatsSource};
use crate::cache::{CacheError, KvStore, MemoryStore};
use crate::models::{ConstructorInfo, Season};

#[derive(Clone, Default)]
struct Scripted {
    titles: Vec<Season>,
    active: Vec<Season>,
    starts: u32,
    wins: u32,
}

#[derive(Default)]
struct State {
    champions: Vec<ConstructorInfo>,
    data: HashMap<String, Scripted>,
    failing: HashSet<String>,
    champions_down: bool,
    delay: Option<Duration>,
    call_delay: Option<Duration>,
    in_flight: usize,
    peak_in_flight: usize,
}

/// In-memory `StatsSource` with canned answers and switchable failures.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<State>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constructor(
        self,
        id: &str,
        nationality: &str,
        titles: &[Season],
        active: Vec<Season>,
        starts: u32,
        wins: u32,
    ) -> Self {
        self.add_constructor(id, nationality, titles, active, starts, wins);
        self
    }

    pub fn add_constructor(
        &self,
        id: &str,
        nationality: &str,
        titles: &[Season],
        active: Vec<Season>,
        starts: u32,
        wins: u32,
    ) {
        let mut state = self.state.lock().unwrap();
        state.champions.push(ConstructorInfo {
            id: id.to_string(),
            url: format!("http://en.wikipedia.org/wiki/{}", id),
            name: capitalize(id),
            nationality: nationality.to_string(),
        });
        state.data.insert(
            id.to_string(),
            Scripted {
                titles: titles.to_vec(),
                active,
                starts,
                wins,
            },
        );
    }

    pub fn failing(self, id: &str) -> Self {
        self.set_failing(id, true);
        self
    }

    pub fn set_failing(&self, id: &str, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.failing.insert(id.to_string());
        } else {
            state.failing.remove(id);
        }
    }

    /// Make the champions listing wait before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Make every per-constructor lookup wait before answering.
    pub fn set_call_delay(&self, delay: Duration) {
        self.state.lock().unwrap().call_delay = Some(delay);
    }

    /// Most per-constructor lookups that were ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().unwrap().peak_in_flight
    }

    pub fn set_champions_down(&self, down: bool) {
        self.state.lock().unwrap().champions_down = down;
    }

    pub fn set_race_counts(&self, id: &str, starts: u32, wins: u32) {
        let mut state = self.state.lock().unwrap();
        let entry = state.data.entry(id.to_string()).or_default();
        entry.starts = starts;
        entry.wins = wins;
    }

    pub fn info(&self, id: &str) -> ConstructorInfo {
        let state = self.state.lock().unwrap();
        state
            .champions
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap()
    }

    async fn lookup(&self, id: &str) -> Result<Scripted, ApiError> {
        let pause = {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            state.call_delay
        };
        if let Some(pause) = pause {
            tokio::time::sleep(pause).await;
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        if state.failing.contains(id) {
            return Err(ApiError::Unavailable(format!("scripted failure for {}", id)));
        }
        state
            .data
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Format(format!("unknown constructor {}", id)))
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl StatsSource for ScriptedSource {
    async fn list_champion_entities(&self) -> Result<Vec<ConstructorInfo>, ApiError> {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        if state.champions_down {
            return Err(ApiError::Unavailable("scripted outage".to_string()));
        }
        Ok(state.champions.clone())
    }

    async fn list_title_seasons(&self, constructor_id: &str) -> Result<Vec<Season>, ApiError> {
        Ok(self.lookup(constructor_id).await?.titles)
    }

    async fn count_race_starts(&self, constructor_id: &str) -> Result<u32, ApiError> {
        Ok(self.lookup(constructor_id).await?.starts)
    }

    async fn count_race_wins(&self, constructor_id: &str) -> Result<u32, ApiError> {
        Ok(self.lookup(constructor_id).await?.wins)
    }

    async fn list_active_seasons(&self, constructor_id: &str) -> Result<Vec<Season>, ApiError> {
        Ok(self.lookup(constructor_id).await?.active)
    }
}

/// `MemoryStore` that refuses writes of one constructor's records.
pub struct FlakyStore {
    inner: MemoryStore,
    broken_id: String,
}

impl FlakyStore {
    pub fn new(broken_id: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            broken_id: broken_id.to_string(),
        }
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        self.inner.keys(prefix).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if key.ends_with(&format!(":{}", self.broken_id)) {
            return Err(CacheError::Unavailable("scripted write failure".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        self.inner.delete(keys).await
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        self.inner.flush_all().await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.inner.ping().await
    }
}
