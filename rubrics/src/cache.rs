//! Process-wide query cache keyed per collection scope.
//!
//! Each scope (an instructor's rubrics, a rubric's criteria, a criterion's
//! scoring levels) has one entry. Invalidating a scope marks exactly that
//! entry stale; sibling entries are untouched. Every invalidation and every
//! new fetch bumps the entry generation, and a fetch only writes its result
//! if the generation it started with is still current. Entries of deleted
//! records are removed outright, and a result arriving for a removed entry
//! is dropped.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use errors::ApiError;
use gb_core::{Criterion, Rubric, ScoringLevel};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Scope of one cached collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Rubrics {
        instructor_uuid: String
    },
    Criteria {
        rubric_uuid: String
    },
    Scoring {
        rubric_uuid: String,
        criteria_uuid: String
    }
}

impl QueryKey {
    pub fn rubrics(instructor_uuid: impl Into<String>) -> Self {
        Self::Rubrics {
            instructor_uuid: instructor_uuid.into()
        }
    }

    pub fn criteria(rubric_uuid: impl Into<String>) -> Self {
        Self::Criteria {
            rubric_uuid: rubric_uuid.into()
        }
    }

    pub fn scoring(rubric_uuid: impl Into<String>, criteria_uuid: impl Into<String>) -> Self {
        Self::Scoring {
            rubric_uuid: rubric_uuid.into(),
            criteria_uuid: criteria_uuid.into()
        }
    }

    /// Whether this scope lives under the given rubric.
    pub fn belongs_to_rubric(&self, rubric: &str) -> bool {
        match self {
            Self::Rubrics { .. } => false,
            Self::Criteria { rubric_uuid } | Self::Scoring { rubric_uuid, .. } => {
                rubric_uuid == rubric
            }
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rubrics { instructor_uuid } => write!(f, "rubrics[{instructor_uuid}]"),
            Self::Criteria { rubric_uuid } => write!(f, "criteria[{rubric_uuid}]"),
            Self::Scoring {
                rubric_uuid,
                criteria_uuid
            } => write!(f, "scoring[{rubric_uuid}/{criteria_uuid}]")
        }
    }
}

/// A cached collection of one of the three entity levels.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedCollection {
    Rubrics(Vec<Rubric>),
    Criteria(Vec<Criterion>),
    Scoring(Vec<ScoringLevel>)
}

impl CachedCollection {
    pub fn len(&self) -> usize {
        match self {
            Self::Rubrics(items) => items.len(),
            Self::Criteria(items) => items.len(),
            Self::Scoring(items) => items.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Record types that can be stored in the cache.
pub trait Cacheable: Clone + Sized {
    fn wrap(items: Vec<Self>) -> CachedCollection;
    fn unwrap(collection: CachedCollection) -> Option<Vec<Self>>;
}

impl Cacheable for Rubric {
    fn wrap(items: Vec<Self>) -> CachedCollection {
        CachedCollection::Rubrics(items)
    }

    fn unwrap(collection: CachedCollection) -> Option<Vec<Self>> {
        match collection {
            CachedCollection::Rubrics(items) => Some(items),
            _ => None
        }
    }
}

impl Cacheable for Criterion {
    fn wrap(items: Vec<Self>) -> CachedCollection {
        CachedCollection::Criteria(items)
    }

    fn unwrap(collection: CachedCollection) -> Option<Vec<Self>> {
        match collection {
            CachedCollection::Criteria(items) => Some(items),
            _ => None
        }
    }
}

impl Cacheable for ScoringLevel {
    fn wrap(items: Vec<Self>) -> CachedCollection {
        CachedCollection::Scoring(items)
    }

    fn unwrap(collection: CachedCollection) -> Option<Vec<Self>> {
        match collection {
            CachedCollection::Scoring(items) => Some(items),
            _ => None
        }
    }
}

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    Fetching,
    Success,
    Error
}

/// Point-in-time view of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<CachedCollection>,
    pub error: Option<ApiError>,
    pub is_stale: bool
}

impl QueryState {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_stale: true
        }
    }

    /// Loading means a fetch is running, or nothing has been fetched and no
    /// error has been recorded yet.
    pub fn is_loading(&self) -> bool {
        match self.status {
            QueryStatus::Fetching | QueryStatus::Idle => true,
            QueryStatus::Success | QueryStatus::Error => false
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

#[derive(Debug)]
struct QueryEntry {
    data: Option<CachedCollection>,
    error: Option<ApiError>,
    updated_at: Option<Instant>,
    stale: bool,
    generation: u64,
    in_flight: u32,
    last_outcome: QueryStatus
}

impl QueryEntry {
    fn new() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
            stale: true,
            generation: 0,
            in_flight: 0,
            last_outcome: QueryStatus::Idle
        }
    }

    fn status(&self) -> QueryStatus {
        if self.in_flight > 0 {
            QueryStatus::Fetching
        } else {
            self.last_outcome
        }
    }

    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.stale
            && self.last_outcome == QueryStatus::Success
            && self
                .updated_at
                .is_some_and(|at| at.elapsed() < stale_time)
    }
}

/// Ticket handed out by [`QueryCache::begin_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    generation: u64
}

pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, QueryEntry>>,
    enabled: bool,
    stale_time: Duration
}

impl QueryCache {
    pub fn new(enabled: bool, stale_time: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            enabled,
            stale_time
        }
    }

    pub fn from_config(config: &config::CacheConfig) -> Self {
        Self::new(config.enabled, config.stale_time())
    }

    /// Fresh data for `key`, if any. Always `None` when caching is disabled.
    pub async fn lookup(&self, key: &QueryKey) -> Option<CachedCollection> {
        if !self.enabled {
            return None;
        }

        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_fresh(self.stale_time) {
            trace!(key = %key, "Query cache hit");
            entry.data.clone()
        } else {
            None
        }
    }

    /// Mark `key` as fetching and return the token its result must present.
    pub async fn begin_fetch(&self, key: &QueryKey) -> FetchToken {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.clone()).or_insert_with(QueryEntry::new);
        entry.generation += 1;
        entry.in_flight += 1;
        FetchToken {
            generation: entry.generation
        }
    }

    /// Record a fetch result. Returns `false` when the result was discarded
    /// because the entry was invalidated, removed or re-fetched in the
    /// meantime.
    ///
    /// Errors keep the previously cached data so it stays displayable.
    pub async fn complete(
        &self,
        key: &QueryKey,
        token: FetchToken,
        result: Result<CachedCollection, ApiError>
    ) -> bool {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, "Discarding result for removed query");
            return false;
        };
        entry.in_flight = entry.in_flight.saturating_sub(1);

        if entry.generation != token.generation {
            debug!(key = %key, "Discarding superseded query result");
            return false;
        }

        match result {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.stale = false;
                entry.updated_at = Some(Instant::now());
                entry.last_outcome = QueryStatus::Success;
            }
            Err(error) => {
                entry.error = Some(error);
                entry.stale = true;
                entry.last_outcome = QueryStatus::Error;
            }
        }
        true
    }

    /// Mark exactly `key` stale. Returns whether an entry existed.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                entry.generation += 1;
                debug!(key = %key, "Invalidated query");
                true
            }
            None => false
        }
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub async fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            debug!(key = %key, "Removed query");
        }
        removed
    }

    /// Drop every entry matching `predicate` and return their keys.
    pub async fn remove_where<F>(&self, predicate: F) -> Vec<QueryKey>
    where
        F: Fn(&QueryKey) -> bool
    {
        let mut entries = self.entries.write().await;
        let removed: Vec<QueryKey> = entries.keys().filter(|key| predicate(key)).cloned().collect();
        for key in &removed {
            entries.remove(key);
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), "Removed queries");
        }
        removed
    }

    pub async fn state(&self, key: &QueryKey) -> QueryState {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => QueryState {
                status: entry.status(),
                data: entry.data.clone(),
                error: entry.error.clone(),
                is_stale: entry.stale || !entry.is_fresh(self.stale_time)
            },
            None => QueryState::idle()
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::from_config(&config::CacheConfig::default())
    }
}
