//! Fan-out loader for an instructor's rubric trees.
//!
//! # Pipeline
//!
//! 1. Fetch the instructor's rubrics.
//! 2. Fetch the criteria of every rubric concurrently.
//! 3. Flatten the criteria into (rubric, criterion) pairs.
//! 4. Fetch the scoring levels of every pair concurrently.
//! 5. Join the three levels by identifier into [`RubricTree`]s.
//!
//! A failing request never aborts the whole load: whatever was fetched is
//! still assembled and the failures are reported alongside it. Without an
//! owner nothing is requested at all.

use std::collections::HashMap;
use std::sync::Arc;

use errors::ApiError;
use futures_util::future::join_all;
use gb_core::{Criterion, Rubric, RubricTree, ScoringLevel};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{Cacheable, QueryKey, QueryState, QueryStatus};
use crate::queries::RubricQueries;
use crate::tree::{CriterionPair, assemble, criterion_pairs};

/// One failed collection request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFailure {
    pub key: QueryKey,
    pub error: ApiError
}

/// Outcome of loading (or snapshotting) an instructor's rubrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub trees: Vec<RubricTree>,
    pub is_loading: bool,
    pub is_error: bool,
    #[serde(skip)]
    pub errors: Vec<QueryFailure>
}

impl AggregateResult {
    fn from_parts(trees: Vec<RubricTree>, is_loading: bool, errors: Vec<QueryFailure>) -> Self {
        Self {
            trees,
            is_loading,
            is_error: !errors.is_empty(),
            errors
        }
    }

    pub fn rubric(&self, rubric_uuid: &str) -> Option<&RubricTree> {
        self.trees.iter().find(|tree| tree.rubric.uuid == rubric_uuid)
    }

    /// First recorded error, for a one-line summary.
    pub fn first_error(&self) -> Option<&ApiError> {
        self.errors.first().map(|failure| &failure.error)
    }
}

pub struct RubricAggregator {
    queries: Arc<RubricQueries>
}

impl RubricAggregator {
    pub fn new(queries: Arc<RubricQueries>) -> Self {
        Self { queries }
    }

    pub fn queries(&self) -> &Arc<RubricQueries> {
        &self.queries
    }

    /// Load every rubric tree for `instructor_uuid`.
    pub async fn load(&self, instructor_uuid: Option<&str>) -> AggregateResult {
        let Some(owner) = instructor_uuid.filter(|id| !id.is_empty()) else {
            debug!("No instructor selected, skipping rubric load");
            return AggregateResult::default();
        };

        let mut errors = Vec::new();
        let rubrics = match self.queries.rubrics(owner).await {
            Ok(rubrics) => rubrics,
            Err(error) => {
                // Keep showing whatever the cache still holds for this owner.
                let mut fallback = self.snapshot(Some(owner)).await;
                let key = QueryKey::rubrics(owner);
                if !fallback.errors.iter().any(|failure| failure.key == key) {
                    fallback.errors.insert(0, QueryFailure { key, error });
                }
                fallback.is_loading = false;
                fallback.is_error = true;
                return fallback;
            }
        };

        let criteria_results = join_all(
            rubrics
                .iter()
                .filter(|rubric| !rubric.uuid.is_empty())
                .map(|rubric| async move {
                    (rubric.uuid.as_str(), self.queries.criteria(&rubric.uuid).await)
                })
        )
        .await;

        let mut criteria: HashMap<String, Vec<Criterion>> = HashMap::new();
        for (rubric_uuid, result) in criteria_results {
            match result {
                Ok(list) => {
                    criteria.insert(rubric_uuid.to_string(), list);
                }
                Err(error) => {
                    let key = QueryKey::criteria(rubric_uuid);
                    if let Some(list) = self.retained(&key).await {
                        criteria.insert(rubric_uuid.to_string(), list);
                    }
                    errors.push(QueryFailure { key, error });
                }
            }
        }

        let pairs = criterion_pairs(&rubrics, &criteria);
        let scoring_results = join_all(pairs.into_iter().map(|pair| async move {
            let result = self
                .queries
                .scoring(&pair.rubric_uuid, &pair.criteria_uuid)
                .await;
            (pair, result)
        }))
        .await;

        let mut scoring: HashMap<CriterionPair, Vec<ScoringLevel>> = HashMap::new();
        for (pair, result) in scoring_results {
            match result {
                Ok(levels) => {
                    scoring.insert(pair, levels);
                }
                Err(error) => {
                    let key = QueryKey::scoring(&pair.rubric_uuid, &pair.criteria_uuid);
                    if let Some(levels) = self.retained(&key).await {
                        scoring.insert(pair, levels);
                    }
                    errors.push(QueryFailure { key, error });
                }
            }
        }

        let trees = assemble(&rubrics, &criteria, &scoring);
        info!(
            instructor = %owner,
            rubrics = trees.len(),
            criteria = criteria.values().map(Vec::len).sum::<usize>(),
            scoring_levels = scoring.values().map(Vec::len).sum::<usize>(),
            failures = errors.len(),
            "Loaded rubric trees"
        );

        AggregateResult::from_parts(trees, false, errors)
    }

    /// Data a failed refetch left behind in the cache.
    async fn retained<T: Cacheable>(&self, key: &QueryKey) -> Option<Vec<T>> {
        self.queries.cache().state(key).await.data.and_then(T::unwrap)
    }

    /// Assemble whatever the cache currently holds, without any requests.
    ///
    /// Loading is reported while any needed collection is being fetched or
    /// has never been fetched. Data kept from before a failed refetch is
    /// still shown.
    pub async fn snapshot(&self, instructor_uuid: Option<&str>) -> AggregateResult {
        let Some(owner) = instructor_uuid.filter(|id| !id.is_empty()) else {
            return AggregateResult::default();
        };

        let cache = self.queries.cache();
        let mut errors = Vec::new();
        let mut is_loading = false;

        let rubrics_key = QueryKey::rubrics(owner);
        let state = cache.state(&rubrics_key).await;
        let rubrics: Vec<Rubric> = collect_state(rubrics_key, state, &mut is_loading, &mut errors);

        let mut criteria: HashMap<String, Vec<Criterion>> = HashMap::new();
        for rubric in rubrics.iter().filter(|rubric| !rubric.uuid.is_empty()) {
            let key = QueryKey::criteria(&rubric.uuid);
            let state = cache.state(&key).await;
            let list = collect_state(key, state, &mut is_loading, &mut errors);
            criteria.insert(rubric.uuid.clone(), list);
        }

        let mut scoring: HashMap<CriterionPair, Vec<ScoringLevel>> = HashMap::new();
        for pair in criterion_pairs(&rubrics, &criteria) {
            let key = QueryKey::scoring(&pair.rubric_uuid, &pair.criteria_uuid);
            let state = cache.state(&key).await;
            let levels = collect_state(key, state, &mut is_loading, &mut errors);
            scoring.insert(pair, levels);
        }

        let trees = assemble(&rubrics, &criteria, &scoring);
        AggregateResult::from_parts(trees, is_loading, errors)
    }
}

fn collect_state<T: Cacheable>(
    key: QueryKey,
    state: QueryState,
    is_loading: &mut bool,
    errors: &mut Vec<QueryFailure>
) -> Vec<T> {
    *is_loading |= state.is_loading();
    if state.status == QueryStatus::Error {
        if let Some(error) = state.error {
            errors.push(QueryFailure { key, error });
        }
    }
    state.data.and_then(T::unwrap).unwrap_or_default()
}
