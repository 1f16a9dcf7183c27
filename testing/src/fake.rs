use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use errors::ApiError;
use gb_core::{
    ApiResponse, Criterion, CriterionInput, MessageResponse, Page, PageMetadata, PageRequest,
    Rubric, RubricApi, RubricInput, ScoringLevel, ScoringLevelInput
};
use tokio::sync::{Notify, RwLock};
use tracing::debug;

/// Call keys understood by [`InMemoryRubricApi`] counters, failures and
/// gates.
pub mod call {
    pub fn list_rubrics(instructor_uuid: &str) -> String {
        format!("list_rubrics:{instructor_uuid}")
    }

    pub fn list_criteria(rubric_uuid: &str) -> String {
        format!("list_criteria:{rubric_uuid}")
    }

    pub fn list_scoring(rubric_uuid: &str, criteria_uuid: &str) -> String {
        format!("list_scoring:{rubric_uuid}/{criteria_uuid}")
    }

    pub fn create_rubric() -> String {
        "create_rubric".to_string()
    }

    pub fn update_rubric(rubric_uuid: &str) -> String {
        format!("update_rubric:{rubric_uuid}")
    }

    pub fn delete_rubric(rubric_uuid: &str) -> String {
        format!("delete_rubric:{rubric_uuid}")
    }

    pub fn create_criterion(rubric_uuid: &str) -> String {
        format!("create_criterion:{rubric_uuid}")
    }

    pub fn update_criterion(rubric_uuid: &str, criteria_uuid: &str) -> String {
        format!("update_criterion:{rubric_uuid}/{criteria_uuid}")
    }

    pub fn delete_criterion(rubric_uuid: &str, criteria_uuid: &str) -> String {
        format!("delete_criterion:{rubric_uuid}/{criteria_uuid}")
    }

    pub fn create_scoring(rubric_uuid: &str, criteria_uuid: &str) -> String {
        format!("create_scoring:{rubric_uuid}/{criteria_uuid}")
    }

    pub fn update_scoring(rubric_uuid: &str, criteria_uuid: &str, scoring_uuid: &str) -> String {
        format!("update_scoring:{rubric_uuid}/{criteria_uuid}/{scoring_uuid}")
    }

    pub fn delete_scoring(rubric_uuid: &str, criteria_uuid: &str, scoring_uuid: &str) -> String {
        format!("delete_scoring:{rubric_uuid}/{criteria_uuid}/{scoring_uuid}")
    }
}

#[derive(Default)]
struct Store {
    /// (owner, rubric); the owner need not appear in the record itself.
    rubrics: Vec<(String, Rubric)>,
    criteria: Vec<Criterion>,
    scoring: Vec<ScoringLevel>
}

/// In-process rubric backend.
#[derive(Default)]
pub struct InMemoryRubricApi {
    store: RwLock<Store>,
    calls: DashMap<String, u64>,
    failures: DashMap<String, ApiError>,
    gates: DashMap<String, Arc<Notify>>,
    latency: DashMap<String, Duration>,
    messages: DashMap<String, String>,
    criteria_overrides: DashMap<String, Vec<Criterion>>,
    scoring_overrides: DashMap<(String, String), Vec<ScoringLevel>>
}

impl InMemoryRubricApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a rubric owned by its `instructor_uuid`.
    pub async fn with_rubric(self, rubric: Rubric) -> Self {
        let owner = rubric.instructor_uuid.clone().unwrap_or_default();
        self.with_rubric_for(&owner, rubric).await
    }

    /// Seed a rubric listed under `instructor_uuid` whatever the record says.
    pub async fn with_rubric_for(self, instructor_uuid: &str, rubric: Rubric) -> Self {
        self.store
            .write()
            .await
            .rubrics
            .push((instructor_uuid.to_string(), rubric));
        self
    }

    pub async fn with_criterion(self, criterion: Criterion) -> Self {
        self.store.write().await.criteria.push(criterion);
        self
    }

    pub async fn with_scoring(self, level: ScoringLevel) -> Self {
        self.store.write().await.scoring.push(level);
        self
    }

    /// Number of times the call identified by `key` was made.
    pub fn calls(&self, key: &str) -> u64 {
        self.calls.get(key).map_or(0, |count| *count)
    }

    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Calls whose key starts with `prefix`, e.g. `"list_"`.
    pub fn calls_with_prefix(&self, prefix: &str) -> u64 {
        self.calls
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn reset_calls(&self) {
        self.calls.clear();
    }

    /// Make every call identified by `key` fail with `error`.
    pub fn fail(&self, key: impl Into<String>, error: ApiError) {
        self.failures.insert(key.into(), error);
    }

    pub fn clear_failure(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Delay calls identified by `key`.
    pub fn delay(&self, key: impl Into<String>, latency: Duration) {
        self.latency.insert(key.into(), latency);
    }

    /// Hold the next call identified by `key` until the returned handle is
    /// notified.
    pub fn hold(&self, key: impl Into<String>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.insert(key.into(), Arc::clone(&gate));
        gate
    }

    /// Message returned by a successful mutation identified by `key`.
    pub fn respond_with_message(&self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(key.into(), message.into());
    }

    /// Serve `criteria` verbatim for the rubric, bypassing the store.
    pub fn override_criteria(&self, rubric_uuid: impl Into<String>, criteria: Vec<Criterion>) {
        self.criteria_overrides.insert(rubric_uuid.into(), criteria);
    }

    /// Serve `levels` verbatim for the pair, bypassing the store.
    pub fn override_scoring(
        &self,
        rubric_uuid: impl Into<String>,
        criteria_uuid: impl Into<String>,
        levels: Vec<ScoringLevel>
    ) {
        self.scoring_overrides
            .insert((rubric_uuid.into(), criteria_uuid.into()), levels);
    }

    pub async fn rubric_count(&self) -> usize {
        self.store.read().await.rubrics.len()
    }

    async fn enter(&self, key: String) -> Result<(), ApiError> {
        *self.calls.entry(key.clone()).or_insert(0) += 1;
        debug!(call = %key, "In-memory rubric API call");

        let latency = self.latency.get(&key).map(|entry| *entry.value());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let gate = self.gates.remove(&key).map(|(_, gate)| gate);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.failures.get(&key) {
            Some(error) => Err(error.value().clone()),
            None => Ok(())
        }
    }

    fn message(&self, key: &str, fallback: &str) -> String {
        self.messages
            .get(key)
            .map_or_else(|| fallback.to_string(), |entry| entry.value().clone())
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let size = page.size.max(1) as usize;
    let total = items.len();
    let total_pages = total.div_ceil(size) as u32;
    let start = (page.page as usize).saturating_mul(size).min(total);
    let end = (start + size).min(total);

    Page {
        content: items[start..end].to_vec(),
        metadata: Some(PageMetadata {
            page_number: page.page,
            page_size: page.size,
            total_elements: total as u64,
            total_pages,
            has_next: Some(page.page + 1 < total_pages),
            has_previous: Some(page.page > 0)
        })
    }
}

fn not_found(resource: &str, id: &str) -> ApiError {
    ApiError::NotFound {
        resource: resource.to_string(),
        id: id.to_string()
    }
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl RubricApi for InMemoryRubricApi {
    async fn list_rubrics(
        &self,
        instructor_uuid: &str,
        page: PageRequest
    ) -> Result<Page<Rubric>, ApiError> {
        self.enter(call::list_rubrics(instructor_uuid)).await?;
        let store = self.store.read().await;
        let owned: Vec<Rubric> = store
            .rubrics
            .iter()
            .filter(|(owner, _)| owner == instructor_uuid)
            .map(|(_, rubric)| rubric.clone())
            .collect();
        Ok(paginate(&owned, page))
    }

    async fn list_criteria(
        &self,
        rubric_uuid: &str,
        page: PageRequest
    ) -> Result<Page<Criterion>, ApiError> {
        self.enter(call::list_criteria(rubric_uuid)).await?;
        if let Some(list) = self.criteria_overrides.get(rubric_uuid) {
            return Ok(paginate(list.value(), page));
        }
        let store = self.store.read().await;
        let owned: Vec<Criterion> = store
            .criteria
            .iter()
            .filter(|criterion| criterion.rubric_uuid == rubric_uuid)
            .cloned()
            .collect();
        Ok(paginate(&owned, page))
    }

    async fn list_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        page: PageRequest
    ) -> Result<Page<ScoringLevel>, ApiError> {
        self.enter(call::list_scoring(rubric_uuid, criteria_uuid))
            .await?;
        let key = (rubric_uuid.to_string(), criteria_uuid.to_string());
        if let Some(list) = self.scoring_overrides.get(&key) {
            return Ok(paginate(list.value(), page));
        }
        let store = self.store.read().await;
        let owned: Vec<ScoringLevel> = store
            .scoring
            .iter()
            .filter(|level| level.criteria_uuid == criteria_uuid)
            .cloned()
            .collect();
        Ok(paginate(&owned, page))
    }

    async fn create_rubric(&self, input: &RubricInput) -> Result<ApiResponse<Rubric>, ApiError> {
        let key = call::create_rubric();
        self.enter(key.clone()).await?;
        let rubric = Rubric {
            uuid: new_uuid(),
            title: input.title.clone(),
            description: input.description.clone(),
            rubric_type: input.rubric_type.clone(),
            is_public: input.is_public,
            total_weight: input.total_weight,
            max_score: input.max_score,
            min_passing_score: input.min_passing_score,
            instructor_uuid: input.instructor_uuid.clone()
        };
        let owner = input.instructor_uuid.clone().unwrap_or_default();
        self.store
            .write()
            .await
            .rubrics
            .push((owner, rubric.clone()));
        Ok(ApiResponse::with_data(
            rubric,
            self.message(&key, "Rubric created")
        ))
    }

    async fn update_rubric(
        &self,
        rubric_uuid: &str,
        input: &RubricInput
    ) -> Result<ApiResponse<Rubric>, ApiError> {
        let key = call::update_rubric(rubric_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        let (_, rubric) = store
            .rubrics
            .iter_mut()
            .find(|(_, rubric)| rubric.uuid == rubric_uuid)
            .ok_or_else(|| not_found("rubric", rubric_uuid))?;
        if input.title.is_some() {
            rubric.title.clone_from(&input.title);
        }
        if input.description.is_some() {
            rubric.description.clone_from(&input.description);
        }
        if input.rubric_type.is_some() {
            rubric.rubric_type.clone_from(&input.rubric_type);
        }
        rubric.is_public = input.is_public.or(rubric.is_public);
        rubric.total_weight = input.total_weight.or(rubric.total_weight);
        rubric.max_score = input.max_score.or(rubric.max_score);
        rubric.min_passing_score = input.min_passing_score.or(rubric.min_passing_score);
        Ok(ApiResponse::with_data(
            rubric.clone(),
            self.message(&key, "Rubric updated")
        ))
    }

    async fn delete_rubric(&self, rubric_uuid: &str) -> Result<MessageResponse, ApiError> {
        let key = call::delete_rubric(rubric_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        let before = store.rubrics.len();
        store.rubrics.retain(|(_, rubric)| rubric.uuid != rubric_uuid);
        if store.rubrics.len() == before {
            return Err(not_found("rubric", rubric_uuid));
        }
        let removed: Vec<String> = store
            .criteria
            .iter()
            .filter(|criterion| criterion.rubric_uuid == rubric_uuid)
            .map(|criterion| criterion.uuid.clone())
            .collect();
        store
            .criteria
            .retain(|criterion| criterion.rubric_uuid != rubric_uuid);
        store
            .scoring
            .retain(|level| !removed.contains(&level.criteria_uuid));
        Ok(ApiResponse::message_only(
            self.message(&key, "Rubric deleted")
        ))
    }

    async fn create_criterion(
        &self,
        rubric_uuid: &str,
        input: &CriterionInput
    ) -> Result<ApiResponse<Criterion>, ApiError> {
        let key = call::create_criterion(rubric_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        if !store.rubrics.iter().any(|(_, rubric)| rubric.uuid == rubric_uuid) {
            return Err(not_found("rubric", rubric_uuid));
        }
        let criterion = Criterion {
            uuid: new_uuid(),
            rubric_uuid: rubric_uuid.to_string(),
            component_name: input.component_name.clone(),
            weight: input.weight,
            display_order: input.display_order
        };
        store.criteria.push(criterion.clone());
        Ok(ApiResponse::with_data(
            criterion,
            self.message(&key, "Criterion created")
        ))
    }

    async fn update_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &CriterionInput
    ) -> Result<ApiResponse<Criterion>, ApiError> {
        let key = call::update_criterion(rubric_uuid, criteria_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        let criterion = store
            .criteria
            .iter_mut()
            .find(|c| c.uuid == criteria_uuid && c.rubric_uuid == rubric_uuid)
            .ok_or_else(|| not_found("criterion", criteria_uuid))?;
        if input.component_name.is_some() {
            criterion.component_name.clone_from(&input.component_name);
        }
        criterion.weight = input.weight.or(criterion.weight);
        criterion.display_order = input.display_order.or(criterion.display_order);
        Ok(ApiResponse::with_data(
            criterion.clone(),
            self.message(&key, "Criterion updated")
        ))
    }

    async fn delete_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str
    ) -> Result<MessageResponse, ApiError> {
        let key = call::delete_criterion(rubric_uuid, criteria_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        let before = store.criteria.len();
        store
            .criteria
            .retain(|c| !(c.uuid == criteria_uuid && c.rubric_uuid == rubric_uuid));
        if store.criteria.len() == before {
            return Err(not_found("criterion", criteria_uuid));
        }
        store
            .scoring
            .retain(|level| level.criteria_uuid != criteria_uuid);
        Ok(ApiResponse::message_only(
            self.message(&key, "Criterion deleted")
        ))
    }

    async fn create_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<ApiResponse<ScoringLevel>, ApiError> {
        let key = call::create_scoring(rubric_uuid, criteria_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        if !store
            .criteria
            .iter()
            .any(|c| c.uuid == criteria_uuid && c.rubric_uuid == rubric_uuid)
        {
            return Err(not_found("criterion", criteria_uuid));
        }
        let level = ScoringLevel {
            uuid: new_uuid(),
            criteria_uuid: criteria_uuid.to_string(),
            performance_expectation: input.performance_expectation.clone(),
            description: input.description.clone(),
            score_range: input.score_range.clone(),
            is_passing: input.is_passing
        };
        store.scoring.push(level.clone());
        Ok(ApiResponse::with_data(
            level,
            self.message(&key, "Scoring level created")
        ))
    }

    async fn update_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<ApiResponse<ScoringLevel>, ApiError> {
        let key = call::update_scoring(rubric_uuid, criteria_uuid, scoring_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        let level = store
            .scoring
            .iter_mut()
            .find(|level| level.uuid == scoring_uuid && level.criteria_uuid == criteria_uuid)
            .ok_or_else(|| not_found("scoring level", scoring_uuid))?;
        if input.performance_expectation.is_some() {
            level
                .performance_expectation
                .clone_from(&input.performance_expectation);
        }
        if input.description.is_some() {
            level.description.clone_from(&input.description);
        }
        if input.score_range.is_some() {
            level.score_range.clone_from(&input.score_range);
        }
        level.is_passing = input.is_passing.or(level.is_passing);
        Ok(ApiResponse::with_data(
            level.clone(),
            self.message(&key, "Scoring level updated")
        ))
    }

    async fn delete_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str
    ) -> Result<MessageResponse, ApiError> {
        let key = call::delete_scoring(rubric_uuid, criteria_uuid, scoring_uuid);
        self.enter(key.clone()).await?;
        let mut store = self.store.write().await;
        let before = store.scoring.len();
        store
            .scoring
            .retain(|level| !(level.uuid == scoring_uuid && level.criteria_uuid == criteria_uuid));
        if store.scoring.len() == before {
            return Err(not_found("scoring level", scoring_uuid));
        }
        Ok(ApiResponse::message_only(
            self.message(&key, "Scoring level deleted")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_metadata() {
        let items: Vec<u32> = (0..5).collect();
        let first = paginate(&items, PageRequest { page: 0, size: 2 });
        assert_eq!(first.content, vec![0, 1]);
        assert!(first.has_more());

        let last = paginate(&items, PageRequest { page: 2, size: 2 });
        assert_eq!(last.content, vec![4]);
        assert!(!last.has_more());
    }

    #[tokio::test]
    async fn test_counts_and_failures() {
        let api = InMemoryRubricApi::new();
        api.fail(call::list_criteria("r1"), ApiError::Status {
            status: 500,
            message: "boom".to_string()
        });

        assert!(api.list_criteria("r1", PageRequest::first(10)).await.is_err());
        assert!(api.list_criteria("r2", PageRequest::first(10)).await.is_ok());
        assert_eq!(api.calls(&call::list_criteria("r1")), 1);
        assert_eq!(api.calls_with_prefix("list_criteria"), 2);
    }

    #[tokio::test]
    async fn test_delete_rubric_cascades() {
        let api = InMemoryRubricApi::new()
            .with_rubric(Rubric {
                instructor_uuid: Some("ins-1".to_string()),
                ..Rubric::new("r1")
            })
            .await
            .with_criterion(Criterion::new("c1", "r1"))
            .await
            .with_scoring(ScoringLevel::new("s1", "c1"))
            .await;

        api.delete_rubric("r1").await.unwrap();

        let page = PageRequest::first(10);
        assert!(api.list_criteria("r1", page).await.unwrap().content.is_empty());
        assert!(api.list_scoring("r1", "c1", page).await.unwrap().content.is_empty());
        assert!(matches!(
            api.delete_rubric("r1").await,
            Err(ApiError::NotFound { .. })
        ));
    }
}
