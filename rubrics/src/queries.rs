//! Cache-aware collection queries.
//!
//! Each query reads one collection scope, walking every page the backend
//! reports, and records the outcome in the shared [`QueryCache`].

use std::future::Future;
use std::sync::Arc;

use errors::ApiError;
use gb_core::{Criterion, Page, PageRequest, Rubric, RubricApi, ScoringLevel};
use tracing::{debug, warn};

use crate::cache::{Cacheable, QueryCache, QueryKey};

pub struct RubricQueries {
    api: Arc<dyn RubricApi>,
    cache: Arc<QueryCache>,
    page_size: u32,
    max_pages: u32
}

impl RubricQueries {
    pub fn new(api: Arc<dyn RubricApi>, cache: Arc<QueryCache>, page_size: u32, max_pages: u32) -> Self {
        Self {
            api,
            cache,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1)
        }
    }

    pub fn from_config(
        api: Arc<dyn RubricApi>,
        cache: Arc<QueryCache>,
        config: &config::ApiConfig
    ) -> Self {
        Self::new(api, cache, config.page_size, config.max_pages)
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn api(&self) -> &Arc<dyn RubricApi> {
        &self.api
    }

    /// Rubrics owned by `instructor_uuid`.
    pub async fn rubrics(&self, instructor_uuid: &str) -> Result<Vec<Rubric>, ApiError> {
        let fetch = self.collect_pages(move |page| self.api.list_rubrics(instructor_uuid, page));
        self.run(QueryKey::rubrics(instructor_uuid), fetch).await
    }

    /// Criteria of one rubric.
    pub async fn criteria(&self, rubric_uuid: &str) -> Result<Vec<Criterion>, ApiError> {
        let fetch = self.collect_pages(move |page| self.api.list_criteria(rubric_uuid, page));
        self.run(QueryKey::criteria(rubric_uuid), fetch).await
    }

    /// Scoring levels of one criterion.
    pub async fn scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str
    ) -> Result<Vec<ScoringLevel>, ApiError> {
        let fetch = self.collect_pages(move |page| {
            self.api.list_scoring(rubric_uuid, criteria_uuid, page)
        });
        self.run(QueryKey::scoring(rubric_uuid, criteria_uuid), fetch)
            .await
    }

    async fn run<T, Fut>(&self, key: QueryKey, fetch: Fut) -> Result<Vec<T>, ApiError>
    where
        T: Cacheable,
        Fut: Future<Output = Result<Vec<T>, ApiError>>
    {
        if let Some(hit) = self.cache.lookup(&key).await.and_then(T::unwrap) {
            return Ok(hit);
        }

        let token = self.cache.begin_fetch(&key).await;
        let result = fetch.await;
        let recorded = match &result {
            Ok(items) => {
                debug!(key = %key, count = items.len(), "Fetched collection");
                Ok(T::wrap(items.clone()))
            }
            Err(error) => {
                warn!(key = %key, error = %error, "Collection fetch failed");
                Err(error.clone())
            }
        };
        self.cache.complete(&key, token, recorded).await;
        result
    }

    /// Follow pages until the backend reports no more, or `max_pages` is hit.
    async fn collect_pages<T, F, Fut>(&self, mut fetch_page: F) -> Result<Vec<T>, ApiError>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>
    {
        let mut items = Vec::new();
        let mut request = PageRequest::first(self.page_size);

        for _ in 0..self.max_pages {
            let page = fetch_page(request).await?;
            let has_more = page.has_more() && !page.content.is_empty();
            items.extend(page.content);
            if !has_more {
                return Ok(items);
            }
            request = request.next();
        }

        warn!(
            max_pages = self.max_pages,
            collected = items.len(),
            "Stopped following pages at the configured limit"
        );
        Ok(items)
    }
}
