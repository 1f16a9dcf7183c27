//! Backend trait for the rubric REST resources.

use async_trait::async_trait;
use errors::ApiError;

use crate::types::{
    ApiResponse, Criterion, CriterionInput, MessageResponse, Page, PageRequest, Rubric,
    RubricInput, ScoringLevel, ScoringLevelInput
};

/// The three rubric resource collections and their mutations.
///
/// Paths are addressed by owner identifiers: criteria live under a rubric,
/// scoring levels under a (rubric, criterion) pair. All identifiers are
/// opaque strings.
#[async_trait]
pub trait RubricApi: Send + Sync {
    async fn list_rubrics(
        &self,
        instructor_uuid: &str,
        page: PageRequest
    ) -> Result<Page<Rubric>, ApiError>;

    async fn list_criteria(
        &self,
        rubric_uuid: &str,
        page: PageRequest
    ) -> Result<Page<Criterion>, ApiError>;

    async fn list_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        page: PageRequest
    ) -> Result<Page<ScoringLevel>, ApiError>;

    async fn create_rubric(&self, input: &RubricInput) -> Result<ApiResponse<Rubric>, ApiError>;

    async fn update_rubric(
        &self,
        rubric_uuid: &str,
        input: &RubricInput
    ) -> Result<ApiResponse<Rubric>, ApiError>;

    async fn delete_rubric(&self, rubric_uuid: &str) -> Result<MessageResponse, ApiError>;

    async fn create_criterion(
        &self,
        rubric_uuid: &str,
        input: &CriterionInput
    ) -> Result<ApiResponse<Criterion>, ApiError>;

    async fn update_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &CriterionInput
    ) -> Result<ApiResponse<Criterion>, ApiError>;

    async fn delete_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str
    ) -> Result<MessageResponse, ApiError>;

    async fn create_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<ApiResponse<ScoringLevel>, ApiError>;

    async fn update_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<ApiResponse<ScoringLevel>, ApiError>;

    async fn delete_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str
    ) -> Result<MessageResponse, ApiError>;
}
