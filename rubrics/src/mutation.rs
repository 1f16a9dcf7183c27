//! Create, update and delete for the three rubric levels.
//!
//! A successful mutation invalidates exactly the collection it changed, so
//! the next load re-fetches that scope and nothing else. Deleting a parent
//! removes the cached collections underneath it, since they can never be
//! loaded again. Every outcome carries a notification, using the server's
//! message when it sent one.

use std::future::Future;
use std::sync::Arc;

use errors::ApiError;
use gb_core::{
    ApiResponse, Criterion, CriterionInput, EntityKind, Rubric, RubricApi, RubricInput,
    ScoringLevel, ScoringLevelInput
};
use tracing::{info, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::notify::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MutationAction {
    Create,
    Update,
    Delete
}

impl MutationAction {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<T> {
    pub data: Option<T>,
    pub notification: Notification,
    pub invalidated: Vec<QueryKey>
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct MutationFailure {
    pub kind: EntityKind,
    pub action: MutationAction,
    pub message: String,
    #[source]
    pub cause: ApiError
}

impl MutationFailure {
    pub fn notification(&self) -> Notification {
        Notification::error(self.message.clone())
    }
}

fn success_fallback(kind: EntityKind, action: MutationAction) -> String {
    let label = kind.label();
    let mut chars = label.chars();
    let capitalized = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect::<String>())
        .unwrap_or_default();
    format!("{capitalized} {} successfully", action.past_tense())
}

fn failure_fallback(kind: EntityKind, action: MutationAction) -> String {
    format!("Failed to {action} {}", kind.label())
}

pub struct RubricMutations {
    api: Arc<dyn RubricApi>,
    cache: Arc<QueryCache>
}

impl RubricMutations {
    pub fn new(api: Arc<dyn RubricApi>, cache: Arc<QueryCache>) -> Self {
        Self { api, cache }
    }

    pub async fn create_rubric(
        &self,
        instructor_uuid: &str,
        input: &RubricInput
    ) -> Result<MutationOutcome<Rubric>, MutationFailure> {
        let mut input = input.clone();
        if input.instructor_uuid.is_none() {
            input.instructor_uuid = Some(instructor_uuid.to_string());
        }
        self.run(
            EntityKind::Rubric,
            MutationAction::Create,
            Scope::exact(QueryKey::rubrics(instructor_uuid)),
            self.api.create_rubric(&input)
        )
        .await
    }

    pub async fn update_rubric(
        &self,
        instructor_uuid: &str,
        rubric_uuid: &str,
        input: &RubricInput
    ) -> Result<MutationOutcome<Rubric>, MutationFailure> {
        self.run(
            EntityKind::Rubric,
            MutationAction::Update,
            Scope::exact(QueryKey::rubrics(instructor_uuid)),
            self.api.update_rubric(rubric_uuid, input)
        )
        .await
    }

    pub async fn delete_rubric(
        &self,
        instructor_uuid: &str,
        rubric_uuid: &str
    ) -> Result<MutationOutcome<()>, MutationFailure> {
        self.run(
            EntityKind::Rubric,
            MutationAction::Delete,
            Scope::exact(QueryKey::rubrics(instructor_uuid)).removing_rubric(rubric_uuid),
            self.api.delete_rubric(rubric_uuid)
        )
        .await
        .map(MutationOutcome::without_data)
    }

    pub async fn create_criterion(
        &self,
        rubric_uuid: &str,
        input: &CriterionInput
    ) -> Result<MutationOutcome<Criterion>, MutationFailure> {
        self.run(
            EntityKind::Criterion,
            MutationAction::Create,
            Scope::exact(QueryKey::criteria(rubric_uuid)),
            self.api.create_criterion(rubric_uuid, input)
        )
        .await
    }

    pub async fn update_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &CriterionInput
    ) -> Result<MutationOutcome<Criterion>, MutationFailure> {
        self.run(
            EntityKind::Criterion,
            MutationAction::Update,
            Scope::exact(QueryKey::criteria(rubric_uuid)),
            self.api.update_criterion(rubric_uuid, criteria_uuid, input)
        )
        .await
    }

    pub async fn delete_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str
    ) -> Result<MutationOutcome<()>, MutationFailure> {
        self.run(
            EntityKind::Criterion,
            MutationAction::Delete,
            Scope::exact(QueryKey::criteria(rubric_uuid))
                .removing(QueryKey::scoring(rubric_uuid, criteria_uuid)),
            self.api.delete_criterion(rubric_uuid, criteria_uuid)
        )
        .await
        .map(MutationOutcome::without_data)
    }

    pub async fn create_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<MutationOutcome<ScoringLevel>, MutationFailure> {
        self.run(
            EntityKind::ScoringLevel,
            MutationAction::Create,
            Scope::exact(QueryKey::scoring(rubric_uuid, criteria_uuid)),
            self.api.create_scoring(rubric_uuid, criteria_uuid, input)
        )
        .await
    }

    pub async fn update_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<MutationOutcome<ScoringLevel>, MutationFailure> {
        self.run(
            EntityKind::ScoringLevel,
            MutationAction::Update,
            Scope::exact(QueryKey::scoring(rubric_uuid, criteria_uuid)),
            self.api
                .update_scoring(rubric_uuid, criteria_uuid, scoring_uuid, input)
        )
        .await
    }

    pub async fn delete_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str
    ) -> Result<MutationOutcome<()>, MutationFailure> {
        self.run(
            EntityKind::ScoringLevel,
            MutationAction::Delete,
            Scope::exact(QueryKey::scoring(rubric_uuid, criteria_uuid)),
            self.api
                .delete_scoring(rubric_uuid, criteria_uuid, scoring_uuid)
        )
        .await
        .map(MutationOutcome::without_data)
    }

    async fn run<T, Fut>(
        &self,
        kind: EntityKind,
        action: MutationAction,
        scope: Scope,
        call: Fut
    ) -> Result<MutationOutcome<T>, MutationFailure>
    where
        Fut: Future<Output = Result<ApiResponse<T>, ApiError>>
    {
        let response = match call.await {
            Ok(response) if response.success == Some(false) => Err(ApiError::Status {
                status: 200,
                message: response.message
            }),
            other => other
        };

        match response {
            Ok(response) => {
                let invalidated = scope.apply(&self.cache).await;
                let message = if response.message.trim().is_empty() {
                    success_fallback(kind, action)
                } else {
                    response.message
                };
                info!(
                    kind = %kind,
                    action = %action,
                    invalidated = invalidated.len(),
                    "Mutation succeeded"
                );
                Ok(MutationOutcome {
                    data: response.data,
                    notification: Notification::success(message),
                    invalidated
                })
            }
            Err(cause) => {
                warn!(kind = %kind, action = %action, error = %cause, "Mutation failed");
                Err(MutationFailure {
                    kind,
                    action,
                    message: cause.user_message(&failure_fallback(kind, action)),
                    cause
                })
            }
        }
    }
}

impl<T> MutationOutcome<T> {
    fn without_data(self) -> MutationOutcome<()> {
        MutationOutcome {
            data: None,
            notification: self.notification,
            invalidated: self.invalidated
        }
    }
}

/// Cache entries touched by a successful mutation.
struct Scope {
    keys: Vec<QueryKey>,
    removed: Vec<QueryKey>,
    removed_rubric: Option<String>
}

impl Scope {
    fn exact(key: QueryKey) -> Self {
        Self {
            keys: vec![key],
            removed: Vec::new(),
            removed_rubric: None
        }
    }

    /// Drop `key` instead of invalidating it; its parent record is gone.
    fn removing(mut self, key: QueryKey) -> Self {
        self.removed.push(key);
        self
    }

    /// Drop every collection under a deleted rubric.
    fn removing_rubric(mut self, rubric_uuid: &str) -> Self {
        self.removed_rubric = Some(rubric_uuid.to_string());
        self
    }

    /// Returns every key invalidated or removed.
    async fn apply(self, cache: &QueryCache) -> Vec<QueryKey> {
        for key in &self.keys {
            cache.invalidate(key).await;
        }
        for key in &self.removed {
            cache.remove(key).await;
        }
        let mut touched = self.keys;
        touched.extend(self.removed);
        if let Some(rubric_uuid) = self.removed_rubric {
            let children = cache
                .remove_where(|key| key.belongs_to_rubric(&rubric_uuid))
                .await;
            touched.extend(children);
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_fallback() {
        assert_eq!(
            success_fallback(EntityKind::ScoringLevel, MutationAction::Create),
            "Scoring level created successfully"
        );
        assert_eq!(
            success_fallback(EntityKind::Rubric, MutationAction::Update),
            "Rubric updated successfully"
        );
    }

    #[test]
    fn test_failure_fallback() {
        assert_eq!(
            failure_fallback(EntityKind::Criterion, MutationAction::Delete),
            "Failed to delete criterion"
        );
    }
}
