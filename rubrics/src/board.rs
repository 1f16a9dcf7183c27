//! View-model for an instructor's rubric board.
//!
//! The board owns no copy of server data that can drift: its trees are the
//! latest aggregate load, with pending optimistic removals layered on top.
//! Every mutation raises a notification, successful ones invalidate their
//! collection and trigger a refresh, and a load started for a previous owner
//! is discarded when it completes.

use std::collections::HashMap;
use std::sync::Arc;

use errors::BoardError;
use gb_core::{
    Criterion, CriterionInput, EntityKind, Rubric, RubricApi, RubricInput, RubricTree,
    ScoringLevel, ScoringLevelInput
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::aggregator::{AggregateResult, RubricAggregator};
use crate::cache::QueryCache;
use crate::lookup::SelectionIndex;
use crate::modal::{ModalDescriptor, ModalStack};
use crate::mutation::{MutationFailure, MutationOutcome, RubricMutations};
use crate::notify::{Notification, NotificationQueue};
use crate::overlay::OptimisticOverlay;
use crate::queries::RubricQueries;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoardActionError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Mutation(#[from] MutationFailure)
}

/// Per-row interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Idle,
    /// Create or edit submitted, waiting for the server.
    Saving,
    /// Hidden optimistically, delete in flight.
    Removing,
    /// Delete was rejected; the row stays hidden until restored.
    RemovalFailed
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub instructor_uuid: Option<String>,
    pub trees: Vec<RubricTree>,
    pub is_loading: bool,
    pub is_error: bool
}

impl BoardView {
    pub fn rubric(&self, rubric_uuid: &str) -> Option<&RubricTree> {
        self.trees.iter().find(|tree| tree.rubric.uuid == rubric_uuid)
    }
}

#[derive(Default)]
struct BoardState {
    owner: Option<String>,
    epoch: u64,
    loads_in_flight: u32,
    server: AggregateResult,
    overlay: OptimisticOverlay,
    rows: HashMap<(EntityKind, String), RowState>,
    notifications: NotificationQueue,
    modals: ModalStack
}

impl BoardState {
    fn set_row(&mut self, kind: EntityKind, uuid: &str, state: RowState) {
        if state == RowState::Idle {
            self.rows.remove(&(kind, uuid.to_string()));
        } else {
            self.rows.insert((kind, uuid.to_string()), state);
        }
    }

    /// Close the top dialog if it belongs to the saved entity level.
    fn close_saved_modal(&mut self, kind: EntityKind) {
        if self.modals.top().is_some_and(|top| top.kind == kind) {
            let _ = self.modals.pop();
        }
    }
}

pub struct RubricBoard {
    aggregator: RubricAggregator,
    mutations: RubricMutations,
    state: RwLock<BoardState>
}

impl RubricBoard {
    /// Board with its own cache, configured from `config`.
    pub fn new(api: Arc<dyn RubricApi>, config: &config::Config) -> Self {
        let cache = Arc::new(QueryCache::from_config(&config.cache));
        let queries = Arc::new(RubricQueries::from_config(api, cache, &config.api));
        Self::with_queries(queries)
    }

    /// Board sharing the cache behind `queries`.
    pub fn with_queries(queries: Arc<RubricQueries>) -> Self {
        let mutations = RubricMutations::new(Arc::clone(queries.api()), Arc::clone(queries.cache()));
        Self {
            aggregator: RubricAggregator::new(queries),
            mutations,
            state: RwLock::new(BoardState::default())
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        self.aggregator.queries().cache()
    }

    /// Switch the board to another instructor, or to none.
    ///
    /// Drops the previous owner's view state; loads still running for the
    /// previous owner will be discarded.
    pub async fn set_owner(&self, instructor_uuid: Option<String>) {
        let mut state = self.state.write().await;
        let owner = instructor_uuid.filter(|id| !id.is_empty());
        if state.owner == owner {
            return;
        }
        debug!(owner = ?owner, "Switching rubric board owner");
        state.owner = owner;
        state.epoch += 1;
        state.server = AggregateResult::default();
        state.overlay = OptimisticOverlay::new();
        state.rows.clear();
        state.modals.clear();
    }

    pub async fn owner(&self) -> Option<String> {
        self.state.read().await.owner.clone()
    }

    /// Reload the trees for the current owner. Returns `false` when the
    /// result was discarded because the owner changed meanwhile.
    pub async fn refresh(&self) -> bool {
        let (owner, epoch) = {
            let mut state = self.state.write().await;
            state.loads_in_flight += 1;
            (state.owner.clone(), state.epoch)
        };

        let result = self.aggregator.load(owner.as_deref()).await;

        let mut state = self.state.write().await;
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        if state.epoch != epoch {
            debug!(owner = ?owner, "Discarding rubric load for a previous owner");
            return false;
        }
        if !result.is_error {
            let pruned = state.overlay.reconcile(&result.trees);
            if pruned > 0 {
                debug!(pruned, "Confirmed optimistic removals");
            }
        }
        state.server = result;
        true
    }

    pub async fn view(&self) -> BoardView {
        let state = self.state.read().await;
        BoardView {
            instructor_uuid: state.owner.clone(),
            trees: state.overlay.apply(&state.server.trees),
            is_loading: state.loads_in_flight > 0 || state.server.is_loading,
            is_error: state.server.is_error
        }
    }

    /// Errors recorded by the last load.
    pub async fn load_errors(&self) -> Vec<crate::aggregator::QueryFailure> {
        self.state.read().await.server.errors.clone()
    }

    pub async fn row_state(&self, kind: EntityKind, uuid: &str) -> RowState {
        self.state
            .read()
            .await
            .rows
            .get(&(kind, uuid.to_string()))
            .copied()
            .unwrap_or(RowState::Idle)
    }

    pub async fn drain_notifications(&self) -> Vec<Notification> {
        self.state.write().await.notifications.drain()
    }

    pub async fn open_modal(&self, descriptor: ModalDescriptor) -> Result<(), BoardError> {
        self.state.write().await.modals.push(descriptor)
    }

    pub async fn close_modal(&self) -> Result<ModalDescriptor, BoardError> {
        self.state.write().await.modals.pop()
    }

    pub async fn active_modal(&self) -> Option<ModalDescriptor> {
        self.state.read().await.modals.top().cloned()
    }

    pub async fn modal_depth(&self) -> usize {
        self.state.read().await.modals.depth()
    }

    /// Rubrics currently visible, for pickers.
    pub async fn rubric_index(&self) -> SelectionIndex<Rubric> {
        let view = self.view().await;
        SelectionIndex::new(view.trees.into_iter().map(|tree| tree.rubric))
    }

    /// Criteria of one visible rubric, for pickers.
    pub async fn criterion_index(&self, rubric_uuid: &str) -> SelectionIndex<Criterion> {
        let view = self.view().await;
        SelectionIndex::new(
            view.trees
                .into_iter()
                .filter(|tree| tree.rubric.uuid == rubric_uuid)
                .flat_map(|tree| tree.criteria)
                .map(|node| node.criterion)
        )
    }

    /// Make an optimistically removed entity visible again.
    pub async fn restore(&self, kind: EntityKind, uuid: &str) -> bool {
        let mut state = self.state.write().await;
        state.set_row(kind, uuid, RowState::Idle);
        state.overlay.discard(kind, uuid)
    }

    pub async fn create_rubric(&self, input: &RubricInput) -> Result<Option<Rubric>, BoardActionError> {
        let owner = self.require_owner().await?;
        let result = self.mutations.create_rubric(&owner, input).await;
        self.finish_save(EntityKind::Rubric, None, result).await
    }

    pub async fn update_rubric(
        &self,
        rubric_uuid: &str,
        input: &RubricInput
    ) -> Result<Option<Rubric>, BoardActionError> {
        let owner = self.require_owner().await?;
        require(rubric_uuid, "rubric_uuid")?;
        self.mark(EntityKind::Rubric, rubric_uuid, RowState::Saving).await;
        let result = self.mutations.update_rubric(&owner, rubric_uuid, input).await;
        self.finish_save(EntityKind::Rubric, Some(rubric_uuid), result)
            .await
    }

    pub async fn delete_rubric(&self, rubric_uuid: &str) -> Result<(), BoardActionError> {
        let owner = self.require_owner().await?;
        require(rubric_uuid, "rubric_uuid")?;
        self.begin_removal(EntityKind::Rubric, rubric_uuid).await;
        let result = self.mutations.delete_rubric(&owner, rubric_uuid).await;
        self.finish_removal(EntityKind::Rubric, rubric_uuid, result)
            .await
    }

    pub async fn create_criterion(
        &self,
        rubric_uuid: &str,
        input: &CriterionInput
    ) -> Result<Option<Criterion>, BoardActionError> {
        require(rubric_uuid, "rubric_uuid")?;
        let result = self.mutations.create_criterion(rubric_uuid, input).await;
        self.finish_save(EntityKind::Criterion, None, result).await
    }

    pub async fn update_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &CriterionInput
    ) -> Result<Option<Criterion>, BoardActionError> {
        require(rubric_uuid, "rubric_uuid")?;
        require(criteria_uuid, "criteria_uuid")?;
        self.mark(EntityKind::Criterion, criteria_uuid, RowState::Saving)
            .await;
        let result = self
            .mutations
            .update_criterion(rubric_uuid, criteria_uuid, input)
            .await;
        self.finish_save(EntityKind::Criterion, Some(criteria_uuid), result)
            .await
    }

    pub async fn delete_criterion(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str
    ) -> Result<(), BoardActionError> {
        require(rubric_uuid, "rubric_uuid")?;
        require(criteria_uuid, "criteria_uuid")?;
        self.begin_removal(EntityKind::Criterion, criteria_uuid)
            .await;
        let result = self
            .mutations
            .delete_criterion(rubric_uuid, criteria_uuid)
            .await;
        self.finish_removal(EntityKind::Criterion, criteria_uuid, result)
            .await
    }

    pub async fn create_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<Option<ScoringLevel>, BoardActionError> {
        require(rubric_uuid, "rubric_uuid")?;
        require(criteria_uuid, "criteria_uuid")?;
        let result = self
            .mutations
            .create_scoring(rubric_uuid, criteria_uuid, input)
            .await;
        self.finish_save(EntityKind::ScoringLevel, None, result)
            .await
    }

    pub async fn update_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str,
        input: &ScoringLevelInput
    ) -> Result<Option<ScoringLevel>, BoardActionError> {
        require(rubric_uuid, "rubric_uuid")?;
        require(criteria_uuid, "criteria_uuid")?;
        require(scoring_uuid, "scoring_uuid")?;
        self.mark(EntityKind::ScoringLevel, scoring_uuid, RowState::Saving)
            .await;
        let result = self
            .mutations
            .update_scoring(rubric_uuid, criteria_uuid, scoring_uuid, input)
            .await;
        self.finish_save(EntityKind::ScoringLevel, Some(scoring_uuid), result)
            .await
    }

    pub async fn delete_scoring(
        &self,
        rubric_uuid: &str,
        criteria_uuid: &str,
        scoring_uuid: &str
    ) -> Result<(), BoardActionError> {
        require(rubric_uuid, "rubric_uuid")?;
        require(criteria_uuid, "criteria_uuid")?;
        require(scoring_uuid, "scoring_uuid")?;
        self.begin_removal(EntityKind::ScoringLevel, scoring_uuid)
            .await;
        let result = self
            .mutations
            .delete_scoring(rubric_uuid, criteria_uuid, scoring_uuid)
            .await;
        self.finish_removal(EntityKind::ScoringLevel, scoring_uuid, result)
            .await
    }

    async fn require_owner(&self) -> Result<String, BoardError> {
        self.owner()
            .await
            .ok_or_else(|| BoardError::MissingIdentifier {
                identifier: "instructor_uuid".to_string()
            })
    }

    async fn mark(&self, kind: EntityKind, uuid: &str, row: RowState) {
        self.state.write().await.set_row(kind, uuid, row);
    }

    async fn begin_removal(&self, kind: EntityKind, uuid: &str) {
        let mut state = self.state.write().await;
        state.overlay.remove(kind, uuid);
        state.set_row(kind, uuid, RowState::Removing);
    }

    async fn finish_save<T>(
        &self,
        kind: EntityKind,
        uuid: Option<&str>,
        result: Result<MutationOutcome<T>, MutationFailure>
    ) -> Result<Option<T>, BoardActionError> {
        {
            let mut state = self.state.write().await;
            if let Some(uuid) = uuid {
                state.set_row(kind, uuid, RowState::Idle);
            }
            match &result {
                Ok(outcome) => {
                    state.notifications.push(outcome.notification.clone());
                    state.close_saved_modal(kind);
                }
                Err(failure) => state.notifications.push(failure.notification())
            }
        }

        let outcome = result?;
        self.refresh().await;
        Ok(outcome.data)
    }

    async fn finish_removal(
        &self,
        kind: EntityKind,
        uuid: &str,
        result: Result<MutationOutcome<()>, MutationFailure>
    ) -> Result<(), BoardActionError> {
        {
            let mut state = self.state.write().await;
            match &result {
                Ok(outcome) => {
                    state.notifications.push(outcome.notification.clone());
                    state.set_row(kind, uuid, RowState::Idle);
                }
                Err(failure) => {
                    state.notifications.push(failure.notification());
                    state.set_row(kind, uuid, RowState::RemovalFailed);
                }
            }
        }

        result?;
        self.refresh().await;
        Ok(())
    }
}

fn require(value: &str, identifier: &str) -> Result<(), BoardError> {
    if value.is_empty() {
        Err(BoardError::MissingIdentifier {
            identifier: identifier.to_string()
        })
    } else {
        Ok(())
    }
}
