//! # Rubric Trees
//!
//! Loads an instructor's rubrics together with their criteria and scoring
//! levels, keeps the fetched collections in a shared query cache, and
//! applies create/update/delete mutations with scoped invalidation.
//!
//! # Layers
//!
//! - [`client::HttpRubricApi`]: REST transport with retries and a circuit
//!   breaker
//! - [`cache::QueryCache`]: per-scope cache entries with staleness and
//!   generation tracking
//! - [`aggregator::RubricAggregator`]: concurrent fan-out and identifier join
//! - [`mutation::RubricMutations`]: mutations, notifications, invalidation
//! - [`board::RubricBoard`]: view-model with optimistic removals, dialogs and
//!   per-owner refresh

pub mod aggregator;
pub mod board;
pub mod cache;
pub mod client;
pub mod lookup;
pub mod modal;
pub mod mutation;
pub mod notify;
pub mod overlay;
pub mod queries;
pub mod tree;

pub use aggregator::{AggregateResult, QueryFailure, RubricAggregator};
pub use board::{BoardActionError, BoardView, RowState, RubricBoard};
pub use cache::{CachedCollection, QueryCache, QueryKey, QueryState, QueryStatus};
pub use client::HttpRubricApi;
pub use lookup::SelectionIndex;
pub use modal::{ModalDescriptor, ModalMode, ModalStack};
pub use mutation::{MutationAction, MutationFailure, MutationOutcome, RubricMutations};
pub use notify::{Notification, NotificationLevel, NotificationQueue};
pub use overlay::{OptimisticOverlay, PendingRemoval};
pub use queries::RubricQueries;
pub use tree::{CriterionPair, assemble, criterion_pairs};
