//! # Gradebook Core
//!
//! Shared types and traits for the Gradebook rubric client.
//!
//! This crate provides:
//! - Wire types for rubrics, criteria and scoring levels
//! - Pagination and mutation envelopes used by the REST backend
//! - The assembled rubric tree returned by the aggregator
//! - The `RubricApi` trait implemented by HTTP and in-memory backends

pub mod traits;
pub mod types;

pub use traits::RubricApi;
pub use types::{
    ApiResponse, Criterion, CriterionInput, CriterionNode, EntityKind, Identified,
    MessageResponse, Page, PageMetadata, PageRequest, Rubric, RubricInput, RubricTree,
    ScoringLevel, ScoringLevelInput
};
