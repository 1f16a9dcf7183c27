//! Shared test doubles for the Gradebook workspace.
//!
//! - [`InMemoryRubricApi`]: a [`gb_core::RubricApi`] backed by in-process
//!   collections, with per-call counters, failure injection, latency and
//!   gates that hold a call until the test releases it
//! - [`fixtures`]: seeded catalogs used across crates

mod fake;
pub mod fixtures;

pub use fake::{InMemoryRubricApi, call};
use std::sync::atomic::{AtomicU32, Ordering};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

pub fn unique_instructor_id() -> String {
    unique_id("test-instructor")
}
