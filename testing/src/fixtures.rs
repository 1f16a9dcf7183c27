//! Seeded rubric catalogs.

use gb_core::{Criterion, Rubric, ScoringLevel};

use crate::InMemoryRubricApi;

pub const SCENARIO_INSTRUCTOR: &str = "ins-1";

/// One rubric `r1` with criterion `c1` and scoring level `s1`, owned by
/// `ins-1`. Records carry only their identifiers, foreign keys and the
/// `"5 points"` score range.
pub async fn scenario_api() -> InMemoryRubricApi {
    InMemoryRubricApi::new()
        .with_rubric_for(SCENARIO_INSTRUCTOR, Rubric::new("r1"))
        .await
        .with_criterion(Criterion::new("c1", "r1"))
        .await
        .with_scoring(ScoringLevel {
            score_range: Some("5 points".to_string()),
            ..ScoringLevel::new("s1", "c1")
        })
        .await
}

/// The JSON the scenario catalog must aggregate to.
pub fn scenario_tree_json() -> serde_json::Value {
    serde_json::json!([{
        "rubric": {"uuid": "r1"},
        "criteria": [{
            "uuid": "c1",
            "rubric_uuid": "r1",
            "scoring": [{"uuid": "s1", "criteria_uuid": "c1", "score_range": "5 points"}]
        }]
    }])
}

/// Two rubrics for `instructor_uuid`:
///
/// - `essay`: criteria `thesis` (levels `thesis-a`, `thesis-b`) and
///   `grammar` (level `grammar-a`)
/// - `lab`: criterion `method` with no levels
pub async fn course_api(instructor_uuid: &str) -> InMemoryRubricApi {
    InMemoryRubricApi::new()
        .with_rubric(owned_rubric("essay", instructor_uuid, Some("Essay")))
        .await
        .with_rubric(owned_rubric("lab", instructor_uuid, Some("Lab Report")))
        .await
        .with_criterion(named_criterion("thesis", "essay", "Thesis", 1))
        .await
        .with_criterion(named_criterion("grammar", "essay", "Grammar", 2))
        .await
        .with_criterion(named_criterion("method", "lab", "Method", 1))
        .await
        .with_scoring(level("thesis-a", "thesis", "Excellent", true))
        .await
        .with_scoring(level("thesis-b", "thesis", "Needs work", false))
        .await
        .with_scoring(level("grammar-a", "grammar", "Clean", true))
        .await
}

pub fn owned_rubric(uuid: &str, instructor_uuid: &str, title: Option<&str>) -> Rubric {
    Rubric {
        title: title.map(str::to_string),
        instructor_uuid: Some(instructor_uuid.to_string()),
        ..Rubric::new(uuid)
    }
}

pub fn named_criterion(uuid: &str, rubric_uuid: &str, name: &str, order: i32) -> Criterion {
    Criterion {
        component_name: Some(name.to_string()),
        display_order: Some(order),
        ..Criterion::new(uuid, rubric_uuid)
    }
}

pub fn level(uuid: &str, criteria_uuid: &str, expectation: &str, passing: bool) -> ScoringLevel {
    ScoringLevel {
        performance_expectation: Some(expectation.to_string()),
        is_passing: Some(passing),
        ..ScoringLevel::new(uuid, criteria_uuid)
    }
}
