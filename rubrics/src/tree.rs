//! Joining the three fetched levels into rubric trees.
//!
//! Every join is keyed by identifiers. Children are attached to a parent
//! only when the child's own foreign key names that parent, and scoring
//! results are looked up by the full (rubric, criterion) pair. Arrival order
//! of the concurrent requests never matters.

use std::collections::HashMap;

use gb_core::{Criterion, CriterionNode, Rubric, RubricTree, ScoringLevel};
use tracing::warn;

/// Identifies one scoring collection: (rubric_uuid, criteria_uuid).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CriterionPair {
    pub rubric_uuid: String,
    pub criteria_uuid: String
}

impl CriterionPair {
    pub fn new(rubric_uuid: impl Into<String>, criteria_uuid: impl Into<String>) -> Self {
        Self {
            rubric_uuid: rubric_uuid.into(),
            criteria_uuid: criteria_uuid.into()
        }
    }
}

/// Criteria of `rubric` whose foreign key actually names it.
fn owned_criteria<'a>(
    rubric: &Rubric,
    criteria: &'a HashMap<String, Vec<Criterion>>
) -> impl Iterator<Item = &'a Criterion> + use<'a> {
    let rubric_uuid = rubric.uuid.clone();
    criteria
        .get(&rubric.uuid)
        .into_iter()
        .flatten()
        .filter(move |criterion| {
            let owned = criterion.rubric_uuid == rubric_uuid;
            if !owned {
                warn!(
                    rubric = %rubric_uuid,
                    criterion = %criterion.uuid,
                    claimed_rubric = %criterion.rubric_uuid,
                    "Dropping criterion that belongs to another rubric"
                );
            }
            owned
        })
}

/// Flatten the criteria of every rubric into the pairs whose scoring levels
/// must be fetched.
pub fn criterion_pairs(
    rubrics: &[Rubric],
    criteria: &HashMap<String, Vec<Criterion>>
) -> Vec<CriterionPair> {
    rubrics
        .iter()
        .flat_map(|rubric| {
            owned_criteria(rubric, criteria)
                .filter(|criterion| !criterion.uuid.is_empty())
                .map(move |criterion| CriterionPair::new(&rubric.uuid, &criterion.uuid))
        })
        .collect()
}

/// Assemble rubric trees from the per-level results.
///
/// Rubrics keep their server order. A rubric whose criteria were not
/// fetched gets an empty list; so does a criterion whose scoring levels are
/// missing.
pub fn assemble(
    rubrics: &[Rubric],
    criteria: &HashMap<String, Vec<Criterion>>,
    scoring: &HashMap<CriterionPair, Vec<ScoringLevel>>
) -> Vec<RubricTree> {
    rubrics
        .iter()
        .map(|rubric| RubricTree {
            rubric: rubric.clone(),
            criteria: owned_criteria(rubric, criteria)
                .map(|criterion| CriterionNode {
                    criterion: criterion.clone(),
                    scoring: scoring_for(rubric, criterion, scoring)
                })
                .collect()
        })
        .collect()
}

fn scoring_for(
    rubric: &Rubric,
    criterion: &Criterion,
    scoring: &HashMap<CriterionPair, Vec<ScoringLevel>>
) -> Vec<ScoringLevel> {
    let pair = CriterionPair::new(&rubric.uuid, &criterion.uuid);
    let Some(levels) = scoring.get(&pair) else {
        return Vec::new();
    };

    levels
        .iter()
        .filter(|level| {
            let owned = level.criteria_uuid == criterion.uuid;
            if !owned {
                warn!(
                    criterion = %criterion.uuid,
                    scoring = %level.uuid,
                    claimed_criterion = %level.criteria_uuid,
                    "Dropping scoring level that belongs to another criterion"
                );
            }
            owned
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria_map(entries: Vec<(&str, Vec<Criterion>)>) -> HashMap<String, Vec<Criterion>> {
        entries
            .into_iter()
            .map(|(id, list)| (id.to_string(), list))
            .collect()
    }

    #[test]
    fn test_pairs_follow_rubric_order() {
        let rubrics = vec![Rubric::new("r1"), Rubric::new("r2")];
        let criteria = criteria_map(vec![
            ("r2", vec![Criterion::new("c3", "r2")]),
            (
                "r1",
                vec![Criterion::new("c1", "r1"), Criterion::new("c2", "r1")]
            ),
        ]);

        assert_eq!(
            criterion_pairs(&rubrics, &criteria),
            vec![
                CriterionPair::new("r1", "c1"),
                CriterionPair::new("r1", "c2"),
                CriterionPair::new("r2", "c3"),
            ]
        );
    }

    #[test]
    fn test_mismatched_criterion_is_not_attached() {
        let rubrics = vec![Rubric::new("r1")];
        let criteria = criteria_map(vec![(
            "r1",
            vec![Criterion::new("c1", "r1"), Criterion::new("stray", "r9")]
        )]);

        let trees = assemble(&rubrics, &criteria, &HashMap::new());
        assert_eq!(trees[0].criteria.len(), 1);
        assert_eq!(trees[0].criteria[0].criterion.uuid, "c1");
        assert_eq!(criterion_pairs(&rubrics, &criteria).len(), 1);
    }

    #[test]
    fn test_scoring_joined_by_pair_not_position() {
        let rubrics = vec![Rubric::new("r1")];
        let criteria = criteria_map(vec![(
            "r1",
            vec![Criterion::new("c1", "r1"), Criterion::new("c2", "r1")]
        )]);
        let mut scoring = HashMap::new();
        scoring.insert(
            CriterionPair::new("r1", "c2"),
            vec![ScoringLevel::new("s2", "c2")]
        );
        scoring.insert(
            CriterionPair::new("r1", "c1"),
            vec![ScoringLevel::new("s1", "c1")]
        );

        let trees = assemble(&rubrics, &criteria, &scoring);
        let tree = &trees[0];
        assert_eq!(tree.criterion("c1").unwrap().scoring[0].uuid, "s1");
        assert_eq!(tree.criterion("c2").unwrap().scoring[0].uuid, "s2");
    }

    #[test]
    fn test_foreign_scoring_is_dropped() {
        let rubrics = vec![Rubric::new("r1")];
        let criteria = criteria_map(vec![("r1", vec![Criterion::new("c1", "r1")])]);
        let mut scoring = HashMap::new();
        scoring.insert(
            CriterionPair::new("r1", "c1"),
            vec![ScoringLevel::new("s1", "c1"), ScoringLevel::new("sx", "c7")]
        );

        let trees = assemble(&rubrics, &criteria, &scoring);
        let levels = &trees[0].criteria[0].scoring;
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].uuid, "s1");
    }

    #[test]
    fn test_missing_levels_give_empty_lists() {
        let rubrics = vec![Rubric::new("r1"), Rubric::new("r2")];
        let criteria = criteria_map(vec![("r1", vec![Criterion::new("c1", "r1")])]);

        let trees = assemble(&rubrics, &criteria, &HashMap::new());
        assert_eq!(trees.len(), 2);
        assert!(trees[0].criteria[0].scoring.is_empty());
        assert!(trees[1].criteria.is_empty());
    }
}
