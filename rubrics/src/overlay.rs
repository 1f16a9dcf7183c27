//! Optimistic removals layered over server data.
//!
//! A delete records a pending removal before the request is sent. Views are
//! derived by filtering server trees through the pending list; the server
//! data itself is never edited. A removal is pruned once the server data no
//! longer contains its target. A removal whose delete failed stays in place
//! until it is discarded explicitly.

use gb_core::{EntityKind, RubricTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    pub kind: EntityKind,
    pub uuid: String
}

#[derive(Debug, Clone, Default)]
pub struct OptimisticOverlay {
    removals: Vec<PendingRemoval>
}

impl OptimisticOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, kind: EntityKind, uuid: impl Into<String>) {
        let uuid = uuid.into();
        if !self.is_removed(kind, &uuid) {
            self.removals.push(PendingRemoval { kind, uuid });
        }
    }

    /// Drop a pending removal, making the entity visible again.
    pub fn discard(&mut self, kind: EntityKind, uuid: &str) -> bool {
        let before = self.removals.len();
        self.removals
            .retain(|removal| !(removal.kind == kind && removal.uuid == uuid));
        self.removals.len() != before
    }

    pub fn is_removed(&self, kind: EntityKind, uuid: &str) -> bool {
        self.removals
            .iter()
            .any(|removal| removal.kind == kind && removal.uuid == uuid)
    }

    pub fn pending(&self) -> &[PendingRemoval] {
        &self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }

    /// Server trees with every pending removal applied.
    pub fn apply(&self, trees: &[RubricTree]) -> Vec<RubricTree> {
        if self.removals.is_empty() {
            return trees.to_vec();
        }

        trees
            .iter()
            .filter(|tree| !self.is_removed(EntityKind::Rubric, &tree.rubric.uuid))
            .map(|tree| {
                let mut tree = tree.clone();
                tree.criteria
                    .retain(|node| !self.is_removed(EntityKind::Criterion, &node.criterion.uuid));
                for node in &mut tree.criteria {
                    node.scoring
                        .retain(|level| !self.is_removed(EntityKind::ScoringLevel, &level.uuid));
                }
                tree
            })
            .collect()
    }

    /// Prune removals whose target is gone from `server_trees`.
    pub fn reconcile(&mut self, server_trees: &[RubricTree]) -> usize {
        let before = self.removals.len();
        self.removals
            .retain(|removal| contains(server_trees, removal.kind, &removal.uuid));
        before - self.removals.len()
    }
}

fn contains(trees: &[RubricTree], kind: EntityKind, uuid: &str) -> bool {
    match kind {
        EntityKind::Rubric => trees.iter().any(|tree| tree.rubric.uuid == uuid),
        EntityKind::Criterion => trees
            .iter()
            .flat_map(|tree| &tree.criteria)
            .any(|node| node.criterion.uuid == uuid),
        EntityKind::ScoringLevel => trees
            .iter()
            .flat_map(|tree| &tree.criteria)
            .flat_map(|node| &node.scoring)
            .any(|level| level.uuid == uuid)
    }
}
