//! Stack of open edit/create dialogs.
//!
//! Dialogs nest strictly downward: a rubric dialog can open a criterion
//! dialog, which can open a scoring-level dialog. Each descriptor carries the
//! full parent chain it needs, and a child must agree with the chain of the
//! dialog below it.

use errors::BoardError;
use gb_core::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Create,
    Edit
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalDescriptor {
    pub kind: EntityKind,
    pub mode: ModalMode,
    /// Entity being edited; `None` when creating.
    pub target_uuid: Option<String>,
    pub rubric_uuid: Option<String>,
    pub criteria_uuid: Option<String>
}

impl ModalDescriptor {
    pub fn create_rubric() -> Self {
        Self {
            kind: EntityKind::Rubric,
            mode: ModalMode::Create,
            target_uuid: None,
            rubric_uuid: None,
            criteria_uuid: None
        }
    }

    pub fn edit_rubric(rubric_uuid: impl Into<String>) -> Self {
        let rubric_uuid = rubric_uuid.into();
        Self {
            kind: EntityKind::Rubric,
            mode: ModalMode::Edit,
            target_uuid: Some(rubric_uuid.clone()),
            rubric_uuid: Some(rubric_uuid),
            criteria_uuid: None
        }
    }

    pub fn create_criterion(rubric_uuid: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Criterion,
            mode: ModalMode::Create,
            target_uuid: None,
            rubric_uuid: Some(rubric_uuid.into()),
            criteria_uuid: None
        }
    }

    pub fn edit_criterion(rubric_uuid: impl Into<String>, criteria_uuid: impl Into<String>) -> Self {
        let criteria_uuid = criteria_uuid.into();
        Self {
            kind: EntityKind::Criterion,
            mode: ModalMode::Edit,
            target_uuid: Some(criteria_uuid.clone()),
            rubric_uuid: Some(rubric_uuid.into()),
            criteria_uuid: Some(criteria_uuid)
        }
    }

    pub fn create_scoring(rubric_uuid: impl Into<String>, criteria_uuid: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::ScoringLevel,
            mode: ModalMode::Create,
            target_uuid: None,
            rubric_uuid: Some(rubric_uuid.into()),
            criteria_uuid: Some(criteria_uuid.into())
        }
    }

    pub fn edit_scoring(
        rubric_uuid: impl Into<String>,
        criteria_uuid: impl Into<String>,
        scoring_uuid: impl Into<String>
    ) -> Self {
        Self {
            kind: EntityKind::ScoringLevel,
            mode: ModalMode::Edit,
            target_uuid: Some(scoring_uuid.into()),
            rubric_uuid: Some(rubric_uuid.into()),
            criteria_uuid: Some(criteria_uuid.into())
        }
    }

    /// Check the descriptor carries every identifier its kind and mode need.
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.mode == ModalMode::Edit {
            require(self.target_uuid.as_deref(), "target_uuid")?;
        }
        match self.kind {
            EntityKind::Rubric => Ok(()),
            EntityKind::Criterion => require(self.rubric_uuid.as_deref(), "rubric_uuid"),
            EntityKind::ScoringLevel => {
                require(self.rubric_uuid.as_deref(), "rubric_uuid")?;
                require(self.criteria_uuid.as_deref(), "criteria_uuid")
            }
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> BoardError {
        BoardError::InvalidModal {
            kind: self.kind.label().to_string(),
            reason: reason.into()
        }
    }
}

fn require(value: Option<&str>, identifier: &str) -> Result<(), BoardError> {
    match value {
        Some(id) if !id.is_empty() => Ok(()),
        _ => Err(BoardError::MissingIdentifier {
            identifier: identifier.to_string()
        })
    }
}

fn depth(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Rubric => 0,
        EntityKind::Criterion => 1,
        EntityKind::ScoringLevel => 2
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModalStack {
    stack: Vec<ModalDescriptor>
}

impl ModalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: ModalDescriptor) -> Result<(), BoardError> {
        descriptor.validate()?;

        if let Some(parent) = self.stack.last() {
            if depth(descriptor.kind) <= depth(parent.kind) {
                return Err(descriptor.invalid(format!(
                    "cannot open on top of a {} dialog",
                    parent.kind.label()
                )));
            }
            check_chain(parent, &descriptor)?;
        }

        self.stack.push(descriptor);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<ModalDescriptor, BoardError> {
        self.stack.pop().ok_or(BoardError::EmptyModalStack)
    }

    pub fn top(&self) -> Option<&ModalDescriptor> {
        self.stack.last()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModalDescriptor> {
        self.stack.iter()
    }
}

/// A child dialog must point at the same rubric, and at the criterion being
/// edited when opened over a criterion dialog.
fn check_chain(parent: &ModalDescriptor, child: &ModalDescriptor) -> Result<(), BoardError> {
    if parent.rubric_uuid.is_some() && parent.rubric_uuid != child.rubric_uuid {
        return Err(child.invalid("rubric does not match the open rubric dialog"));
    }
    if parent.kind == EntityKind::Criterion
        && parent.criteria_uuid.is_some()
        && parent.criteria_uuid != child.criteria_uuid
    {
        return Err(child.invalid("criterion does not match the open criterion dialog"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_chain() {
        let mut stack = ModalStack::new();
        stack.push(ModalDescriptor::edit_rubric("r1")).unwrap();
        stack
            .push(ModalDescriptor::edit_criterion("r1", "c1"))
            .unwrap();
        stack
            .push(ModalDescriptor::create_scoring("r1", "c1"))
            .unwrap();

        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.top().unwrap().kind, EntityKind::ScoringLevel);
        assert_eq!(stack.pop().unwrap().mode, ModalMode::Create);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_criterion_requires_rubric() {
        let mut stack = ModalStack::new();
        let descriptor = ModalDescriptor {
            rubric_uuid: None,
            ..ModalDescriptor::create_criterion("r1")
        };
        assert_eq!(
            stack.push(descriptor),
            Err(BoardError::MissingIdentifier {
                identifier: "rubric_uuid".to_string()
            })
        );
    }

    #[test]
    fn test_scoring_requires_criterion() {
        let descriptor = ModalDescriptor {
            criteria_uuid: Some(String::new()),
            ..ModalDescriptor::create_scoring("r1", "c1")
        };
        assert!(matches!(
            descriptor.validate(),
            Err(BoardError::MissingIdentifier { identifier }) if identifier == "criteria_uuid"
        ));
    }

    #[test]
    fn test_edit_requires_target() {
        let descriptor = ModalDescriptor {
            target_uuid: None,
            ..ModalDescriptor::edit_rubric("r1")
        };
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_cannot_open_parent_over_child() {
        let mut stack = ModalStack::new();
        stack
            .push(ModalDescriptor::create_criterion("r1"))
            .unwrap();
        let result = stack.push(ModalDescriptor::edit_rubric("r1"));
        assert!(matches!(result, Err(BoardError::InvalidModal { .. })));
    }

    #[test]
    fn test_child_must_match_parent_chain() {
        let mut stack = ModalStack::new();
        stack.push(ModalDescriptor::edit_rubric("r1")).unwrap();
        let result = stack.push(ModalDescriptor::create_criterion("r2"));
        assert!(matches!(result, Err(BoardError::InvalidModal { .. })));

        stack
            .push(ModalDescriptor::edit_criterion("r1", "c1"))
            .unwrap();
        let result = stack.push(ModalDescriptor::create_scoring("r1", "c2"));
        assert!(matches!(result, Err(BoardError::InvalidModal { .. })));
    }

    #[test]
    fn test_pop_empty() {
        let mut stack = ModalStack::new();
        assert_eq!(stack.pop(), Err(BoardError::EmptyModalStack));
    }
}
