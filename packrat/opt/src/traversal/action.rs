//! Actions control the traversal of a module's productions.
use packrat_ir::OrderedChoice;
use packrat_utils::PackratResult;

/// Result of performing a visit.
pub type VisResult = PackratResult<Action>;

/// Action performed at the end of visiting a module or production.
pub enum Action {
    /// Continue traversal of the module.
    Continue,
    /// Abort traversal of the current module.
    Stop,
    /// Skip the productions of the module but still run
    /// [finish](super::Visitor::finish).
    SkipChildren,
    /// Replace the choice of the production just visited.
    Change(Box<OrderedChoice>),
}

impl Action {
    /// Run the traversal specified by `next` if this traversal succeeds.
    /// If the result of this traversal is not `Action::Continue`, do not
    /// run `next()`.
    pub(super) fn and_then<F>(self, mut next: F) -> VisResult
    where
        F: FnMut() -> VisResult,
    {
        match self {
            Action::Continue => next(),
            Action::Change(_) | Action::Stop | Action::SkipChildren => Ok(self),
        }
    }

    pub fn change(choice: OrderedChoice) -> Self {
        Action::Change(Box::new(choice))
    }

    /// Applies the Change action if `self` is a Change action.
    /// Otherwise passes the action through unchanged
    pub(super) fn apply_change(self, choice: &mut OrderedChoice) -> Action {
        match self {
            Action::Change(c) => {
                *choice = *c;
                Action::Continue
            }
            action => action,
        }
    }

    /// Changes a Action::SkipChildren to Action::Continue.
    /// Should be called to indicate the boundary of traversing the children
    /// of a node.
    pub(super) fn pop(self) -> Self {
        match self {
            Action::SkipChildren => Action::Continue,
            x => x,
        }
    }
}
