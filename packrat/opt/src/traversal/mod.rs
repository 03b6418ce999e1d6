//! Helpers for traversing grammar modules
mod action;
mod construct;
mod diagnostics;
mod rewriter;
mod visitor;

pub use action::{Action, VisResult};
pub use construct::{ConstructVisitor, Named, ParseVal, PassOpt};
pub use diagnostics::{DiagnosticContext, DiagnosticPass, DiagnosticResult};
pub use rewriter::{
    Position, Rewriter, rewrite_production, walk_choice, walk_element,
    walk_sequence,
};
pub use visitor::Visitor;
