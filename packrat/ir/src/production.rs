//! Productions and the properties passes attach to them.
use crate::{Attribute, Attributes, GetAttributes, OrderedChoice, Type};
use packrat_utils::{GPosIdx, GetName, Id, WithPos};
use std::fmt;

/// Saturating production cost. [Cost::UNBOUNDED] absorbs everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cost(u32);

impl Cost {
    pub const ZERO: Cost = Cost(0);
    pub const UNBOUNDED: Cost = Cost(u32::MAX);

    pub fn new(cost: u32) -> Self {
        Cost(cost)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }
}

impl std::ops::Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Add<u32> for Cost {
    type Output = Cost;

    fn add(self, rhs: u32) -> Cost {
        Cost(self.0.saturating_add(rhs))
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Self {
        iter.fold(Cost::ZERO, |a, b| a + b)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "unbounded")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Sizing information for the code generator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaData {
    pub requires_char: bool,
    pub requires_index: bool,
    pub requires_result: bool,
    pub requires_pred_index: bool,
    pub requires_pred_result: bool,
    pub requires_pred_match: bool,
    pub requires_base_index: bool,
    /// Number of references to the production across the grammar.
    pub usage_count: u32,
    /// Number of references to the production from itself.
    pub self_count: u32,
    /// Per nesting level of repetitions: whether it is a one-or-more
    /// repetition.
    pub repetitions: Vec<bool>,
    /// Per nesting level of repetitions: the unified type of the bound
    /// repeated element, if any.
    pub bound_repetitions: Vec<Option<Type>>,
    /// Per nesting level of options: the unified type of the bound optional
    /// element, if any.
    pub options: Vec<Option<Type>>,
}

/// The kind of generic production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenericKind {
    /// Each alternative creates one generic node.
    Node,
    /// Directly left-recursive; nodes are created by the recursion
    /// transformation.
    Recursion,
}

/// Properties derived by the classification and rewriting passes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    pub cost: Option<Cost>,
    pub meta_data: Option<MetaData>,
    pub generic: Option<GenericKind>,
    /// Only returns the text it matches.
    pub text_only: bool,
    /// Void and built only from lexical material.
    pub lexical: bool,
    /// Lexical and consumes input.
    pub token: bool,
    /// Made void because nothing observes its value.
    pub voided: bool,
    /// Names of the productions folded into this one.
    pub duplicates: Option<Vec<Id>>,
    /// Directly left-recursive.
    pub recursive: bool,
    /// Synthesized from an option.
    pub option: bool,
    /// Hidden from the abstract syntax tree.
    pub redacted: bool,
    /// Declared type text shown by the tree view.
    pub dtype: Option<String>,
}

/// The kinds of productions.
#[derive(Clone, Debug, PartialEq)]
pub enum ProductionKind {
    /// A complete production.
    Full,
    /// Adds alternatives before or after the named sequence.
    AlternativeAddition { sequence: Id, before: bool },
    /// Removes the named sequences.
    AlternativeRemoval { sequences: Vec<Id> },
    /// Replaces the production, or the named alternatives when not
    /// complete.
    Override { complete: bool },
}

#[derive(Clone, Debug)]
pub struct Production {
    pub kind: ProductionKind,
    pub attributes: Attributes,
    pub ty: Type,
    pub name: Id,
    pub qname: Option<Id>,
    pub choice: OrderedChoice,
    pub props: Props,
    pub pos: GPosIdx,
}

impl Production {
    /// A full production.
    pub fn new(name: Id, ty: Type, choice: OrderedChoice) -> Self {
        Production {
            kind: ProductionKind::Full,
            attributes: Attributes::default(),
            ty,
            name,
            qname: None,
            choice,
            props: Props::default(),
            pos: GPosIdx::UNKNOWN,
        }
    }

    pub fn with_attributes(
        mut self,
        attrs: impl IntoIterator<Item = Attribute>,
    ) -> Self {
        for attr in attrs {
            self.attributes.insert(attr);
        }
        self
    }

    /// The qualified name if the grammar was qualified, the plain name
    /// otherwise.
    pub fn qualified_name(&self) -> Id {
        self.qname.unwrap_or(self.name)
    }

    pub fn is_full(&self) -> bool {
        matches!(self.kind, ProductionKind::Full)
    }

    pub fn has_attribute(&self, attr: Attribute) -> bool {
        self.attributes.has(attr)
    }

    pub fn is_public(&self) -> bool {
        self.has_attribute(Attribute::Public)
    }

    /// Memoized unless marked transient or inline without also being marked
    /// memoized.
    pub fn is_memoized(&self) -> bool {
        self.attributes.is_empty()
            || self.has_attribute(Attribute::Memoized)
            || (!self.has_attribute(Attribute::Transient)
                && !self.has_attribute(Attribute::Inline))
    }

    /// Void, text-only, or token-level.
    pub fn is_basic(&self) -> bool {
        self.ty.is_void() || self.props.text_only || self.props.token
    }
}

impl GetName for Production {
    fn name(&self) -> Id {
        self.qualified_name()
    }
}

impl GetAttributes for Production {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl WithPos for Production {
    fn copy_span(&self) -> GPosIdx {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoization() {
        let p = Production::new(Id::new("P"), Type::Void, OrderedChoice::default());
        assert!(p.is_memoized());
        let p = p.with_attributes([Attribute::Transient]);
        assert!(!p.is_memoized());
        let p = p.with_attributes([Attribute::Memoized]);
        assert!(p.is_memoized());
        let q = Production::new(Id::new("Q"), Type::Void, OrderedChoice::default())
            .with_attributes([Attribute::Public]);
        assert!(q.is_memoized());
    }

    #[test]
    fn cost_saturates() {
        assert_eq!(Cost::UNBOUNDED + 1, Cost::UNBOUNDED);
        assert_eq!(Cost::new(2) + Cost::new(3), Cost::new(5));
        let total: Cost = [Cost::new(1), Cost::UNBOUNDED].into_iter().sum();
        assert!(total.is_unbounded());
    }
}
