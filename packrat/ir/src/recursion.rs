//! Recognizing directly left-recursive alternatives.
use crate::{Analyzer, Element, Production, Sequence};

/// Whether the alternative starts with a reference to its own production.
pub fn is_recursive(alternative: &Sequence, production: &Production) -> bool {
    match alternative.elements.first() {
        Some(first) => match Analyzer::strip_and_unbind(first) {
            Element::NonTerminal(nt) => {
                nt.name == production.name
                    || nt.name == production.qualified_name()
            }
            _ => false,
        },
        None => false,
    }
}

/// Whether the alternative is a base case of a directly left-recursive
/// production.
pub fn is_base(alternative: &Sequence, production: &Production) -> bool {
    !is_recursive(alternative, production)
}

/// Decides which directly left-recursive productions can be rewritten into
/// right-iterative form.
pub trait TransformOracle {
    fn is_transformable(&self, production: &Production) -> bool;
}

/// Treats no production as transformable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverTransformable;

impl TransformOracle for NeverTransformable {
    fn is_transformable(&self, _production: &Production) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderedChoice, Type};
    use packrat_utils::Id;

    #[test]
    fn recursive_alternatives() {
        let name = Id::new("Expr");
        let rec = Sequence::new(vec![
            Element::bind(Id::new("e"), Element::nonterminal(name)),
            Element::CharLiteral('+'),
        ]);
        let base = Sequence::new(vec![Element::CharLiteral('x')]);
        let prod = Production::new(
            name,
            Type::Node,
            OrderedChoice::new(vec![rec.clone(), base.clone()]),
        );
        assert!(is_recursive(&rec, &prod));
        assert!(is_base(&base, &prod));
        assert!(is_base(&Sequence::default(), &prod));
        assert!(!NeverTransformable.is_transformable(&prod));
    }
}
