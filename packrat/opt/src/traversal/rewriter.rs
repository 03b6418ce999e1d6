//! Owned, bottom-up rewriting of a production's elements.
//!
//! A [Rewriter] takes each element by value and returns its replacement.
//! The [Position] passed along describes where the element sits in its
//! production; the `walk_*` functions compute the positions of the
//! children and rebuild the parent from the rewritten children.
use packrat_ir::{
    self as ir, Analyzer, CharCase, Element, OrderedChoice, Production,
    Sequence,
};
use packrat_utils::PackratResult;
use std::mem;

/// Where an element appears within its production.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// The production's own choice.
    pub top_level: bool,
    /// The last element of an alternative of the production's choice,
    /// possibly nested in trailing choices. Its value becomes the value of
    /// the production.
    pub last: bool,
    /// Must remain a sequence, even if it has a single element.
    pub needs_sequence: bool,
    /// Inside a voided element.
    pub voided: bool,
    /// The operand of a binding or string match.
    pub bound: bool,
    /// The operand of a syntactic predicate.
    pub predicate: bool,
    /// The operand of a repetition; `repeated_once` when it is a
    /// one-or-more repetition.
    pub repeated: bool,
    pub repeated_once: bool,
}

impl Position {
    /// The position of a production's choice.
    pub fn top() -> Self {
        Position {
            top_level: true,
            ..Default::default()
        }
    }

    /// Position of an alternative of a choice at `self`.
    pub fn alternative(&self) -> Self {
        Position {
            last: self.top_level || self.last,
            needs_sequence: true,
            ..Default::default()
        }
    }

    /// Position of element `idx` of a sequence with `len` elements.
    pub fn element(&self, idx: usize, len: usize) -> Self {
        Position {
            last: self.last && idx + 1 == len,
            ..Default::default()
        }
    }

    /// Position of the operand of the unary element `e` at `self`.
    pub fn operand(&self, e: &Element) -> Self {
        match e {
            Element::Repetition { once, .. } => Position {
                repeated: true,
                repeated_once: *once,
                ..Default::default()
            },
            Element::FollowedBy(_) | Element::NotFollowedBy(_) => Position {
                needs_sequence: true,
                predicate: true,
                ..Default::default()
            },
            Element::Voided(_) => Position {
                voided: true,
                ..Default::default()
            },
            Element::Binding(_) | Element::StringMatch(_) => Position {
                bound: true,
                ..Default::default()
            },
            _ => Position::default(),
        }
    }
}

/// The rewriting interface. Every method has a default that rewrites the
/// children and rebuilds the element; passes override the methods for the
/// elements they care about and call the matching `walk_*` function for
/// everything else.
pub trait Rewriter {
    fn rewrite_choice(
        &mut self,
        c: OrderedChoice,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        walk_choice(self, c, pos, analyzer)
    }

    fn rewrite_sequence(
        &mut self,
        s: Sequence,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        walk_sequence(self, s, pos, analyzer)
    }

    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        walk_element(self, e, pos, analyzer)
    }
}

/// Rewrite every alternative. Alternatives that stop being sequences are
/// wrapped into one.
pub fn walk_choice<R: Rewriter + ?Sized>(
    r: &mut R,
    c: OrderedChoice,
    pos: Position,
    analyzer: &mut Analyzer,
) -> PackratResult<Element> {
    let child = pos.alternative();
    let alternatives = c
        .alternatives
        .into_iter()
        .map(|alt| Ok(Sequence::ensure(r.rewrite_sequence(alt, child, analyzer)?)))
        .collect::<PackratResult<_>>()?;
    Ok(OrderedChoice {
        alternatives,
        pos: c.pos,
    }
    .into())
}

/// Rewrite every element of the sequence.
pub fn walk_sequence<R: Rewriter + ?Sized>(
    r: &mut R,
    s: Sequence,
    pos: Position,
    analyzer: &mut Analyzer,
) -> PackratResult<Element> {
    let len = s.len();
    let elements = s
        .elements
        .into_iter()
        .enumerate()
        .map(|(i, e)| r.rewrite_element(e, pos.element(i, len), analyzer))
        .collect::<PackratResult<_>>()?;
    Ok(Sequence {
        name: s.name,
        elements,
        pos: s.pos,
    }
    .into())
}

/// Dispatch choices and sequences, and rewrite the operands of unary
/// elements and the cases of character switches. All other elements are
/// returned unchanged.
pub fn walk_element<R: Rewriter + ?Sized>(
    r: &mut R,
    mut e: Element,
    pos: Position,
    analyzer: &mut Analyzer,
) -> PackratResult<Element> {
    match e {
        Element::Choice(c) => r.rewrite_choice(c, pos, analyzer),
        Element::Sequence(s) => r.rewrite_sequence(s, pos, analyzer),
        Element::CharSwitch(mut sw) => {
            let child = Position {
                last: pos.last,
                ..Default::default()
            };
            let mut cases = Vec::with_capacity(sw.cases.len());
            for kase in sw.cases {
                let element = match kase.element {
                    Some(e) => {
                        Some(Box::new(r.rewrite_element(*e, child, analyzer)?))
                    }
                    None => None,
                };
                cases.push(CharCase {
                    klass: kase.klass,
                    element,
                });
            }
            sw.cases = cases;
            if let Some(base) = sw.base.take() {
                sw.base = Some(Box::new(r.rewrite_element(*base, child, analyzer)?));
            }
            Ok(Element::CharSwitch(sw))
        }
        _ => {
            let child = pos.operand(&e);
            if let Some(operand) = e.unary_child_mut() {
                let inner = mem::replace(operand, Element::NullLiteral);
                *operand = r.rewrite_element(inner, child, analyzer)?;
            }
            Ok(e)
        }
    }
}

/// Rewrite the choice of `prod` in place.
///
/// The choice is moved out of the production for the duration of the
/// rewrite, so that the rewriter may look up other productions, including
/// this one, through the analyzer. Lookups of this production see an empty
/// choice in the meantime.
pub fn rewrite_production<R: Rewriter + ?Sized>(
    r: &mut R,
    prod: &ir::RRC<Production>,
    analyzer: &mut Analyzer,
) -> PackratResult<()> {
    let choice = mem::take(&mut prod.borrow_mut().choice);
    let choice = r.rewrite_choice(choice, Position::top(), analyzer)?;
    prod.borrow_mut().choice = choice.into_choice();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrat_ir::{Module, Type};
    use packrat_utils::Id;

    /// Records the positions of all literals.
    #[derive(Default)]
    struct Positions(Vec<(char, Position)>);

    impl Rewriter for Positions {
        fn rewrite_element(
            &mut self,
            e: Element,
            pos: Position,
            analyzer: &mut Analyzer,
        ) -> PackratResult<Element> {
            if let Element::CharLiteral(c) = e {
                self.0.push((c, pos));
                return Ok(e);
            }
            walk_element(self, e, pos, analyzer)
        }
    }

    #[test]
    fn positions_follow_structure() {
        let lit = Element::CharLiteral;
        let prod = Production::new(
            Id::new("P"),
            Type::Void,
            OrderedChoice::new(vec![Sequence::new(vec![
                lit('a'),
                Element::star(lit('b')),
                Element::choice(vec![
                    Sequence::new(vec![lit('c'), lit('d')]),
                    Sequence::new(vec![Element::NotFollowedBy(Box::new(lit('e')))]),
                ]),
            ])]),
        );
        let module = Module::new(Id::new("M"), vec![prod]);
        let mut analyzer = Analyzer::new(&module);
        let mut r = Positions::default();
        rewrite_production(&mut r, &module.productions[0], &mut analyzer).unwrap();
        let pos = |c: char| r.0.iter().find(|(l, _)| *l == c).unwrap().1;
        assert!(!pos('a').last);
        assert!(pos('b').repeated && !pos('b').repeated_once);
        assert!(!pos('c').last);
        assert!(pos('d').last);
        assert!(pos('e').predicate && pos('e').needs_sequence);
        assert_eq!(module.productions[0].borrow().choice.alternatives.len(), 1);
    }
}
