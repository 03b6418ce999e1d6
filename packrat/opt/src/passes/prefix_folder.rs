use crate::traversal::{
    Action, ConstructVisitor, Named, Position, Rewriter, VisResult, Visitor,
    rewrite_production, walk_element,
};
use packrat_ir::{self as ir, Analyzer, Element, OrderedChoice, RRC, Sequence};
use packrat_utils::{Id, PackratResult};

/// Folds runs of alternatives that start with the same elements into a
/// single alternative that shares the common prefix and ends in a choice
/// over the remainders. Choices inside syntactic predicates are left
/// alone.
pub struct PrefixFolder {
    verbose: bool,
    current: Id,
}

impl ConstructVisitor for PrefixFolder {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(PrefixFolder {
            verbose: ctx.config.verbose(),
            current: Id::default(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for PrefixFolder {
    fn name() -> &'static str {
        "prefix-folder"
    }

    fn description() -> &'static str {
        "fold alternatives with common prefixes"
    }
}

/// Splice a joined run of alternatives into `out`.
pub(super) fn splice(out: &mut Vec<Sequence>, joined: Element) {
    match joined {
        Element::Choice(c) => out.extend(c.alternatives),
        e => out.push(Sequence::ensure(e)),
    }
}

impl Rewriter for PrefixFolder {
    fn rewrite_choice(
        &mut self,
        c: OrderedChoice,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let mut folded = Vec::with_capacity(c.alternatives.len());
        let mut alternatives = c.alternatives.into_iter().peekable();
        while let Some(head) = alternatives.next() {
            let mut run = Vec::new();
            while let Some(next) =
                alternatives.next_if(|s| Analyzer::have_common_prefix(&head, s))
            {
                run.push(Analyzer::normalize_prefix(&head, next));
            }
            if run.is_empty() {
                folded.push(head);
                continue;
            }

            let joined = run
                .into_iter()
                .fold(Analyzer::join_prefixes(head, None), |joined, s| {
                    Analyzer::join_prefixes(s, Some(joined))
                });
            splice(&mut folded, joined);
            trace!(self.verbose, "[Folding prefixes in {}]", self.current);
        }

        let child = pos.alternative();
        let alternatives = folded
            .into_iter()
            .map(|alt| {
                let alt = self.rewrite_sequence(alt, child, analyzer)?;
                Ok(Sequence::ensure(alt))
            })
            .collect::<PackratResult<_>>()?;
        Ok(OrderedChoice {
            alternatives,
            pos: c.pos,
        }
        .into())
    }

    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        if e.is_predicate() {
            return Ok(e);
        }
        walk_element(self, e, pos, analyzer)
    }
}

impl Visitor for PrefixFolder {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        self.current = prod.borrow().qualified_name();
        rewrite_production(self, prod, analyzer)?;
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::{Binding, Copier, Type};

    fn folded(alternatives: Vec<Vec<Element>>) -> Vec<String> {
        let mut ctx = context(vec![prod("P", Type::Void, alternatives)]);
        run::<PrefixFolder>(&mut ctx);
        alts(&ctx, "P")
    }

    #[test]
    fn folds_common_prefixes() {
        let alts = folded(vec![
            vec![lit('a'), lit('b')],
            vec![lit('a'), lit('c')],
            vec![lit('d')],
        ]);
        assert_eq!(alts, vec!["('a' ('b' / 'c'))", "('d')"]);
    }

    #[test]
    fn folded_bindings_keep_their_references() {
        let bound = |tail: char| {
            let x = Binding::new(id("x"), nt("A"));
            vec![x.clone().into(), lit(tail), Element::BindingValue(x.to_ref())]
        };
        let mut ctx = context(vec![
            prod("P", Type::Node, vec![bound('b'), bound('c')]),
            prod("A", Type::Node, vec![vec![lit('a')]]),
        ]);
        run::<PrefixFolder>(&mut ctx);
        assert_eq!(alts(&ctx, "P").len(), 1);
        let p = get(&ctx, "P");
        let copy = Copier::default().copy_production(&p.borrow());
        assert!(copy.is_ok(), "{:?}", copy.err());
    }

    #[test]
    fn only_adjacent_alternatives_are_folded() {
        let alts = folded(vec![
            vec![lit('a'), lit('b')],
            vec![lit('d')],
            vec![lit('a'), lit('c')],
        ]);
        assert_eq!(alts, vec!["('a' 'b')", "('d')", "('a' 'c')"]);
    }

    #[test]
    fn identical_alternatives_collapse() {
        let alts = folded(vec![vec![nt("X"), lit('x')], vec![nt("X"), lit('x')]]);
        assert_eq!(alts, vec!["(X 'x')"]);
    }

    #[test]
    fn predicates_are_left_alone() {
        let pred = Element::NotFollowedBy(Box::new(choice(vec![
            vec![lit('a'), lit('b')],
            vec![lit('a'), lit('c')],
        ])));
        let alts = folded(vec![vec![pred, nt("X")]]);
        assert_eq!(alts, vec!["(!('a' 'b' / 'a' 'c') X)"]);
    }

    #[test]
    fn nested_choices_are_folded() {
        let nested = choice(vec![vec![lit('x'), lit('y')], vec![lit('x'), lit('z')]]);
        let alts = folded(vec![vec![nt("X"), nested]]);
        assert_eq!(alts, vec!["(X ('x' ('y' / 'z')))"]);
    }
}
