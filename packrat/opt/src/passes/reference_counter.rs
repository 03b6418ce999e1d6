use crate::analysis::ProductionGraph;
use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{
    self as ir, Analyzer, Element, MetaData, TransformOracle, is_recursive,
};
use packrat_utils::{Id, PackratResult};
use std::collections::HashMap;
use std::rc::Rc;

/// Counts the references to every production.
///
/// The usage count is the number of nonterminals referring to a
/// production, the self count the number of those inside the production
/// itself. References inside a one-or-more repetition count twice when the
/// repetition will be desugared into two productions. The leading
/// self-reference of a left-recursive alternative that will be transformed
/// does not count.
pub struct ReferenceCounter {
    oracle: Rc<dyn TransformOracle>,
    transform: bool,
    optimize_repeated: bool,
    /// Usage and self counts by qualified name.
    counts: HashMap<Id, (u32, u32)>,
}

impl ConstructVisitor for ReferenceCounter {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ReferenceCounter {
            oracle: Rc::clone(&ctx.oracle),
            transform: ctx.config.optimize_left_recursions
                || ctx.config.optimize_left_iterations,
            optimize_repeated: ctx.config.optimize_repeated,
            counts: HashMap::new(),
        })
    }

    fn clear_data(&mut self) {
        self.counts.clear();
    }
}

impl Named for ReferenceCounter {
    fn name() -> &'static str {
        "reference-counter"
    }

    fn description() -> &'static str {
        "count the references to every production"
    }
}

/// The production being counted.
struct Current {
    name: Id,
    memoized: bool,
}

impl ReferenceCounter {
    fn element(
        &mut self,
        e: &Element,
        once: bool,
        current: &Current,
        analyzer: &Analyzer,
    ) {
        match e {
            Element::NonTerminal(nt) => {
                let Some(target) = ProductionGraph::resolve(analyzer, nt.name)
                else {
                    return;
                };
                let times = if once
                    && (current.memoized || !self.optimize_repeated)
                {
                    2
                } else {
                    1
                };
                let (usage, own) = self.counts.entry(target).or_default();
                *usage += times;
                if target == current.name {
                    *own += times;
                }
            }
            Element::Repetition { once, element } => {
                self.element(element, *once, current, analyzer)
            }
            Element::Choice(c) => {
                for e in c.alternatives.iter().flat_map(|alt| &alt.elements) {
                    self.element(e, once, current, analyzer);
                }
            }
            Element::Sequence(s) => {
                for e in &s.elements {
                    self.element(e, once, current, analyzer);
                }
            }
            Element::CharSwitch(sw) => {
                let cases = sw.cases.iter().filter_map(|k| k.element.as_deref());
                for e in cases.chain(sw.base.as_deref()) {
                    self.element(e, once, current, analyzer);
                }
            }
            e => {
                if let Some(child) = e.unary_child() {
                    self.element(child, once, current, analyzer);
                }
            }
        }
    }
}

impl Visitor for ReferenceCounter {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        for prod in &module.productions {
            let p = prod.borrow();
            if !p.is_full() {
                continue;
            }
            analyzer.process(&p);
            let current = Current {
                name: p.qualified_name(),
                memoized: p.is_memoized(),
            };
            let transformable = self.transform && self.oracle.is_transformable(&p);
            for alt in &p.choice.alternatives {
                let skip = usize::from(transformable && is_recursive(alt, &p));
                for e in alt.elements.iter().skip(skip) {
                    self.element(e, false, &current, analyzer);
                }
            }
        }

        for prod in &module.productions {
            let mut p = prod.borrow_mut();
            let (usage, own) = self
                .counts
                .get(&p.qualified_name())
                .copied()
                .unwrap_or_default();
            let md = p.props.meta_data.get_or_insert_with(MetaData::default);
            md.usage_count = usage;
            md.self_count = own;
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::{Attribute, Type};
    use std::rc::Rc;

    fn counts(ctx: &ir::Context, name: &str) -> (u32, u32) {
        let p = get(ctx, name);
        let p = p.borrow();
        let md = p.props.meta_data.as_ref().unwrap();
        (md.usage_count, md.self_count)
    }

    #[test]
    fn counts_references() {
        let mut ctx = context(vec![
            public(prod(
                "List",
                Type::Void,
                vec![vec![nt("Item"), Element::star(nt("Item")), nt("Sep")], vec![nt("List"), nt("Sep")]],
            )),
            prod("Item", Type::Void, vec![vec![lit('i')]]),
            prod("Sep", Type::Void, vec![vec![lit(',')]]),
            prod("Unused", Type::Void, vec![vec![lit('u')]]),
        ]);
        run::<ReferenceCounter>(&mut ctx);
        assert_eq!(counts(&ctx, "Item"), (2, 0));
        assert_eq!(counts(&ctx, "Sep"), (2, 0));
        assert_eq!(counts(&ctx, "List"), (1, 1));
        assert_eq!(counts(&ctx, "Unused"), (0, 0));
    }

    #[test]
    fn repeated_references_count_twice_in_memoized_productions() {
        let mut ctx = context(vec![
            prod("Memo", Type::Void, vec![vec![Element::plus(nt("Item"))]]),
            prod("Item", Type::Void, vec![vec![lit('i')]])
                .with_attributes([Attribute::Inline]),
            prod("Inline", Type::Void, vec![vec![Element::plus(nt("Other"))]])
                .with_attributes([Attribute::Transient]),
            prod("Other", Type::Void, vec![vec![lit('o')]]),
        ]);
        run::<ReferenceCounter>(&mut ctx);
        assert_eq!(counts(&ctx, "Item"), (2, 0));
        assert_eq!(counts(&ctx, "Other"), (1, 0));
    }

    struct Always;

    impl TransformOracle for Always {
        fn is_transformable(&self, _p: &ir::Production) -> bool {
            true
        }
    }

    #[test]
    fn transformed_recursion_is_not_a_reference() {
        let mut ctx = context(vec![
            prod(
                "Expr",
                Type::Void,
                vec![vec![nt("Expr"), lit('+'), nt("Num")], vec![nt("Num")]],
            ),
            prod("Num", Type::Void, vec![vec![lit('1')]]),
        ])
        .with_oracle(Rc::new(Always));
        run::<ReferenceCounter>(&mut ctx);
        assert_eq!(counts(&ctx, "Expr"), (0, 0));
        assert_eq!(counts(&ctx, "Num"), (2, 0));
    }
}
