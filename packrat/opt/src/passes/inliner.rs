use super::{CostEstimator, is_generic};
use crate::traversal::{
    Action, ConstructVisitor, Named, ParseVal, PassOpt, Position, Rewriter,
    VisResult, Visitor, rewrite_production, walk_element,
};
use packrat_ir::{
    self as ir, Analyzer, Attribute, Copier, Cost, Element, OrderedChoice,
    Production, VALUE,
};
use packrat_utils::{Id, PackratResult};
use std::rc::Rc;

/// Replaces references to productions by the productions' bodies.
///
/// A production whose body is a single nonterminal, possibly bound to the
/// value, is an alias: references to it are redirected to the aliased
/// production unless it is memoized or marked `noinline`. When cost
/// optimization is enabled, unbound references in void, text-only, and
/// token-level productions are also replaced by a copy of the referenced
/// production if it costs at most `max-cost`. Generic, list-valued,
/// explicit, and, in stateful modules, stateful or resetting productions
/// are never inlined. The pass repeats until nothing changes.
pub struct Inliner {
    optimize_cost: bool,
    max_cost: Cost,
    verbose: bool,
    /// The module is stateful.
    stateful: bool,
    /// The production being rewritten.
    current: Id,
    /// The production being rewritten is void, text-only, or token-level.
    basic: bool,
    /// Something was inlined during this round.
    inlined: bool,
}

impl ConstructVisitor for Inliner {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        let opts = Self::get_opts(ctx)?;
        let max_cost = opts["max-cost"].pos_num()?;
        let max_cost = Cost::new(u32::try_from(max_cost).unwrap_or(u32::MAX));
        Ok(Inliner {
            optimize_cost: ctx.config.optimize_cost,
            max_cost,
            verbose: ctx.config.verbose(),
            stateful: false,
            current: Id::default(),
            basic: false,
            inlined: false,
        })
    }

    fn clear_data(&mut self) {
        self.stateful = false;
        self.inlined = false;
    }
}

impl Named for Inliner {
    fn name() -> &'static str {
        "inliner"
    }

    fn description() -> &'static str {
        "inline aliases and cheap productions"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "max-cost",
            "highest cost of a production that is inlined",
            ParseVal::Num(1),
            PassOpt::parse_num,
        )]
    }
}

/// The nonterminal a production's body consists of, if any.
fn alias(choice: &OrderedChoice) -> Option<Id> {
    let [alt] = choice.alternatives.as_slice() else {
        return None;
    };
    let [e] = alt.elements.as_slice() else {
        return None;
    };
    match Analyzer::strip(e) {
        Element::NonTerminal(nt) => Some(nt.name),
        Element::Binding(b) if b.name == VALUE => {
            match Analyzer::strip(&b.element) {
                Element::NonTerminal(nt) => Some(nt.name),
                _ => None,
            }
        }
        _ => None,
    }
}

impl Inliner {
    fn never_inlined(&self, p: &Production) -> bool {
        is_generic(p)
            || p.ty.is_list()
            || p.has_attribute(Attribute::Explicit)
            || (self.stateful
                && (p.has_attribute(Attribute::Stateful)
                    || p.has_attribute(Attribute::Resetting)))
    }

    fn inlined(&mut self, p: &Production) {
        self.inlined = true;
        trace!(
            self.verbose,
            "[Inlining {} into {}]",
            p.qualified_name(),
            self.current
        );
    }

    /// The replacement for a reference to `name`, if it is inlined.
    fn inline(
        &mut self,
        name: Id,
        bound: bool,
        analyzer: &Analyzer,
    ) -> PackratResult<Option<Element>> {
        let Ok(prod) = analyzer.lookup(name) else {
            return Ok(None);
        };
        let p = prod.borrow();
        if p.qualified_name() == self.current || self.never_inlined(&p) {
            return Ok(None);
        }
        let inlinable = !p.is_memoized() && !p.has_attribute(Attribute::NoInline);

        if let Some(target) = alias(&p.choice) {
            if !inlinable {
                return Ok(None);
            }
            self.inlined(&p);
            return Ok(Some(Element::nonterminal(target)));
        }

        let cost = p.props.cost.unwrap_or(Cost::UNBOUNDED);
        if !self.basic || bound || !self.optimize_cost {
            Ok(None)
        } else if !cost.is_unbounded()
            && cost <= self.max_cost
            && !p.has_attribute(Attribute::NoInline)
        {
            self.inlined(&p);
            let copy = Copier::default().copy_choice(&p.choice)?;
            Ok(Some(copy.into()))
        } else {
            Ok(None)
        }
    }
}

impl Rewriter for Inliner {
    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        match e {
            Element::NonTerminal(nt) => {
                let replacement = self.inline(nt.name, pos.bound, analyzer)?;
                Ok(replacement.map_or(e, |r| match r {
                    Element::NonTerminal(mut target) => {
                        target.pos = nt.pos;
                        Element::NonTerminal(target)
                    }
                    r => r,
                }))
            }
            e => walk_element(self, e, pos, analyzer),
        }
    }
}

impl Visitor for Inliner {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let mut estimator = CostEstimator::default();
        loop {
            if self.optimize_cost {
                estimator.estimate(module, analyzer);
            }
            analyzer.init(module);
            self.stateful = module.is_stateful();
            self.inlined = false;

            let prods: Vec<_> = module.productions.iter().map(Rc::clone).collect();
            for prod in prods {
                {
                    let p = prod.borrow();
                    if !p.is_full() {
                        continue;
                    }
                    analyzer.process(&p);
                    self.current = p.qualified_name();
                    self.basic = p.is_basic();
                }
                rewrite_production(self, &prod, analyzer)?;
            }

            if !self.inlined {
                break;
            }
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::Type;

    #[test]
    fn collapses_alias_chains() {
        let mut ctx = context(vec![
            prod("P", Type::Node, vec![vec![bind(VALUE, nt("A"))]]),
            prod("A", Type::Node, vec![vec![bind(VALUE, nt("B"))]])
                .with_attributes([Attribute::Transient]),
            prod("B", Type::Node, vec![vec![nt("C")]])
                .with_attributes([Attribute::Transient]),
            prod("C", Type::Node, vec![vec![lit('c'), lit('c')]]),
        ]);
        run::<Inliner>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["(yyValue:C)"]);
        assert_eq!(alts(&ctx, "A"), vec!["(yyValue:C)"]);
    }

    #[test]
    fn memoized_and_noinline_aliases_stay() {
        let mut ctx = context(vec![
            prod("P", Type::Node, vec![vec![nt("A"), nt("B")]]),
            prod("A", Type::Node, vec![vec![nt("C")]]),
            prod("B", Type::Node, vec![vec![nt("C")]])
                .with_attributes([Attribute::Transient, Attribute::NoInline]),
            prod("C", Type::Node, vec![vec![lit('c'), lit('c')]]),
        ]);
        run::<Inliner>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["(A B)"]);
    }

    #[test]
    fn inlines_cheap_productions_into_void_ones() {
        let mut ctx = context(vec![
            prod("P", Type::Void, vec![vec![nt("Space"), lit('x'), bind("s", nt("Space"))]]),
            prod("N", Type::Node, vec![vec![nt("Space"), lit('x')]]),
            prod("Space", Type::Void, vec![vec![lit(' ')]]),
        ]);
        run::<Inliner>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["((' ') 'x' s:Space)"]);
        assert_eq!(alts(&ctx, "N"), vec!["(Space 'x')"]);
    }

    #[test]
    fn respects_the_cost_threshold() {
        let mut ctx = context(vec![
            prod("P", Type::Void, vec![vec![nt("Pair")]]),
            prod("Pair", Type::Void, vec![vec![lit('a'), lit('b')]]),
        ]);
        ctx.extra_opts = vec!["inliner:max-cost=2".to_string()];
        run::<Inliner>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["(('a' 'b'))"]);

        let mut ctx = context(vec![
            prod("P", Type::Void, vec![vec![nt("Pair")]]),
            prod("Pair", Type::Void, vec![vec![lit('a'), lit('b')]]),
        ]);
        run::<Inliner>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["(Pair)"]);
    }

    #[test]
    fn malformed_costs_are_rejected() {
        for opt in ["inliner:max-cost=lots", "inliner:max-cost=-1", "inliner:max-cost"] {
            let mut ctx = context(vec![prod("P", Type::Void, vec![vec![lit('p')]])]);
            ctx.extra_opts = vec![opt.to_string()];
            assert!(Inliner::do_pass_default(&mut ctx).is_err(), "{opt}");
        }
    }

    #[test]
    fn lists_are_never_inlined() {
        let mut ctx = context(vec![
            prod("P", Type::Void, vec![vec![nt("L")]]),
            prod("L", Type::list(Type::Node), vec![vec![nt("C")]])
                .with_attributes([Attribute::Transient]),
            prod("C", Type::Node, vec![vec![lit('c')]]),
        ]);
        run::<Inliner>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["(L)"]);
    }
}
