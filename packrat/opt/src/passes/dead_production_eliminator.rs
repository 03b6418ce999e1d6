use crate::analysis::ProductionGraph;
use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{self as ir, Analyzer};
use packrat_utils::{Id, PackratResult};

/// Removes the productions that cannot be reached from the module's root
/// or, if the root is unknown, from its public productions.
pub struct DeadProductionEliminator {
    verbose: bool,
}

impl ConstructVisitor for DeadProductionEliminator {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(DeadProductionEliminator {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for DeadProductionEliminator {
    fn name() -> &'static str {
        "dead-production-eliminator"
    }

    fn description() -> &'static str {
        "remove unreachable productions"
    }
}

impl Visitor for DeadProductionEliminator {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let roots: Vec<Id> = match module.root {
            Some(root) => vec![root],
            None => module
                .productions
                .iter()
                .map(|p| p.borrow())
                .filter(|p| p.is_public())
                .map(|p| p.qualified_name())
                .collect(),
        };
        let reached = ProductionGraph::new(module, analyzer).reachable_from(roots);

        let dead: Vec<Id> = module
            .productions
            .iter()
            .map(|p| p.borrow().qualified_name())
            .filter(|name| !reached.contains(name))
            .collect();
        for name in dead {
            trace!(self.verbose, "[Removing dead production {name}]");
            analyzer.remove(module, name);
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::{Element, Type};

    #[test]
    fn removes_unreachable_productions() {
        let mut ctx = context(vec![
            public(prod("P", Type::Void, vec![vec![nt("A"), Element::star(nt("B"))]])),
            prod("A", Type::Void, vec![vec![lit('a')]]),
            prod("B", Type::Void, vec![vec![lit('b'), nt("P")]]),
            prod("Dead", Type::Void, vec![vec![nt("Loop")]]),
            prod("Loop", Type::Void, vec![vec![lit('l'), nt("Loop")], vec![]]),
        ]);
        run::<DeadProductionEliminator>(&mut ctx);
        for name in ["P", "A", "B"] {
            assert!(has(&ctx, name), "{name} was removed");
        }
        assert!(!has(&ctx, "Dead") && !has(&ctx, "Loop"));
    }

    #[test]
    fn starts_from_the_root() {
        let mut ctx = context(vec![
            public(prod("P", Type::Void, vec![vec![nt("A")]])),
            public(prod("Q", Type::Void, vec![vec![lit('q')]])),
            prod("A", Type::Void, vec![vec![lit('a')]]),
        ]);
        ctx.grammar.modules[0].root = Some(id("P"));
        run::<DeadProductionEliminator>(&mut ctx);
        assert!(has(&ctx, "P") && has(&ctx, "A"));
        assert!(!has(&ctx, "Q"));
    }
}
