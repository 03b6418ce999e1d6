use crate::analysis::ProductionGraph;
use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{self as ir, Analyzer};
use packrat_utils::PackratResult;

/// Finds the real root of a module: the public production from which all
/// other public productions are reachable. Later passes start their
/// traversals from the root instead of from every public production.
pub struct RootFinder {
    verbose: bool,
}

impl ConstructVisitor for RootFinder {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(RootFinder {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for RootFinder {
    fn name() -> &'static str {
        "root-finder"
    }

    fn description() -> &'static str {
        "find the public production all other public productions are reachable from"
    }
}

impl Visitor for RootFinder {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        if module.root.is_some() {
            return Ok(Action::Stop);
        }
        let top_level: Vec<_> = module
            .productions
            .iter()
            .filter(|p| p.borrow().is_public())
            .map(|p| p.borrow().qualified_name())
            .collect();

        if let [root] = top_level.as_slice() {
            module.root = Some(*root);
            return Ok(Action::Stop);
        }

        let graph = ProductionGraph::new(module, analyzer);
        for candidate in &top_level {
            let reached = graph.reachable_from([*candidate]);
            if top_level.iter().all(|p| reached.contains(p)) {
                trace!(self.verbose, "[Recognizing {candidate} as real root]");
                module.root = Some(*candidate);
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
    use packrat_ir::{Element, Type};

    #[test]
    fn finds_real_root() {
        let mut ctx = context(vec![
            public(prod("Expr", Type::Node, vec![vec![nt("Term")]])),
            public(prod("File", Type::Node, vec![vec![nt("Expr"), nt("Eof")]])),
            public(prod("Term", Type::Node, vec![vec![lit('x')]])),
            prod("Eof", Type::Void, vec![vec![Element::NotFollowedBy(Box::new(Element::AnyChar))]]),
        ]);
        run::<RootFinder>(&mut ctx);
        assert_eq!(ctx.grammar.modules[0].root, Some(id("File")));
    }

    #[test]
    fn no_root_among_unrelated_productions() {
        let mut ctx = context(vec![
            public(prod("A", Type::Void, vec![vec![lit('a')]])),
            public(prod("B", Type::Void, vec![vec![lit('b')]])),
        ]);
        run::<RootFinder>(&mut ctx);
        assert_eq!(ctx.grammar.modules[0].root, None);
    }

    #[test]
    fn single_public_production_is_root() {
        let mut ctx = context(vec![
            prod("A", Type::Void, vec![vec![lit('a')]]),
            public(prod("B", Type::Void, vec![vec![lit('b')]])),
        ]);
        run::<RootFinder>(&mut ctx);
        assert_eq!(ctx.grammar.modules[0].root, Some(id("B")));
    }
}
