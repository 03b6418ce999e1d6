use super::text_tester::{Reference, body_dependencies};
use crate::analysis::{GreatestFixpoint, ProductionGraph};
use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{self as ir, Analyzer, Element};
use packrat_utils::{Id, PackratResult};
use std::collections::HashSet;

/// Recognizes lexical syntax and the token-level productions within it.
///
/// A production is lexical if it is text-only, or if it is void and built
/// from terminals, predicates, and references to other lexical
/// productions only. Walking down from the public productions, the first
/// lexical productions reached that consume input are token-level: their
/// value is the token they matched.
///
/// Requires [super::TextTester] to have run.
pub struct Tokenizer {
    verbose: bool,
}

impl ConstructVisitor for Tokenizer {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(Tokenizer {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for Tokenizer {
    fn name() -> &'static str {
        "tokenizer"
    }

    fn description() -> &'static str {
        "recognize lexical syntax and token-level productions"
    }
}

impl Tokenizer {
    /// Mark the lexical productions of the module.
    fn lexical(&self, module: &ir::Module, analyzer: &Analyzer) {
        let mut fixpoint = GreatestFixpoint::default();
        for prod in &module.productions {
            let p = prod.borrow();
            if !p.is_full() {
                continue;
            }
            if p.props.text_only {
                fixpoint.settle(p.qualified_name(), true);
            } else if p.ty.is_void() {
                let deps = body_dependencies(&p.choice, &mut |name| {
                    let Ok(target) = analyzer.lookup(name) else {
                        return Reference::Fails;
                    };
                    match target.try_borrow() {
                        Ok(t) if t.props.text_only => Reference::Holds,
                        Ok(t) if t.ty.is_void() => {
                            Reference::Depends(t.qualified_name())
                        }
                        _ => Reference::Fails,
                    }
                });
                fixpoint.candidate(p.qualified_name(), deps);
            }
        }

        let lexical = fixpoint.solve();
        for prod in &module.productions {
            let mut p = prod.borrow_mut();
            if lexical.contains(&p.qualified_name()) {
                trace!(
                    self.verbose,
                    "[Recognizing {} as lexical syntax]",
                    p.qualified_name()
                );
                p.props.lexical = true;
            }
        }
    }
}

impl Visitor for Tokenizer {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        self.lexical(module, analyzer);

        let graph = ProductionGraph::new(module, analyzer);
        let candidates: Vec<Id> = match module.root {
            Some(root) => ProductionGraph::resolve(analyzer, root)
                .into_iter()
                .collect(),
            None => module
                .productions
                .iter()
                .map(|p| p.borrow().qualified_name())
                .collect(),
        };
        let mut todo: Vec<Id> = candidates
            .into_iter()
            .rev()
            .filter(|name| {
                analyzer
                    .lookup(*name)
                    .is_ok_and(|p| p.borrow().is_public())
            })
            .collect();

        let mut processed = HashSet::new();
        while let Some(name) = todo.pop() {
            if !processed.insert(name) {
                continue;
            }
            let prod = analyzer.lookup(name)?;
            if !prod.borrow().props.lexical {
                let mut refs: Vec<Id> = graph.references(name).collect();
                refs.sort();
                todo.extend(refs.into_iter().rev());
                continue;
            }
            if analyzer.consumes_input(&Element::nonterminal(name)) {
                let mut p = prod.borrow_mut();
                trace!(self.verbose, "[Recognizing {name} as token-level]");
                p.props.token = true;
                p.props.text_only = false;
            }
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::TextTester;
    use crate::passes::testing::*;
    use packrat_ir::Type;

    #[test]
    fn marks_tokens_below_public_productions() {
        let mut ctx = context(vec![
            public(prod(
                "Program",
                Type::Node,
                vec![vec![nt("Spacing"), bind("w", nt("Word")), nt("EndOfFile")]],
            )),
            prod("Word", Type::String, vec![vec![Element::plus(nt("Letter"))]]),
            prod("Letter", Type::String, vec![vec![Element::AnyChar]]),
            prod(
                "Spacing",
                Type::Void,
                vec![vec![Element::star(choice(vec![vec![lit(' ')], vec![nt("Comment")]]))]],
            ),
            prod("Comment", Type::Void, vec![vec![text("//"), Element::star(nt("Letter"))]]),
            prod(
                "EndOfFile",
                Type::Void,
                vec![vec![Element::NotFollowedBy(Box::new(Element::AnyChar))]],
            ),
            prod("Unused", Type::Void, vec![vec![lit('u')]]),
        ]);
        run::<TextTester>(&mut ctx);
        run::<Tokenizer>(&mut ctx);

        let props = |name: &str| get(&ctx, name).borrow().props.clone();
        assert!(props("Word").lexical && props("Word").token);
        assert!(!props("Word").text_only);
        // Only reached through Word.
        assert!(props("Letter").lexical && !props("Letter").token);
        assert!(props("Letter").text_only);
        assert!(props("Spacing").token);
        assert!(props("Comment").lexical && !props("Comment").token);
        assert!(props("EndOfFile").lexical && !props("EndOfFile").token);
        assert!(props("Unused").lexical && !props("Unused").token);
        assert!(!props("Program").lexical);
    }
}
