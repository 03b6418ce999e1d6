use crate::analysis::ProductionGraph;
use crate::traversal::{
    Action, ConstructVisitor, Named, Position, Rewriter, VisResult, Visitor,
    rewrite_production, walk_element,
};
use packrat_ir::{self as ir, Analyzer, Element, Type, VALUE};
use packrat_utils::{Id, PackratResult};
use std::collections::HashSet;

/// Voids productions whose semantic value is never used.
///
/// A production that is neither public nor void can be voided if it does
/// not determine its own value (no binding to the value variable, no
/// action setting it, no parser action) and no other production binds a
/// reference to it. Voiding a production drops its synthetic bindings,
/// which may in turn make further productions voidable, so the pass
/// repeats until nothing changes.
pub struct ProductionVoider {
    verbose: bool,
}

impl ConstructVisitor for ProductionVoider {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ProductionVoider {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for ProductionVoider {
    fn name() -> &'static str {
        "production-voider"
    }

    fn description() -> &'static str {
        "void productions whose semantic value is never used"
    }
}

/// Whether the production determines its own value.
fn sets_own_value(choice: &ir::OrderedChoice) -> bool {
    let mut sets = false;
    for alt in &choice.alternatives {
        for e in &alt.elements {
            e.walk(&mut |e| match e {
                Element::Binding(b) if b.name.as_str() == VALUE => sets = true,
                Element::Action(a) if a.sets_value() => sets = true,
                Element::ParserAction(_) => sets = true,
                _ => (),
            });
        }
    }
    sets
}

/// The nonterminals whose value is captured by a binding.
fn bound_nonterminals(choice: &ir::OrderedChoice) -> Vec<Id> {
    let mut bound = Vec::new();
    for alt in &choice.alternatives {
        for e in &alt.elements {
            e.walk(&mut |e| {
                if let Element::Binding(b) = e {
                    b.element.walk(&mut |e| {
                        if let Element::NonTerminal(nt) = e {
                            bound.push(nt.name);
                        }
                    });
                }
            });
        }
    }
    bound
}

/// The productions of the module that can be voided.
fn voidable(module: &ir::Module, analyzer: &Analyzer) -> HashSet<Id> {
    let mut candidates = HashSet::new();
    for prod in &module.productions {
        let p = prod.borrow();
        if p.is_full()
            && !p.is_public()
            && !p.ty.is_void()
            && !sets_own_value(&p.choice)
        {
            candidates.insert(p.qualified_name());
        }
    }

    for prod in &module.productions {
        let p = prod.borrow();
        for name in bound_nonterminals(&p.choice) {
            // Self-referential productions can still be voided.
            match ProductionGraph::resolve(analyzer, name) {
                Some(target) if target != p.qualified_name() => {
                    candidates.remove(&target);
                }
                _ => (),
            }
        }
    }
    candidates
}

/// Strips what only makes sense for productions with a value.
struct Voiding;

impl Rewriter for Voiding {
    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        Ok(match walk_element(self, e, pos, analyzer)? {
            // The whole production is voided.
            Element::Voided(inner) => *inner,
            // Synthetic variables are only referenced by value elements.
            Element::Binding(b) if Analyzer::is_synthetic_variable(b.name) => {
                *b.element
            }
            e if e.is_value() => Element::NullValue,
            e => e,
        })
    }
}

impl Visitor for ProductionVoider {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        loop {
            analyzer.init(module);
            let voidable = voidable(module, analyzer);
            if voidable.is_empty() {
                break;
            }
            for prod in &module.productions {
                let name = prod.borrow().qualified_name();
                if !voidable.contains(&name) {
                    continue;
                }
                trace!(self.verbose, "[Voiding {name}]");
                analyzer.process(&prod.borrow());
                rewrite_production(&mut Voiding, prod, analyzer)?;
                let mut p = prod.borrow_mut();
                p.ty = Type::Void;
                p.props.voided = true;
            }
        }
        Ok(Action::Stop)
    }
}
