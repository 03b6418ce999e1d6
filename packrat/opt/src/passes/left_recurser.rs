use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{
    self as ir, Analyzer, Element, OrderedChoice, Production, RRC,
    TransformOracle, is_base,
};
use packrat_utils::{Id, PackratResult};
use std::collections::HashSet;
use std::rc::Rc;

/// Detects left-recursive productions: productions that may reference
/// themselves, directly or indirectly, before consuming any input.
///
/// The search through a sequence stops at the first element that is
/// guaranteed to consume input. Productions the left-recursion
/// transformation will rewrite only contribute their base alternatives.
/// Every production found is marked as recursive.
pub struct LeftRecurser {
    oracle: Rc<dyn TransformOracle>,
    /// Whether directly left-recursive productions will be transformed.
    transform: bool,
    verbose: bool,
    /// The element just visited consumes input.
    terminated: bool,
    recursive: HashSet<Id>,
}

impl ConstructVisitor for LeftRecurser {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(LeftRecurser {
            oracle: Rc::clone(&ctx.oracle),
            transform: ctx.config.optimize_left_recursions
                || ctx.config.optimize_left_iterations,
            verbose: ctx.config.verbose(),
            terminated: false,
            recursive: HashSet::new(),
        })
    }

    fn clear_data(&mut self) {
        self.terminated = false;
        self.recursive.clear();
    }
}

impl Named for LeftRecurser {
    fn name() -> &'static str {
        "left-recurser"
    }

    fn description() -> &'static str {
        "detect left-recursive productions"
    }
}

impl LeftRecurser {
    /// The productions found to be left-recursive.
    pub fn recursive(&self) -> &HashSet<Id> {
        &self.recursive
    }

    fn production(&mut self, prod: &RRC<Production>, analyzer: &mut Analyzer) {
        let p = prod.borrow();
        let name = p.qualified_name();
        analyzer.working_on(name);
        if self.transform && self.oracle.is_transformable(&p) {
            for alt in &p.choice.alternatives {
                if is_base(alt, &p) {
                    self.sequence(&alt.elements, analyzer);
                }
            }
        } else {
            self.choice(&p.choice, analyzer);
        }
        analyzer.not_working_on(name);
        analyzer.processed(name);
    }

    fn choice(&mut self, c: &OrderedChoice, analyzer: &mut Analyzer) {
        let mut more = false;
        for alt in &c.alternatives {
            self.terminated = false;
            self.sequence(&alt.elements, analyzer);
            if !self.terminated {
                more = true;
            }
        }
        if more {
            self.terminated = false;
        }
    }

    fn sequence(&mut self, elements: &[Element], analyzer: &mut Analyzer) {
        for e in elements {
            self.element(e, analyzer);
            if self.terminated {
                break;
            }
        }
    }

    fn element(&mut self, e: &Element, analyzer: &mut Analyzer) {
        match e {
            Element::Choice(c) => self.choice(c, analyzer),
            Element::Sequence(s) => self.sequence(&s.elements, analyzer),
            Element::Repetition { once, element } => {
                self.element(element, analyzer);
                if !once {
                    self.terminated = false;
                }
            }
            Element::Voided(e) => self.element(e, analyzer),
            Element::Binding(b) => self.element(&b.element, analyzer),
            Element::StringMatch(m) => self.element(&m.element, analyzer),
            Element::Optional(e)
            | Element::FollowedBy(e)
            | Element::NotFollowedBy(e) => {
                self.element(e, analyzer);
                self.terminated = false;
            }
            Element::NonTerminal(nt) => {
                let Ok(prod) = analyzer.lookup(nt.name) else {
                    self.terminated = true;
                    return;
                };
                let name = prod.borrow().qualified_name();
                if analyzer.is_being_worked_on(name) {
                    analyzer.mark(name);
                    self.recursive.insert(name);
                    self.terminated = true;
                } else if !analyzer.is_processed(name) {
                    self.production(&prod, analyzer);
                } else {
                    self.terminated = true;
                }
            }
            Element::ParserAction(_) => self.terminated = true,
            e if e.is_terminal() => self.terminated = true,
            _ => (),
        }
    }
}

impl Visitor for LeftRecurser {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        for prod in &module.productions {
            let (full, name) = {
                let p = prod.borrow();
                (p.is_full(), p.qualified_name())
            };
            if !full || analyzer.is_processed(name) {
                continue;
            }
            self.terminated = false;
            analyzer.process(&prod.borrow());
            self.production(prod, analyzer);
        }

        for prod in &module.productions {
            let mut p = prod.borrow_mut();
            if self.recursive.contains(&p.qualified_name()) {
                trace!(
                    self.verbose,
                    "[Recognizing {} as left-recursive]",
                    p.qualified_name()
                );
                p.props.recursive = true;
            }
        }
        Ok(Action::Stop)
    }
}
