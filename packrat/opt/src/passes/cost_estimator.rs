use crate::traversal::{Action, Named, VisResult, Visitor};
use packrat_ir::{
    self as ir, Analyzer, Cost, Element, OrderedChoice, Production, RRC,
};
use packrat_utils::Id;
use std::collections::HashMap;

/// Estimates the cost of parsing each production, as a rough count of the
/// character tests and method calls its parser performs.
///
/// A sequence costs the sum of its elements and a choice the sum of its
/// alternatives, since all of them may be tried. An option or predicate
/// adds one to its operand. Characters cost one each and a reference costs
/// one more than the referenced production. Repetitions, parser actions,
/// and references that close a cycle are [unbounded](Cost::UNBOUNDED).
#[derive(Default)]
pub struct CostEstimator {
    costs: HashMap<Id, Cost>,
}

impl Named for CostEstimator {
    fn name() -> &'static str {
        "cost-estimator"
    }

    fn description() -> &'static str {
        "estimate the parsing cost of every production"
    }
}

impl CostEstimator {
    /// Recompute the cost of every production in the module.
    pub fn estimate(&mut self, module: &ir::Module, analyzer: &mut Analyzer) {
        self.costs.clear();
        for prod in &module.productions {
            prod.borrow_mut().props.cost = None;
        }
        for prod in &module.productions {
            let name = prod.borrow().qualified_name();
            if !self.costs.contains_key(&name) {
                analyzer.process(&prod.borrow());
                self.production(prod, analyzer);
            }
        }
        for prod in &module.productions {
            let mut p = prod.borrow_mut();
            p.props.cost = self.costs.get(&p.qualified_name()).copied();
        }
    }

    fn production(
        &mut self,
        prod: &RRC<Production>,
        analyzer: &mut Analyzer,
    ) -> Cost {
        let p = prod.borrow();
        let name = p.qualified_name();
        analyzer.working_on(name);
        let cost = self.choice(&p.choice, analyzer);
        analyzer.not_working_on(name);
        self.costs.insert(name, cost);
        cost
    }

    fn choice(&mut self, c: &OrderedChoice, analyzer: &mut Analyzer) -> Cost {
        c.alternatives
            .iter()
            .flat_map(|alt| &alt.elements)
            .map(|e| self.element(e, analyzer))
            .sum()
    }

    fn element(&mut self, e: &Element, analyzer: &mut Analyzer) -> Cost {
        match e {
            Element::Choice(c) => self.choice(c, analyzer),
            Element::Sequence(s) => {
                s.elements.iter().map(|e| self.element(e, analyzer)).sum()
            }
            Element::Repetition { .. }
            | Element::ParserAction(_)
            | Element::ActionBaseValue { .. } => Cost::UNBOUNDED,
            Element::Optional(e)
            | Element::FollowedBy(e)
            | Element::NotFollowedBy(e) => self.element(e, analyzer) + 1,
            Element::StringMatch(m) => self.element(&m.element, analyzer) + 1,
            Element::SemanticPredicate(_) => Cost::new(2),
            Element::Voided(e) => self.element(e, analyzer),
            Element::Binding(b) => self.element(&b.element, analyzer),
            Element::NonTerminal(nt) => {
                let Ok(prod) = analyzer.lookup(nt.name) else {
                    return Cost::UNBOUNDED;
                };
                let name = prod.borrow().qualified_name();
                if analyzer.is_being_worked_on(name) {
                    return Cost::UNBOUNDED;
                }
                let cost = match self.costs.get(&name) {
                    Some(cost) => *cost,
                    None => self.production(&prod, analyzer),
                };
                cost + 1
            }
            Element::StringLiteral(s) => Cost::new(s.chars().count() as u32),
            Element::CharSwitch(sw) => {
                let mut cost = Cost::ZERO;
                for kase in &sw.cases {
                    let case = match &kase.element {
                        Some(e) => self.element(e, analyzer),
                        None => Cost::ZERO,
                    };
                    cost = cost.max(case + 1);
                }
                if let Some(base) = &sw.base {
                    cost = cost.max(self.element(base, analyzer) + 1);
                }
                cost
            }
            Element::AnyChar
            | Element::CharLiteral(_)
            | Element::CharClass(_)
            | Element::Action(_) => Cost::new(1),
            Element::StringValue(None) => Cost::new(1),
            Element::ProperListValue { elements, .. } => {
                Cost::new(elements.len() as u32)
            }
            Element::GenericNodeValue(_)
            | Element::GenericRecursionValue { .. } => Cost::new(2),
            Element::GenericActionValue { .. } => Cost::new(1),
            _ => Cost::ZERO,
        }
    }
}

impl Visitor for CostEstimator {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        self.estimate(module, analyzer);
        Ok(Action::Stop)
    }
}
