use crate::traversal::{
    Action, ConstructVisitor, DiagnosticContext, DiagnosticPass, Named,
    VisResult, Visitor,
};
use packrat_ir::{self as ir, Analyzer, Element, OrderedChoice, RRC};
use packrat_utils::{Error, PackratResult};

/// Reports alternatives that can never be tried because the alternative
/// before them accepts every input.
pub struct ReachabilityChecker {
    diag: DiagnosticContext,
}

impl ConstructVisitor for ReachabilityChecker {
    fn from(_ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ReachabilityChecker {
            diag: DiagnosticContext::default(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for ReachabilityChecker {
    fn name() -> &'static str {
        "reachability-checker"
    }

    fn description() -> &'static str {
        "report unreachable alternatives"
    }
}

impl DiagnosticPass for ReachabilityChecker {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

impl ReachabilityChecker {
    fn choice(&mut self, c: &OrderedChoice, analyzer: &mut Analyzer) {
        let size = c.alternatives.len();
        for (i, alt) in c.alternatives.iter().enumerate() {
            let restricts = alt.elements.iter().any(|e| analyzer.restricts_input(e));
            if !restricts && i + 1 < size {
                self.diag.err(
                    Error::malformed_structure("unreachable alternative")
                        .with_pos(&c.alternatives[i + 1]),
                );
                break;
            }
            for e in &alt.elements {
                self.element(e, analyzer);
            }
        }
    }

    fn element(&mut self, e: &Element, analyzer: &mut Analyzer) {
        match e {
            Element::Choice(c) => self.choice(c, analyzer),
            Element::Sequence(s) => {
                for e in &s.elements {
                    self.element(e, analyzer);
                }
            }
            Element::CharSwitch(sw) => {
                let cases = sw.cases.iter().filter_map(|k| k.element.as_deref());
                for e in cases.chain(sw.base.as_deref()) {
                    self.element(e, analyzer);
                }
            }
            e => {
                if let Some(child) = e.unary_child() {
                    self.element(child, analyzer);
                }
            }
        }
    }
}

impl Visitor for ReachabilityChecker {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        self.choice(&prod.borrow().choice, analyzer);
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::Type;

    #[test]
    fn reports_shadowed_alternatives() {
        let mut ctx = context(vec![
            prod(
                "A",
                Type::Void,
                vec![vec![lit('a')], vec![Element::star(lit('b'))], vec![lit('c')]],
            ),
            prod(
                "B",
                Type::Void,
                vec![vec![choice(vec![vec![Element::Optional(Box::new(lit('x')))], vec![lit('y')]])]],
            ),
            prod("C", Type::Void, vec![vec![lit('a')], vec![nt("D")], vec![]]),
            prod("D", Type::Void, vec![vec![lit('d')]]),
        ]);
        let pass = run::<ReachabilityChecker>(&mut ctx);
        let errors: Vec<_> = pass.diagnostics().errors_iter().collect();
        // One in A and one in the nested choice of B.
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message().contains("unreachable alternative"));
    }
}
