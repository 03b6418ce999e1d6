use crate::traversal::{
    Action, ConstructVisitor, DiagnosticContext, DiagnosticPass, Named,
    VisResult, Visitor,
};
use packrat_ir::{self as ir, Analyzer, Element, OrderedChoice, RRC, Sequence};
use packrat_utils::{Error, GPosIdx, PackratResult};

/// Reports alternatives of productions with a semantic value that do not
/// set that value.
///
/// The elements of an alternative ending in a choice are checked together
/// with each alternative of that choice.
pub struct ValueChecker {
    diag: DiagnosticContext,
}

impl ConstructVisitor for ValueChecker {
    fn from(_ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ValueChecker {
            diag: DiagnosticContext::default(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for ValueChecker {
    fn name() -> &'static str {
        "value-checker"
    }

    fn description() -> &'static str {
        "report alternatives without a semantic value"
    }
}

impl DiagnosticPass for ValueChecker {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

impl ValueChecker {
    fn choice<'a>(
        &mut self,
        c: &'a OrderedChoice,
        prefix: &mut Vec<&'a Element>,
    ) {
        for alt in &c.alternatives {
            self.sequence(alt, prefix);
        }
    }

    fn sequence<'a>(
        &mut self,
        s: &'a Sequence,
        prefix: &mut Vec<&'a Element>,
    ) {
        let base = prefix.len();
        let trailing = match s.elements.split_last() {
            Some((Element::Choice(c), rest)) => {
                prefix.extend(rest);
                Some(c)
            }
            _ => {
                prefix.extend(&s.elements);
                None
            }
        };

        match trailing {
            Some(c) => self.choice(c, prefix),
            None if !Analyzer::elements_set_value(prefix, false) => {
                let err = match prefix.last() {
                    None => Error::malformed_structure(
                        "empty alternative without semantic value",
                    )
                    .with_pos(s),
                    Some(last) if last.pos() != GPosIdx::UNKNOWN => {
                        Error::malformed_structure(
                            "last element in alternative without semantic value",
                        )
                        .with_pos(*last)
                    }
                    Some(_) => Error::malformed_structure(
                        "alternative without semantic value",
                    )
                    .with_pos(s),
                };
                self.diag.err(err);
            }
            None => {}
        }
        prefix.truncate(base);
    }
}

impl Visitor for ValueChecker {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        _analyzer: &mut Analyzer,
    ) -> VisResult {
        let p = prod.borrow();
        if p.ty.is_void() || p.props.text_only || p.props.token {
            return Ok(Action::Continue);
        }
        self.choice(&p.choice, &mut Vec::new());
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::{Type, VALUE};

    fn errors(prods: Vec<ir::Production>) -> Vec<String> {
        let mut ctx = context(prods);
        let pass = run::<ValueChecker>(&mut ctx);
        pass.diagnostics().errors_iter().map(|e| e.message()).collect()
    }

    #[test]
    fn accepts_alternatives_with_values() {
        let errs = errors(vec![
            prod(
                "P",
                Type::Node,
                vec![
                    vec![lit('a'), bind(VALUE, nt("Q"))],
                    vec![lit('b'), Element::NullValue],
                    vec![
                        lit('c'),
                        choice(vec![
                            vec![lit('d'), Element::NullValue],
                            vec![bind(VALUE, nt("Q"))],
                        ]),
                    ],
                ],
            ),
            prod("Q", Type::Node, vec![vec![lit('q'), Element::NullValue]]),
            prod("V", Type::Void, vec![vec![lit('v')]]),
        ]);
        assert!(errs.is_empty(), "{errs:?}");
    }

    #[test]
    fn reports_missing_values() {
        let errs = errors(vec![prod(
            "P",
            Type::Node,
            vec![
                vec![],
                vec![lit('a')],
                vec![
                    Element::NullValue,
                    choice(vec![vec![lit('b')], vec![lit('c'), Element::NullValue]]),
                ],
            ],
        )]);
        assert_eq!(errs.len(), 2, "{errs:?}");
        assert!(errs[0].ends_with("empty alternative without semantic value"));
        assert!(errs[1].ends_with(": alternative without semantic value"));
    }

    #[test]
    fn lexical_productions_are_skipped() {
        let mut ctx = context(vec![prod("S", Type::String, vec![vec![lit('s')]])]);
        get(&ctx, "S").borrow_mut().props.text_only = true;
        let pass = run::<ValueChecker>(&mut ctx);
        assert!(!pass.diagnostics().has_errors());
    }
}
