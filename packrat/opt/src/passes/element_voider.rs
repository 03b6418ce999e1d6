use crate::traversal::{
    Action, ConstructVisitor, DiagnosticContext, DiagnosticPass, Named,
    Position, Rewriter, VisResult, Visitor, rewrite_production, walk_sequence,
};
use packrat_ir::{self as ir, Analyzer, Element, OrderedChoice, RRC};
use packrat_utils::{Error, GPosIdx, Id, PackratResult};

/// Voids choices, repetitions, and options that do not produce a value.
///
/// Whether an expression has a value is determined bottom-up: references to
/// productions that are not void, terminals, bindings, and value-setting
/// actions have one. Choices that are not the last element of their
/// alternative and all repetitions and options without a value are wrapped
/// in a voided element, unless the production is void anyway. Binding or
/// matching an expression without value is an error.
pub struct ElementVoider {
    verbose: bool,
    current: Id,
    has_value: bool,
    /// Do not wrap expressions without value.
    suppress: bool,
    diag: DiagnosticContext,
}

impl ConstructVisitor for ElementVoider {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ElementVoider {
            verbose: ctx.config.verbose(),
            current: Id::default(),
            has_value: false,
            suppress: false,
            diag: DiagnosticContext::default(),
        })
    }

    fn clear_data(&mut self) {
        self.has_value = false;
        self.suppress = false;
    }
}

impl Named for ElementVoider {
    fn name() -> &'static str {
        "element-voider"
    }

    fn description() -> &'static str {
        "void expressions that do not produce a value"
    }
}

impl DiagnosticPass for ElementVoider {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

/// Position of an operand, which is the last element of its context.
fn operand() -> Position {
    Position {
        last: true,
        ..Default::default()
    }
}

impl ElementVoider {
    fn wrap(&self, e: Element) -> Element {
        trace!(self.verbose, "[Voiding expression {e} in {}]", self.current);
        Element::Voided(Box::new(e))
    }

    /// Rewrite an operand whose value nobody observes.
    fn unobserved(
        &mut self,
        e: Element,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let value = self.has_value;
        let suppress = self.suppress;
        self.has_value = false;
        self.suppress = true;
        let e = self.rewrite_element(e, operand(), analyzer)?;
        self.has_value = value;
        self.suppress = suppress;
        Ok(e)
    }

    /// Rewrite the operand of a binding or string match, reporting `msg` if
    /// it has no value.
    fn captured(
        &mut self,
        e: Element,
        msg: &str,
        pos: GPosIdx,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let suppress = self.suppress;
        self.has_value = false;
        self.suppress = false;
        let e = self.rewrite_element(e, operand(), analyzer)?;
        if matches!(e, Element::Voided(_)) {
            self.diag.err(Error::malformed_structure(msg).with_pos(&pos));
        }
        self.has_value = true;
        self.suppress = suppress;
        Ok(e)
    }

    /// Finish an expression that was visited with a fresh value flag.
    fn settle(&mut self, e: Element, value: bool) -> Element {
        if self.has_value {
            e
        } else {
            self.has_value = value;
            if self.suppress { e } else { self.wrap(e) }
        }
    }
}

impl Rewriter for ElementVoider {
    fn rewrite_choice(
        &mut self,
        c: OrderedChoice,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let nested = !pos.top_level && !pos.last;
        let value = self.has_value;
        if nested {
            self.has_value = false;
        }
        let child = pos.alternative();
        let mut alternatives = Vec::with_capacity(c.alternatives.len());
        for alt in c.alternatives {
            let alt = walk_sequence(self, alt, child, analyzer)?;
            alternatives.push(ir::Sequence::ensure(alt));
        }
        let e = OrderedChoice {
            alternatives,
            pos: c.pos,
        }
        .into();
        Ok(if nested { self.settle(e, value) } else { e })
    }

    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        match e {
            Element::Choice(c) => self.rewrite_choice(c, pos, analyzer),
            Element::Sequence(s) => walk_sequence(self, s, pos, analyzer),
            Element::Repetition { once, element } => {
                let value = self.has_value;
                self.has_value = false;
                let element =
                    Box::new(self.rewrite_element(*element, operand(), analyzer)?);
                Ok(self.settle(Element::Repetition { once, element }, value))
            }
            Element::Optional(element) => {
                let value = self.has_value;
                self.has_value = false;
                let element = self.rewrite_element(*element, operand(), analyzer)?;
                Ok(self.settle(Element::Optional(Box::new(element)), value))
            }
            Element::FollowedBy(element) => Ok(Element::FollowedBy(Box::new(
                self.unobserved(*element, analyzer)?,
            ))),
            Element::NotFollowedBy(element) => Ok(Element::NotFollowedBy(
                Box::new(self.unobserved(*element, analyzer)?),
            )),
            Element::Voided(element) => Ok(Element::Voided(Box::new(
                self.unobserved(*element, analyzer)?,
            ))),
            Element::Binding(mut b) => {
                let element = std::mem::replace(&mut *b.element, Element::NullLiteral);
                *b.element = self.captured(
                    element,
                    "binding for expression without value",
                    b.pos,
                    analyzer,
                )?;
                Ok(Element::Binding(b))
            }
            Element::StringMatch(mut m) => {
                let element = std::mem::replace(&mut *m.element, Element::NullLiteral);
                *m.element = self.captured(
                    element,
                    "match for expression without value",
                    m.pos,
                    analyzer,
                )?;
                Ok(Element::StringMatch(m))
            }
            Element::Action(ref a) => {
                if a.sets_value() {
                    self.has_value = true;
                }
                Ok(e)
            }
            Element::NonTerminal(nt) => {
                let void = analyzer
                    .lookup(nt.name)
                    .is_ok_and(|p| p.try_borrow().is_ok_and(|p| p.ty.is_void()));
                if !void {
                    self.has_value = true;
                }
                Ok(e)
            }
            Element::SemanticPredicate(_) => Ok(e),
            e => {
                self.has_value = true;
                Ok(e)
            }
        }
    }
}

impl Visitor for ElementVoider {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        {
            let p = prod.borrow();
            if p.props.text_only || p.props.token {
                return Ok(Action::Continue);
            }
            self.current = p.qualified_name();
            self.suppress = p.ty.is_void();
        }
        self.has_value = false;
        rewrite_production(self, prod, analyzer)?;
        Ok(Action::Continue)
    }
}
