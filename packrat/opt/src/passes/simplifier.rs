use crate::traversal::{
    Action, ConstructVisitor, Named, Position, Rewriter, VisResult, Visitor,
    rewrite_production, walk_element,
};
use packrat_ir::{
    self as ir, Analyzer, CharClass, Element, OrderedChoice, RRC, Sequence,
};
use packrat_utils::PackratResult;

/// Brings the elements of every production into normal form.
///
/// Nested choices and sequences are flattened into their parents, and
/// choices and sequences with a single member are replaced by it unless
/// the context requires a sequence. Nested repetitions and options are
/// merged, `!c _` becomes an exclusive character class, and character
/// classes for a single character become literals. The operand of a
/// binding, string match, or voided element is never a sequence.
pub struct Simplifier {
    optimize_repeated: bool,
    optimize_optional: bool,
    /// The production being simplified is memoized.
    memoized: bool,
}

impl ConstructVisitor for Simplifier {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(Simplifier {
            optimize_repeated: ctx.config.optimize_repeated,
            optimize_optional: ctx.config.optimize_optional,
            memoized: false,
        })
    }

    fn clear_data(&mut self) {
        self.memoized = false;
    }
}

impl Named for Simplifier {
    fn name() -> &'static str {
        "simplifier"
    }

    fn description() -> &'static str {
        "flatten and normalize the elements of every production"
    }
}

/// The position of an operand that must stay a sequence.
fn sequence_operand() -> Position {
    Position {
        needs_sequence: true,
        ..Default::default()
    }
}

/// [Analyzer::strip] by value.
fn strip_owned(e: Element) -> Element {
    match e {
        Element::Choice(mut c)
            if c.alternatives.len() == 1 && c.alternatives[0].len() == 1 =>
        {
            strip_owned(c.alternatives.remove(0).elements.remove(0))
        }
        Element::Sequence(mut s) if s.len() == 1 => {
            strip_owned(s.elements.remove(0))
        }
        e => e,
    }
}

/// Strip the element only if the stripped element passes `test`.
fn strip_if(e: Element, test: impl Fn(&Element) -> bool) -> Element {
    if test(Analyzer::strip(&e)) {
        strip_owned(e)
    } else {
        e
    }
}

/// Strip the element, wrapping a remaining sequence into a choice.
fn operand(e: Element) -> Box<Element> {
    Box::new(match strip_owned(e) {
        Element::Sequence(s) => {
            let pos = s.pos;
            OrderedChoice::new(vec![s]).with_pos(pos).into()
        }
        e => e,
    })
}

/// `!c _` for a character literal or inclusive class `c`.
fn exclusive_class(predicate: &Element, next: &Element) -> Option<CharClass> {
    let (Element::NotFollowedBy(inner), Element::AnyChar) = (predicate, next)
    else {
        return None;
    };
    match Analyzer::strip(inner) {
        Element::CharClass(k) if !k.exclusive => {
            let mut k = k.clone();
            k.exclusive = true;
            Some(k)
        }
        Element::CharLiteral(c) => {
            let mut k = CharClass::single(*c);
            k.exclusive = true;
            Some(k)
        }
        _ => None,
    }
}

impl Rewriter for Simplifier {
    fn rewrite_choice(
        &mut self,
        c: OrderedChoice,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let child = pos.alternative();
        let mut alternatives = Vec::with_capacity(c.alternatives.len());
        for alt in c.alternatives {
            let mut alt =
                Sequence::ensure(self.rewrite_sequence(alt, child, analyzer)?);
            if let [Element::Choice(_)] = alt.elements.as_slice() {
                if let Some(Element::Choice(nested)) = alt.elements.pop() {
                    alternatives.extend(nested.alternatives);
                }
            } else {
                alternatives.push(alt);
            }
        }

        if !pos.top_level && alternatives.len() == 1 {
            let alt = alternatives.remove(0);
            return self.rewrite_flat(alt, pos);
        }
        Ok(OrderedChoice {
            alternatives,
            pos: c.pos,
        }
        .into())
    }

    fn rewrite_sequence(
        &mut self,
        s: Sequence,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let len = s.len();
        let mut elements = Vec::with_capacity(len);
        for (i, e) in s.elements.into_iter().enumerate() {
            match self.rewrite_element(e, pos.element(i, len), analyzer)? {
                Element::Sequence(nested) => elements.extend(nested.elements),
                e => elements.push(e),
            }
        }

        let mut i = 0;
        while i + 1 < elements.len() {
            if let Some(k) = exclusive_class(&elements[i], &elements[i + 1]) {
                elements[i] = Element::CharClass(k);
                elements.remove(i + 1);
            }
            i += 1;
        }

        self.rewrite_flat(
            Sequence {
                name: s.name,
                elements,
                pos: s.pos,
            },
            pos,
        )
    }

    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        Ok(match e {
            Element::Repetition { once, element } => {
                let e = self.rewrite_element(*element, sequence_operand(), analyzer)?;
                let e = strip_if(e, |e| {
                    matches!(e, Element::Repetition { .. } | Element::Optional(_))
                });
                match e {
                    Element::Repetition {
                        once: inner,
                        element,
                    } => Element::Repetition {
                        once: once && inner,
                        element,
                    },
                    Element::Optional(element) => Element::Repetition {
                        once: false,
                        element,
                    },
                    e => Element::Repetition {
                        once,
                        element: Box::new(e),
                    },
                }
            }
            Element::Optional(element) => {
                let e = self.rewrite_element(*element, sequence_operand(), analyzer)?;
                let e = strip_if(e, |e| {
                    matches!(e, Element::Repetition { .. } | Element::Optional(_))
                });
                match e {
                    e @ Element::Optional(_) => e,
                    Element::Repetition { element, .. } => Element::Repetition {
                        once: false,
                        element,
                    },
                    e => Element::Optional(Box::new(e)),
                }
            }
            Element::Voided(element) => {
                let e = self.rewrite_element(*element, Position::default(), analyzer)?;
                let e = operand(e);
                match *e {
                    Element::NonTerminal(nt)
                        if analyzer.lookup(nt.name).is_ok_and(|p| {
                            p.try_borrow().is_ok_and(|p| p.ty.is_void())
                        }) =>
                    {
                        Element::NonTerminal(nt)
                    }
                    e @ Element::Voided(_) => e,
                    e => Element::Voided(Box::new(e)),
                }
            }
            Element::Binding(mut b) => {
                let e = self.rewrite_element(*b.element, Position::default(), analyzer)?;
                b.element = operand(e);
                Element::Binding(b)
            }
            Element::StringMatch(mut m) => {
                let e = self.rewrite_element(*m.element, Position::default(), analyzer)?;
                let e = operand(e);
                let wrap = match *e {
                    Element::Repetition { .. } => {
                        !self.memoized && self.optimize_repeated
                    }
                    Element::Optional(_) => self.optimize_optional,
                    _ => false,
                };
                m.element = if wrap {
                    Box::new(OrderedChoice::from_element(*e).into())
                } else {
                    e
                };
                Element::StringMatch(m)
            }
            Element::CharClass(mut k) => {
                k.normalize();
                let single = match k.ranges.as_slice() {
                    [r] if !k.exclusive && r.first == r.last => Some(r.first),
                    _ => None,
                };
                match single {
                    Some(c) => Element::CharLiteral(c),
                    None => Element::CharClass(k),
                }
            }
            e => walk_element(self, e, pos, analyzer)?,
        })
    }
}

impl Simplifier {
    /// Replace a single-element sequence by its element unless the position
    /// requires a sequence.
    fn rewrite_flat(
        &mut self,
        mut s: Sequence,
        pos: Position,
    ) -> PackratResult<Element> {
        if s.len() == 1 && !pos.needs_sequence {
            Ok(s.elements.remove(0))
        } else {
            Ok(s.into())
        }
    }
}

impl Visitor for Simplifier {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        self.memoized = prod.borrow().is_memoized();
        rewrite_production(self, prod, analyzer)?;
        Ok(Action::Continue)
    }
}
