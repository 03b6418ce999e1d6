use crate::traversal::{
    Action, ConstructVisitor, Named, Position, Rewriter, VisResult, Visitor,
    rewrite_production,
};
use packrat_ir::{
    self as ir, Analyzer, Attribute, Copier, Element, OrderedChoice,
    Production, RRC, Sequence, VALUE,
};
use packrat_utils::{Id, PackratResult};
use std::collections::{HashSet, VecDeque};

/// Expands the alternatives of wrapper productions in place.
///
/// An alternative that consists of nothing but a reference to another
/// production, bound to the value at the top level, or, in void, text-only,
/// and token-level productions, a bare reference possibly followed by a
/// value element, is replaced by a copy of the referenced production's
/// alternatives. The referenced production must not refer to itself and
/// must either be a transient basic production that is neither `noinline`
/// nor `explicit`, or be marked `inline` when choices are optimized. The
/// value elements of the expanded alternatives are adjusted to the context
/// they land in.
pub struct ChoiceExpander {
    optimize_choices2: bool,
    verbose: bool,
    stateful: bool,
    current: Current,
}

/// The production whose choices are expanded.
#[derive(Default)]
struct Current {
    name: Id,
    void: bool,
    text_only: bool,
    token: bool,
}

impl Current {
    fn is_basic(&self) -> bool {
        self.void || self.text_only || self.token
    }
}

/// How the value elements of expanded alternatives are adjusted.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Values {
    /// Drop trailing value elements.
    Remove,
    Null,
    Text,
    Token,
}

impl ConstructVisitor for ChoiceExpander {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ChoiceExpander {
            optimize_choices2: ctx.config.optimize_choices2,
            verbose: ctx.config.verbose(),
            stateful: false,
            current: Current::default(),
        })
    }

    fn clear_data(&mut self) {
        self.stateful = false;
    }
}

impl Named for ChoiceExpander {
    fn name() -> &'static str {
        "choice-expander"
    }

    fn description() -> &'static str {
        "expand the alternatives of wrapper productions in place"
    }
}

/// The nonterminal of a reference followed by a value element.
fn reference_with_value(elements: &[Element]) -> Option<Id> {
    match elements {
        [Element::NonTerminal(nt), v] if v.is_value() => Some(nt.name),
        _ => None,
    }
}

fn retag_sequence(s: &mut Sequence, mode: Values) {
    let trailing = s.elements.last().is_some_and(Element::is_value);
    if mode == Values::Remove && trailing {
        s.elements.pop();
    }
    for e in &mut s.elements {
        retag(e, mode);
    }
}

/// Adjust all value elements in `e`.
fn retag(e: &mut Element, mode: Values) {
    match e {
        Element::Choice(c) => {
            for alt in &mut c.alternatives {
                retag_sequence(alt, mode);
            }
        }
        Element::Sequence(s) => retag_sequence(s, mode),
        Element::CharSwitch(sw) => {
            let cases =
                sw.cases.iter_mut().filter_map(|k| k.element.as_deref_mut());
            for e in cases.chain(sw.base.as_deref_mut()) {
                retag(e, mode);
            }
        }
        e if e.is_value() => {
            *e = match mode {
                Values::Remove => return,
                Values::Null => Element::NullValue,
                Values::Text => Element::StringValue(None),
                Values::Token => Element::TokenValue(None),
            }
        }
        e => {
            if let Some(child) = e.unary_child_mut() {
                retag(child, mode);
            }
        }
    }
}

impl ChoiceExpander {
    /// The production an alternative merely wraps, if any.
    fn candidate(&self, alt: &Sequence, top: bool) -> Option<Id> {
        let basic = self.current.is_basic();
        let [e] = alt.elements.as_slice() else {
            return if basic {
                reference_with_value(&alt.elements)
            } else {
                None
            };
        };
        match Analyzer::strip(e) {
            Element::Binding(b) => match &*b.element {
                Element::NonTerminal(nt) if top && b.name == VALUE => {
                    Some(nt.name)
                }
                _ => None,
            },
            Element::NonTerminal(nt) if basic => Some(nt.name),
            Element::Sequence(s) if basic => reference_with_value(&s.elements),
            Element::Choice(c) if basic => match c.alternatives.as_slice() {
                [s] => reference_with_value(&s.elements),
                _ => None,
            },
            _ => None,
        }
    }

    fn is_expandable(&self, p: &Production) -> bool {
        let self_free = p
            .props
            .meta_data
            .as_ref()
            .is_some_and(|md| md.self_count == 0);
        let inlinable = (!p.is_memoized()
            && !p.has_attribute(Attribute::NoInline)
            && !p.has_attribute(Attribute::Explicit)
            && p.is_basic())
            || (p.has_attribute(Attribute::Inline) && self.optimize_choices2);
        let stateful = self.stateful
            && (p.has_attribute(Attribute::Stateful)
                || p.has_attribute(Attribute::Resetting));
        inlinable && self_free && !stateful
    }

    /// A copy of the alternatives of the production called `name`, if it
    /// is expanded.
    fn expansion(
        &self,
        name: Id,
        analyzer: &Analyzer,
    ) -> PackratResult<Option<(Id, OrderedChoice)>> {
        let Ok(prod) = analyzer.lookup(name) else {
            return Ok(None);
        };
        let p = prod.borrow();
        let qname = p.qualified_name();
        if qname == self.current.name || !self.is_expandable(&p) {
            return Ok(None);
        }
        Ok(Some((qname, Copier::default().copy_choice(&p.choice)?)))
    }

    fn values(&self, top: bool, last: bool) -> Option<Values> {
        if !top && !last {
            Some(Values::Remove)
        } else if self.current.void {
            Some(Values::Null)
        } else if self.current.text_only && !top {
            Some(Values::Text)
        } else if self.current.token {
            Some(Values::Token)
        } else {
            None
        }
    }
}

impl Rewriter for ChoiceExpander {
    fn rewrite_choice(
        &mut self,
        c: OrderedChoice,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let child = pos.alternative();
        let mut pending: VecDeque<Sequence> = c.alternatives.into();
        let mut alternatives = Vec::with_capacity(pending.len());
        // A production is expanded at most once per choice, so that
        // mutually referring wrappers terminate.
        let mut expanded = HashSet::new();

        while let Some(alt) = pending.pop_front() {
            let expansion = match self.candidate(&alt, pos.top_level) {
                Some(name) => self.expansion(name, analyzer)?,
                None => None,
            };
            match expansion {
                Some((name, mut choice)) if expanded.insert(name) => {
                    if let [only] = choice.alternatives.as_mut_slice() {
                        only.pos = alt.pos;
                    }
                    if let Some(mode) = self.values(pos.top_level, pos.last) {
                        for alt in &mut choice.alternatives {
                            retag_sequence(alt, mode);
                        }
                    }
                    trace!(
                        self.verbose,
                        "[Inlining {name} into {}]",
                        self.current.name
                    );
                    for alt in choice.alternatives.into_iter().rev() {
                        pending.push_front(alt);
                    }
                }
                _ => {
                    let alt = self.rewrite_sequence(alt, child, analyzer)?;
                    alternatives.push(Sequence::ensure(alt));
                }
            }
        }

        Ok(OrderedChoice {
            alternatives,
            pos: c.pos,
        }
        .into())
    }
}

impl Visitor for ChoiceExpander {
    fn start(
        &mut self,
        module: &mut ir::Module,
        _analyzer: &mut Analyzer,
    ) -> VisResult {
        self.stateful = module.is_stateful();
        Ok(Action::Continue)
    }

    fn production(
        &mut self,
        prod: &RRC<Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        {
            let p = prod.borrow();
            if !self.optimize_choices2 && !p.is_basic() {
                return Ok(Action::Continue);
            }
            self.current = Current {
                name: p.qualified_name(),
                void: p.ty.is_void(),
                text_only: p.props.text_only,
                token: p.props.token,
            };
        }
        rewrite_production(self, prod, analyzer)?;
        Ok(Action::Continue)
    }
}
