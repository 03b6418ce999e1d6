//! The grammar expression language.
//!
//! Elements form plain value trees. The only links between trees are
//! nonterminals, which name productions, and binding references inside value
//! elements, which name a [Binding] of the same alternative by its
//! [BindingId].
use crate::{Action, CharClass, Type, chars::escape_char};
use packrat_utils::{GPosIdx, Id, WithPos};
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of a [Binding]. Every binding gets a fresh identity when it is
/// created or copied, so that value elements can refer to it independently
/// of its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(u32);

impl BindingId {
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        BindingId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A reference from a value element to a binding. References compare by
/// the name of the binding they point to.
#[derive(Clone, Copy, Debug, Eq)]
pub struct BindingRef {
    pub id: BindingId,
    pub name: Id,
}

impl PartialEq for BindingRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A reference to a production.
#[derive(Clone, Copy, Debug, Eq)]
pub struct NonTerminal {
    pub name: Id,
    pub pos: GPosIdx,
}

impl NonTerminal {
    pub fn new(name: Id) -> Self {
        NonTerminal {
            name,
            pos: GPosIdx::UNKNOWN,
        }
    }
}

impl PartialEq for NonTerminal {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Ordered conjunction of elements. The name only helps debugging.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    pub name: Option<Id>,
    pub elements: Vec<Element>,
    pub pos: GPosIdx,
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl Sequence {
    pub fn new(elements: Vec<Element>) -> Self {
        Sequence {
            name: None,
            elements,
            pos: GPosIdx::UNKNOWN,
        }
    }

    pub fn with_pos(mut self, pos: GPosIdx) -> Self {
        self.pos = pos;
        self
    }

    /// Wrap an element into a sequence unless it already is one.
    pub fn ensure(element: Element) -> Self {
        match element {
            Element::Sequence(s) => s,
            e => {
                let pos = e.pos();
                Sequence::new(vec![e]).with_pos(pos)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn add(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Copy the elements from `start` to the end. The copy keeps this
    /// sequence's location.
    pub fn sub_sequence(&self, start: usize) -> Sequence {
        self.sub_sequence_to(start, self.elements.len())
    }

    /// Copy the elements in `start..end`.
    pub fn sub_sequence_to(&self, start: usize, end: usize) -> Sequence {
        Sequence::new(self.elements[start..end].to_vec()).with_pos(self.pos)
    }

    /// Whether the last element is an ordered choice.
    pub fn has_trailing_choice(&self) -> bool {
        matches!(self.elements.last(), Some(Element::Choice(_)))
    }
}

/// First-match-wins disjunction of sequences.
#[derive(Clone, Debug, Default)]
pub struct OrderedChoice {
    pub alternatives: Vec<Sequence>,
    pub pos: GPosIdx,
}

impl PartialEq for OrderedChoice {
    fn eq(&self, other: &Self) -> bool {
        self.alternatives == other.alternatives
    }
}

impl OrderedChoice {
    pub fn new(alternatives: Vec<Sequence>) -> Self {
        OrderedChoice {
            alternatives,
            pos: GPosIdx::UNKNOWN,
        }
    }

    pub fn with_pos(mut self, pos: GPosIdx) -> Self {
        self.pos = pos;
        self
    }

    /// A choice with the element as its only alternative.
    pub fn from_element(element: Element) -> Self {
        let pos = element.pos();
        OrderedChoice::new(vec![Sequence::ensure(element)]).with_pos(pos)
    }
}

/// Captures the value of an element under a variable name.
#[derive(Clone, Debug)]
pub struct Binding {
    pub id: BindingId,
    pub name: Id,
    pub element: Box<Element>,
    pub pos: GPosIdx,
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.element == other.element
    }
}

impl Binding {
    pub fn new(name: Id, element: Element) -> Self {
        let pos = element.pos();
        Binding {
            id: BindingId::fresh(),
            name,
            element: Box::new(element),
            pos,
        }
    }

    pub fn to_ref(&self) -> BindingRef {
        BindingRef {
            id: self.id,
            name: self.name,
        }
    }
}

/// Matches an element only if its text equals `text`.
#[derive(Clone, Debug)]
pub struct StringMatch {
    pub text: String,
    pub element: Box<Element>,
    pub pos: GPosIdx,
}

impl PartialEq for StringMatch {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.element == other.element
    }
}

/// One case of a [CharSwitch]. A case without element fails.
#[derive(Clone, Debug, PartialEq)]
pub struct CharCase {
    pub klass: CharClass,
    pub element: Option<Box<Element>>,
}

/// Dispatch on the next character. Created by the terminal optimizer only.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CharSwitch {
    pub cases: Vec<CharCase>,
    pub base: Option<Box<Element>>,
}

impl CharSwitch {
    /// A switch with one case for `klass`. An exclusive class turns into the
    /// default case.
    pub fn from_class(mut klass: CharClass, element: Element) -> Self {
        if klass.exclusive {
            klass.exclusive = false;
            CharSwitch {
                cases: vec![CharCase {
                    klass,
                    element: None,
                }],
                base: Some(Box::new(element)),
            }
        } else {
            CharSwitch {
                cases: vec![CharCase {
                    klass,
                    element: Some(Box::new(element)),
                }],
                base: None,
            }
        }
    }

    /// The index of the case for exactly `klass`.
    pub fn has_case(&self, klass: &CharClass) -> Option<usize> {
        self.cases.iter().position(|kase| kase.klass == *klass)
    }

    /// Whether `klass` overlaps any case.
    pub fn overlaps(&self, klass: &CharClass) -> bool {
        self.cases
            .iter()
            .any(|kase| klass.overlaps(&kase.klass).unwrap_or(true))
    }
}

/// The shared shape of the generic value elements.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericValue {
    pub name: Id,
    pub children: Vec<BindingRef>,
    pub formatting: Vec<BindingRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /* ========== Structure ========== */
    NonTerminal(NonTerminal),
    Choice(OrderedChoice),
    Sequence(Sequence),
    /// `e+` when `once` is set, `e*` otherwise.
    Repetition { once: bool, element: Box<Element> },
    Optional(Box<Element>),
    FollowedBy(Box<Element>),
    NotFollowedBy(Box<Element>),
    SemanticPredicate(Action),
    Binding(Binding),
    StringMatch(StringMatch),
    /// Suppresses the semantic value of the inner element.
    Voided(Box<Element>),

    /* ========== Terminals ========== */
    AnyChar,
    CharLiteral(char),
    CharClass(CharClass),
    CharSwitch(CharSwitch),
    StringLiteral(String),

    /* ========== Actions and markers ========== */
    Action(Action),
    ParserAction(Action),
    NullLiteral,
    NodeMarker(Id),
    ParseTreeNode {
        predecessors: Vec<BindingRef>,
        node: Option<BindingRef>,
        successors: Vec<BindingRef>,
    },

    /* ========== Value elements ========== */
    NullValue,
    EmptyListValue,
    StringValue(Option<String>),
    TokenValue(Option<String>),
    BindingValue(BindingRef),
    ProperListValue {
        ty: Type,
        elements: Vec<BindingRef>,
        tail: Option<BindingRef>,
    },
    ActionBaseValue { list: BindingRef, seed: BindingRef },
    GenericNodeValue(GenericValue),
    GenericActionValue { value: GenericValue, first: Id },
    GenericRecursionValue {
        value: GenericValue,
        first: Id,
        list: BindingRef,
    },
}

impl Element {
    pub fn nonterminal(name: Id) -> Self {
        Element::NonTerminal(NonTerminal::new(name))
    }

    pub fn bind(name: Id, element: Element) -> Self {
        Element::Binding(Binding::new(name, element))
    }

    pub fn sequence(elements: Vec<Element>) -> Self {
        Element::Sequence(Sequence::new(elements))
    }

    pub fn choice(alternatives: Vec<Sequence>) -> Self {
        Element::Choice(OrderedChoice::new(alternatives))
    }

    pub fn star(element: Element) -> Self {
        Element::Repetition {
            once: false,
            element: Box::new(element),
        }
    }

    pub fn plus(element: Element) -> Self {
        Element::Repetition {
            once: true,
            element: Box::new(element),
        }
    }

    pub fn string_match(text: impl Into<String>, element: Element) -> Self {
        let pos = element.pos();
        Element::StringMatch(StringMatch {
            text: text.into(),
            element: Box::new(element),
            pos,
        })
    }

    pub fn pos(&self) -> GPosIdx {
        match self {
            Element::NonTerminal(nt) => nt.pos,
            Element::Choice(c) => c.pos,
            Element::Sequence(s) => s.pos,
            Element::Binding(b) => b.pos,
            Element::StringMatch(m) => m.pos,
            _ => GPosIdx::UNKNOWN,
        }
    }

    /// Turn the element into a choice, wrapping it if necessary.
    pub fn into_choice(self) -> OrderedChoice {
        match self {
            Element::Choice(c) => c,
            e => OrderedChoice::from_element(e),
        }
    }

    /// The operand of a unary operator.
    pub fn unary_child(&self) -> Option<&Element> {
        match self {
            Element::Repetition { element, .. }
            | Element::Optional(element)
            | Element::FollowedBy(element)
            | Element::NotFollowedBy(element)
            | Element::Voided(element) => Some(element),
            Element::Binding(b) => Some(&b.element),
            Element::StringMatch(m) => Some(&m.element),
            _ => None,
        }
    }

    pub fn unary_child_mut(&mut self) -> Option<&mut Element> {
        match self {
            Element::Repetition { element, .. }
            | Element::Optional(element)
            | Element::FollowedBy(element)
            | Element::NotFollowedBy(element)
            | Element::Voided(element) => Some(element),
            Element::Binding(b) => Some(&mut b.element),
            Element::StringMatch(m) => Some(&mut m.element),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Element::AnyChar
                | Element::CharLiteral(_)
                | Element::CharClass(_)
                | Element::CharSwitch(_)
                | Element::StringLiteral(_)
        )
    }

    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            Element::FollowedBy(_)
                | Element::NotFollowedBy(_)
                | Element::SemanticPredicate(_)
        )
    }

    /// Elements whose sole purpose is to determine an alternative's
    /// semantic value.
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Element::NullValue
                | Element::EmptyListValue
                | Element::StringValue(_)
                | Element::TokenValue(_)
                | Element::BindingValue(_)
                | Element::ProperListValue { .. }
                | Element::ActionBaseValue { .. }
                | Element::GenericNodeValue(_)
                | Element::GenericActionValue { .. }
                | Element::GenericRecursionValue { .. }
        )
    }

    /// Visit this element and all nested elements in pre-order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        f(self);
        match self {
            Element::Choice(c) => {
                for alt in &c.alternatives {
                    for e in &alt.elements {
                        e.walk(f);
                    }
                }
            }
            Element::Sequence(s) => {
                for e in &s.elements {
                    e.walk(f);
                }
            }
            Element::CharSwitch(sw) => {
                for kase in &sw.cases {
                    if let Some(e) = &kase.element {
                        e.walk(f);
                    }
                }
                if let Some(base) = &sw.base {
                    base.walk(f);
                }
            }
            e => {
                if let Some(child) = e.unary_child() {
                    child.walk(f);
                }
            }
        }
    }

    /// Visit this element and all nested elements in pre-order, allowing
    /// mutation. Children are visited after their parent was updated.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        match self {
            Element::Choice(c) => {
                for alt in &mut c.alternatives {
                    for e in &mut alt.elements {
                        e.walk_mut(f);
                    }
                }
            }
            Element::Sequence(s) => {
                for e in &mut s.elements {
                    e.walk_mut(f);
                }
            }
            Element::CharSwitch(sw) => {
                for kase in &mut sw.cases {
                    if let Some(e) = &mut kase.element {
                        e.walk_mut(f);
                    }
                }
                if let Some(base) = &mut sw.base {
                    base.walk_mut(f);
                }
            }
            e => {
                if let Some(child) = e.unary_child_mut() {
                    child.walk_mut(f);
                }
            }
        }
    }

    /// The binding references held by a value element or parse tree node.
    pub fn binding_refs_mut(&mut self) -> Vec<&mut BindingRef> {
        match self {
            Element::BindingValue(b) => vec![b],
            Element::ProperListValue { elements, tail, .. } => {
                elements.iter_mut().chain(tail.iter_mut()).collect()
            }
            Element::ActionBaseValue { list, seed } => vec![list, seed],
            Element::GenericNodeValue(value)
            | Element::GenericActionValue { value, .. } => value
                .children
                .iter_mut()
                .chain(value.formatting.iter_mut())
                .collect(),
            Element::GenericRecursionValue { value, list, .. } => value
                .children
                .iter_mut()
                .chain(value.formatting.iter_mut())
                .chain(std::iter::once(list))
                .collect(),
            Element::ParseTreeNode {
                predecessors,
                node,
                successors,
            } => predecessors
                .iter_mut()
                .chain(node.iter_mut())
                .chain(successors.iter_mut())
                .collect(),
            _ => vec![],
        }
    }

    /// Rename the binding with identity `id` and every reference to it.
    pub fn rename_binding(&mut self, id: BindingId, name: Id) {
        self.walk_mut(&mut |e| {
            if let Element::Binding(b) = e {
                if b.id == id {
                    b.name = name;
                }
            }
            for r in e.binding_refs_mut() {
                if r.id == id {
                    r.name = name;
                }
            }
        });
    }
}

impl From<Sequence> for Element {
    fn from(s: Sequence) -> Self {
        Element::Sequence(s)
    }
}

impl From<OrderedChoice> for Element {
    fn from(c: OrderedChoice) -> Self {
        Element::Choice(c)
    }
}

impl From<Binding> for Element {
    fn from(b: Binding) -> Self {
        Element::Binding(b)
    }
}

impl WithPos for Element {
    fn copy_span(&self) -> GPosIdx {
        self.pos()
    }
}

impl WithPos for Sequence {
    fn copy_span(&self) -> GPosIdx {
        self.pos
    }
}

impl WithPos for Binding {
    fn copy_span(&self) -> GPosIdx {
        self.pos
    }
}

/* =================== Canonical text ============== */

fn write_refs(f: &mut fmt::Formatter<'_>, refs: &[BindingRef]) -> fmt::Result {
    f.write_char('[')?;
    for (i, r) in refs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", r.name)?;
    }
    f.write_char(']')
}

fn write_text(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        escape_char(c, f)?;
    }
    f.write_char('"')
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{e}")?;
        }
        f.write_char(')')
    }
}

impl fmt::Display for OrderedChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        for (i, alt) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            for (j, e) in alt.elements.iter().enumerate() {
                if j > 0 {
                    f.write_char(' ')?;
                }
                write!(f, "{e}")?;
            }
        }
        f.write_char(')')
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::NonTerminal(nt) => write!(f, "{}", nt.name),
            Element::Choice(c) => write!(f, "{c}"),
            Element::Sequence(s) => write!(f, "{s}"),
            Element::Repetition { once, element } => {
                write!(f, "{element}{}", if *once { '+' } else { '*' })
            }
            Element::Optional(e) => write!(f, "{e}?"),
            Element::FollowedBy(e) => write!(f, "&{e}"),
            Element::NotFollowedBy(e) => write!(f, "!{e}"),
            Element::SemanticPredicate(a) => write!(f, "&{a}"),
            Element::Binding(b) => write!(f, "{}:{}", b.name, b.element),
            Element::StringMatch(m) => {
                write_text(f, &m.text)?;
                write!(f, ":{}", m.element)
            }
            Element::Voided(e) => write!(f, "void:{e}"),
            Element::AnyChar => f.write_char('_'),
            Element::CharLiteral(c) => {
                f.write_char('\'')?;
                escape_char(*c, f)?;
                f.write_char('\'')
            }
            Element::CharClass(k) => write!(f, "{k}"),
            Element::CharSwitch(sw) => {
                f.write_str("switch (")?;
                for (i, kase) in sw.cases.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" / ")?;
                    }
                    match &kase.element {
                        Some(e) => write!(f, "{}: {e}", kase.klass)?,
                        None => write!(f, "{}: fail", kase.klass)?,
                    }
                }
                if let Some(base) = &sw.base {
                    write!(f, " / default: {base}")?;
                }
                f.write_char(')')
            }
            Element::StringLiteral(s) => write_text(f, s),
            Element::Action(a) => write!(f, "{a}"),
            Element::ParserAction(a) => write!(f, "^{a}"),
            Element::NullLiteral => f.write_str("null"),
            Element::NodeMarker(name) => write!(f, "@{name}"),
            Element::ParseTreeNode {
                predecessors,
                node,
                successors,
            } => {
                f.write_str("ParseTreeNode(")?;
                write_refs(f, predecessors)?;
                match node {
                    Some(n) => write!(f, ", {}, ", n.name)?,
                    None => f.write_str(", null, ")?,
                }
                write_refs(f, successors)?;
                f.write_char(')')
            }
            Element::NullValue => f.write_str("NullValue"),
            Element::EmptyListValue => f.write_str("EmptyListValue"),
            Element::StringValue(None) => f.write_str("StringValue"),
            Element::StringValue(Some(s)) => {
                f.write_str("StringValue(")?;
                write_text(f, s)?;
                f.write_char(')')
            }
            Element::TokenValue(None) => f.write_str("TokenValue"),
            Element::TokenValue(Some(s)) => {
                f.write_str("TokenValue(")?;
                write_text(f, s)?;
                f.write_char(')')
            }
            Element::BindingValue(b) => write!(f, "BindingValue({})", b.name),
            Element::ProperListValue { ty, elements, tail } => {
                write!(f, "ProperListValue<{ty}>(")?;
                write_refs(f, elements)?;
                if let Some(tail) = tail {
                    write!(f, ", {}", tail.name)?;
                }
                f.write_char(')')
            }
            Element::ActionBaseValue { list, seed } => {
                write!(f, "ActionBaseValue({}, {})", list.name, seed.name)
            }
            Element::GenericNodeValue(v) => {
                write!(f, "GenericNodeValue({}, ", v.name)?;
                write_refs(f, &v.children)?;
                f.write_str(", ")?;
                write_refs(f, &v.formatting)?;
                f.write_char(')')
            }
            Element::GenericActionValue { value, first } => {
                write!(f, "GenericActionValue({}, {first}, ", value.name)?;
                write_refs(f, &value.children)?;
                f.write_str(", ")?;
                write_refs(f, &value.formatting)?;
                f.write_char(')')
            }
            Element::GenericRecursionValue { value, first, list } => {
                write!(f, "GenericRecursionValue({}, {first}, ", value.name)?;
                write_refs(f, &value.children)?;
                f.write_str(", ")?;
                write_refs(f, &value.formatting)?;
                write!(f, ", {})", list.name)
            }
        }
    }
}
