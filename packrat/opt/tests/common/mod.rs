//! Grammar builders and a reference recognizer shared by the integration
//! tests.
#![allow(dead_code)]

use packrat_ir::{
    Attribute, Binding, BindingId, BindingRef, CharClass, CharRange, Config,
    Context, Element, GenericValue, Grammar, Module, OrderedChoice,
    Production, Sequence, Type, VALUE,
};
use packrat_utils::Id;
use proptest::prelude::*;
use std::collections::HashMap;

pub fn nt(name: &str) -> Element {
    Element::nonterminal(Id::new(name))
}

pub fn lit(c: char) -> Element {
    Element::CharLiteral(c)
}

pub fn text(s: &str) -> Element {
    Element::StringLiteral(s.to_string())
}

pub fn class(first: char, last: char) -> Element {
    Element::CharClass(CharClass::new(false, vec![CharRange::new(first, last)]))
}

pub fn choice(alts: Vec<Vec<Element>>) -> Element {
    Element::choice(alts.into_iter().map(Sequence::new).collect())
}

pub fn prod(name: &str, alts: Vec<Vec<Element>>) -> Production {
    Production::new(
        Id::new(name),
        Type::Void,
        OrderedChoice::new(alts.into_iter().map(Sequence::new).collect()),
    )
}

pub fn context(prods: Vec<Production>) -> Context {
    let module = Module::new(Id::new("Test"), prods);
    if let Some(first) = module.productions.first() {
        first.borrow_mut().attributes.insert(Attribute::Public);
    }
    Context::new(Grammar::new(vec![module]), Config::default())
}

pub fn module(ctx: &Context) -> &Module {
    &ctx.grammar.modules[0]
}

/// Productions by name together with their alternatives as text.
pub fn snapshot(ctx: &Context) -> Vec<(String, Vec<String>)> {
    module(ctx)
        .productions
        .iter()
        .map(|p| {
            let p = p.borrow();
            let alts = p.choice.alternatives.iter().map(|a| a.to_string());
            (p.name.to_string(), alts.collect())
        })
        .collect()
}

/* ============ Reference interpreter ============ */

/// Semantic values computed by the [Interpreter].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    List(Vec<Value>),
    Node(Id, Vec<Value>),
}

/// The state of one attempt at an alternative of a production.
struct Frame {
    start: usize,
    bindings: HashMap<BindingId, Value>,
    value: Option<Value>,
}

/// A direct interpreter of parsing expressions without memoization. It
/// answers where a production stops matching on an input, if it matches,
/// and which semantic value it produces. Void productions produce
/// [Value::Null], all others the last value set by a value element or a
/// binding of the value variable. Semantic predicates succeed.
pub struct Interpreter<'a> {
    module: &'a Module,
    input: Vec<char>,
}

impl<'a> Interpreter<'a> {
    pub fn new(module: &'a Module, input: &str) -> Self {
        Interpreter {
            module,
            input: input.chars().collect(),
        }
    }

    /// The end of the match of production `name` at the start of input.
    pub fn parse(&self, name: &str) -> Option<usize> {
        self.evaluate(name).map(|(end, _)| end)
    }

    /// The end of the match of production `name` and its value.
    pub fn evaluate(&self, name: &str) -> Option<(usize, Value)> {
        self.nonterminal(Id::new(name), 0)
    }

    fn nonterminal(&self, name: Id, pos: usize) -> Option<(usize, Value)> {
        let prod = self.module.find(name)?;
        let (choice, void) = {
            let p = prod.borrow();
            (p.choice.clone(), p.ty.is_void())
        };
        choice.alternatives.iter().find_map(|alt| {
            let mut frame = Frame {
                start: pos,
                bindings: HashMap::new(),
                value: None,
            };
            let end = self.sequence(alt, pos, &mut frame)?;
            let value = match frame.value {
                Some(v) if !void => v,
                _ => Value::Null,
            };
            Some((end, value))
        })
    }

    fn choice(
        &self,
        c: &OrderedChoice,
        pos: usize,
        frame: &mut Frame,
    ) -> Option<usize> {
        c.alternatives
            .iter()
            .find_map(|alt| self.sequence(alt, pos, frame))
    }

    fn sequence(&self, s: &Sequence, pos: usize, frame: &mut Frame) -> Option<usize> {
        s.elements.iter().try_fold(pos, |pos, e| {
            self.element(e, pos, frame).map(|(end, _)| end)
        })
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.input.get(pos).copied()
    }

    fn text(&self, start: usize, end: usize) -> Value {
        Value::Text(self.input[start..end].iter().collect())
    }

    fn value(&self, e: &Element, pos: usize, frame: &Frame) -> Value {
        let bound = |r: &BindingRef| {
            frame.bindings.get(&r.id).cloned().unwrap_or(Value::Null)
        };
        match e {
            Element::EmptyListValue => Value::List(Vec::new()),
            Element::StringValue(Some(s)) | Element::TokenValue(Some(s)) => {
                Value::Text(s.clone())
            }
            Element::StringValue(None) | Element::TokenValue(None) => {
                self.text(frame.start, pos)
            }
            Element::BindingValue(r) => bound(r),
            Element::ProperListValue { elements, tail, .. } => {
                let mut items: Vec<Value> = elements.iter().map(bound).collect();
                if let Some(Value::List(rest)) = tail.as_ref().map(bound) {
                    items.extend(rest);
                }
                Value::List(items)
            }
            Element::GenericNodeValue(v) => {
                Value::Node(v.name, v.children.iter().map(bound).collect())
            }
            _ => Value::Null,
        }
    }

    fn element(
        &self,
        e: &Element,
        pos: usize,
        frame: &mut Frame,
    ) -> Option<(usize, Value)> {
        let end = match e {
            Element::NonTerminal(nt) => return self.nonterminal(nt.name, pos),
            Element::Choice(c) => self.choice(c, pos, frame)?,
            Element::Sequence(s) => self.sequence(s, pos, frame)?,
            Element::Repetition { once, element } => {
                let mut end = pos;
                let mut count = 0;
                while let Some((next, _)) = self.element(element, end, frame) {
                    count += 1;
                    if next == end {
                        break;
                    }
                    end = next;
                }
                if *once && count == 0 {
                    return None;
                }
                end
            }
            Element::Optional(element) => self
                .element(element, pos, frame)
                .map_or(pos, |(end, _)| end),
            Element::FollowedBy(element) => {
                self.element(element, pos, frame)?;
                pos
            }
            Element::NotFollowedBy(element) => {
                if self.element(element, pos, frame).is_some() {
                    return None;
                }
                pos
            }
            Element::Binding(b) => {
                let (end, v) = self.element(&b.element, pos, frame)?;
                if b.name.as_str() == VALUE {
                    frame.value = Some(v.clone());
                }
                frame.bindings.insert(b.id, v.clone());
                return Some((end, v));
            }
            Element::Voided(element) => self.element(element, pos, frame)?.0,
            Element::StringMatch(m) => {
                let (end, _) = self.element(&m.element, pos, frame)?;
                let matched: String = self.input[pos..end].iter().collect();
                if matched != m.text {
                    return None;
                }
                return Some((end, Value::Text(matched)));
            }
            Element::AnyChar => {
                self.char_at(pos)?;
                return Some((pos + 1, self.text(pos, pos + 1)));
            }
            Element::CharLiteral(c) => {
                if self.char_at(pos)? != *c {
                    return None;
                }
                return Some((pos + 1, self.text(pos, pos + 1)));
            }
            Element::CharClass(k) => {
                if !k.matches(self.char_at(pos)?) {
                    return None;
                }
                return Some((pos + 1, self.text(pos, pos + 1)));
            }
            Element::StringLiteral(s) => {
                let end = pos + s.chars().count();
                let matched: String = self.input.get(pos..end)?.iter().collect();
                if matched != *s {
                    return None;
                }
                return Some((end, Value::Text(matched)));
            }
            Element::CharSwitch(sw) => {
                let c = self.char_at(pos)?;
                match sw.cases.iter().find(|k| k.klass.matches(c)) {
                    Some(case) => match &case.element {
                        Some(e) => self.element(e, pos + 1, frame)?.0,
                        None => pos + 1,
                    },
                    None => self.element(sw.base.as_deref()?, pos, frame)?.0,
                }
            }
            e if e.is_value() => {
                let v = self.value(e, pos, frame);
                frame.value = Some(v.clone());
                return Some((pos, v));
            }
            _ => pos,
        };
        Some((end, Value::Null))
    }
}

/* ============ Generators ============ */

/// Number of productions in a generated grammar.
pub const PRODUCTIONS: usize = 4;

fn leaf() -> impl Strategy<Value = Element> {
    prop_oneof![
        Just(lit('a')),
        Just(lit('b')),
        Just(text("ab")),
        Just(text("ba")),
        Just(class('a', 'b')),
        Just(Element::AnyChar),
        (0..PRODUCTIONS).prop_map(|k| nt(&format!("R{k}"))),
    ]
}

/// Parsing expressions over `a` and `b`. References are relative and are
/// resolved by [grammar].
pub fn expression() -> impl Strategy<Value = Element> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Element::star),
            inner.clone().prop_map(Element::plus),
            inner.clone().prop_map(|e| Element::Optional(Box::new(e))),
            inner.clone().prop_map(|e| Element::FollowedBy(Box::new(e))),
            inner.clone().prop_map(|e| Element::NotFollowedBy(Box::new(e))),
            prop::collection::vec(
                prop::collection::vec(inner.clone(), 1..3),
                1..3
            )
            .prop_map(choice),
            prop::collection::vec(inner, 1..3).prop_map(Element::sequence),
        ]
    })
}

/// Point the relative references of production `idx` to later productions,
/// so that the grammar has no cycles.
fn resolve(e: &mut Element, idx: usize) {
    e.walk_mut(&mut |e| {
        if let Element::NonTerminal(r) = e {
            let Some(k) = r.name.as_str().strip_prefix('R') else {
                return;
            };
            let later = PRODUCTIONS - idx - 1;
            *e = match (k.parse::<usize>(), later) {
                (_, 0) | (Err(_), _) => lit('a'),
                (Ok(k), _) => nt(&format!("P{}", idx + 1 + k % later)),
            };
        }
    });
}

fn resolved(mut e: Element, idx: usize) -> Element {
    resolve(&mut e, idx);
    e
}

/// Plain elements, elements to bind, and the kind of value of one
/// alternative, before its references are resolved.
type Shape = (Vec<Element>, Vec<Element>, u8);

fn shape() -> impl Strategy<Value = Shape> {
    (
        prop::collection::vec(expression(), 0..3),
        prop::collection::vec(leaf(), 0..3),
        0u8..5,
    )
}

/// Build alternative `shape` of production `idx`. `nodes` tells which
/// productions produce values; only their references and terminals are
/// bound. Node alternatives end in a value element, except for wrappers
/// that bind another node production to the value variable.
fn valued_alternative(idx: usize, node: bool, nodes: &[bool], shape: Shape) -> Sequence {
    let (plain, bound, kind) = shape;
    let bound: Vec<Element> = bound.into_iter().map(|e| resolved(e, idx)).collect();
    let is_node = |e: &Element| match e {
        Element::NonTerminal(r) => r
            .name
            .as_str()
            .strip_prefix('P')
            .and_then(|k| k.parse::<usize>().ok())
            .is_some_and(|k| nodes[k]),
        _ => true,
    };

    if kind == 4 {
        if let Some(target @ Element::NonTerminal(_)) = bound.first() {
            if !node {
                return Sequence::new(vec![target.clone()]);
            }
            if is_node(target) {
                let wrapper = Element::bind(Id::new(VALUE), target.clone());
                return Sequence::new(vec![wrapper]);
            }
        }
    }

    let mut elements: Vec<Element> =
        plain.into_iter().map(|e| resolved(e, idx)).collect();
    let mut refs = Vec::new();
    for (i, e) in bound.into_iter().enumerate() {
        if is_node(&e) {
            let b = Binding::new(Id::new(format!("x{i}")), e);
            refs.push(b.to_ref());
            elements.push(b.into());
        } else {
            elements.push(e);
        }
    }
    if node {
        elements.push(match kind {
            1 => refs
                .first()
                .map_or(Element::NullValue, |r| Element::BindingValue(*r)),
            2 => Element::ProperListValue {
                ty: Type::list(Type::Any),
                elements: refs,
                tail: None,
            },
            3 => Element::GenericNodeValue(GenericValue {
                name: Id::new(format!("P{idx}")),
                children: refs,
                formatting: Vec::new(),
            }),
            _ => Element::NullValue,
        });
    } else if kind == 0 {
        elements.push(Element::NullValue);
    }
    Sequence::new(elements)
}

/// Acyclic grammars `P0` to `P3` mixing void and node productions. Node
/// productions compute lists, generic nodes, or bound values from their
/// bindings. Some productions are transient or inline.
pub fn valued_grammar() -> impl Strategy<Value = Vec<Production>> {
    let production = (
        any::<bool>(),
        0u8..3,
        prop::collection::vec(shape(), 1..4),
    );
    prop::collection::vec(production, PRODUCTIONS).prop_map(|prods| {
        let nodes: Vec<bool> = prods.iter().map(|(node, ..)| *node).collect();
        prods
            .into_iter()
            .enumerate()
            .map(|(idx, (node, attribute, shapes))| {
                let alts = shapes
                    .into_iter()
                    .map(|s| valued_alternative(idx, node, &nodes, s))
                    .collect();
                let ty = if node { Type::Node } else { Type::Void };
                let p = Production::new(
                    Id::new(format!("P{idx}")),
                    ty,
                    OrderedChoice::new(alts),
                );
                match attribute {
                    1 => p.with_attributes([Attribute::Transient]),
                    2 => p.with_attributes([Attribute::Inline]),
                    _ => p,
                }
            })
            .collect()
    })
}

/// Acyclic grammars `P0` to `P3`, where `P0` is public.
pub fn grammar() -> impl Strategy<Value = Vec<Production>> {
    let alternatives = prop::collection::vec(
        prop::collection::vec(expression(), 0..4),
        1..4,
    );
    prop::collection::vec(alternatives, PRODUCTIONS).prop_map(|prods| {
        prods
            .into_iter()
            .enumerate()
            .map(|(idx, mut alts)| {
                for e in alts.iter_mut().flatten() {
                    resolve(e, idx);
                }
                prod(&format!("P{idx}"), alts)
            })
            .collect()
    })
}

/// Short inputs over `a` and `b`.
pub fn inputs() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[ab]{0,6}", 1..8)
}

/// The matches of `P0` on every input.
pub fn language(ctx: &Context, inputs: &[String]) -> Vec<Option<usize>> {
    inputs
        .iter()
        .map(|input| Interpreter::new(module(ctx), input).parse("P0"))
        .collect()
}

/// The matches of `P0` on every input together with their values.
pub fn results(ctx: &Context, inputs: &[String]) -> Vec<Option<(usize, Value)>> {
    inputs
        .iter()
        .map(|input| Interpreter::new(module(ctx), input).evaluate("P0"))
        .collect()
}
