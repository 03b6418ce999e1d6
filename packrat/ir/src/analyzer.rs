//! Bookkeeping and structural queries shared by the passes.
//!
//! An [Analyzer] is created for one module at the start of a pass. It indexes
//! the module's productions by name, tracks which productions a depth-first
//! traversal is working on, and carries the marks and processed sets a pass
//! needs for its fixed points.
use crate::{
    Attribute, Binding, BindingRef, CharClass, CharSwitch, Copier,
    Element, Module, OrderedChoice, Production, RRC, Sequence, Type, VALUE,
};
use itertools::Itertools;
use packrat_utils::{Error, Id, PackratResult};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Separator between a production name and the suffix of a synthesized
/// production.
pub const SEPARATOR: &str = "$$";
/// Prefix of productions shared between several others.
pub const SHARED: &str = "$$Shared";
/// Prefix of synthesized variables.
pub const VARIABLE: &str = "v$";
pub const SPLIT: &str = "$$Split";
pub const CHOICE: &str = "$$Choice";
pub const STAR: &str = "$$Star";
pub const PLUS: &str = "$$Plus";
pub const OPTION: &str = "$$Option";
pub const TAIL: &str = "$$Tail";

/// Character classes with more characters are never turned into a
/// character switch.
pub const MAX_COUNT: u32 = 22;

#[derive(Default)]
struct Memo {
    restricts: HashMap<Id, bool>,
    consumes: HashMap<Id, bool>,
    empty: HashMap<Id, bool>,
    working: HashSet<Id>,
}

#[derive(Default)]
struct Counters {
    var: u32,
    split: u32,
    choice: u32,
    star: u32,
    plus: u32,
    option: u32,
    tail: u32,
}

impl Counters {
    fn reset(&mut self) {
        *self = Counters {
            var: 1,
            split: 1,
            choice: 1,
            star: 1,
            plus: 1,
            option: 1,
            tail: 1,
        };
    }
}

pub struct Analyzer {
    with_parse_tree: bool,
    productions: Vec<RRC<Production>>,
    index: HashMap<Id, Vec<RRC<Production>>>,
    current: Option<Id>,
    working: HashSet<Id>,
    marked: HashSet<Id>,
    processed: HashSet<Id>,
    added: Vec<RRC<Production>>,
    counters: Counters,
    shared_count: u32,
    memo: Memo,
}

impl Analyzer {
    pub fn new(module: &Module) -> Self {
        let mut analyzer = Analyzer {
            with_parse_tree: false,
            productions: Vec::new(),
            index: HashMap::new(),
            current: None,
            working: HashSet::new(),
            marked: HashSet::new(),
            processed: HashSet::new(),
            added: Vec::new(),
            counters: Counters::default(),
            shared_count: 1,
            memo: Memo::default(),
        };
        analyzer.init(module);
        analyzer
    }

    /// Re-index the module, dropping all per-pass state.
    pub fn init(&mut self, module: &Module) {
        self.with_parse_tree = module.has_attribute(Attribute::WithParseTree);
        self.productions.clear();
        self.index.clear();
        for prod in &module.productions {
            self.insert(Rc::clone(prod));
        }
        self.current = None;
        self.working.clear();
        self.marked.clear();
        self.processed.clear();
        self.added.clear();
        self.counters.reset();
        self.memo = Memo::default();
    }

    fn insert(&mut self, prod: RRC<Production>) {
        let (name, qname) = {
            let p = prod.borrow();
            (p.name, p.qualified_name())
        };
        for key in [name, qname] {
            let entry = self.index.entry(key).or_default();
            if !entry.iter().any(|p| Rc::ptr_eq(p, &prod)) {
                entry.push(Rc::clone(&prod));
            }
        }
        self.productions.push(prod);
    }

    /// Start processing a production: resets the per-production name
    /// counters and the working set.
    pub fn process(&mut self, prod: &Production) {
        self.current = Some(prod.name);
        self.working.clear();
        self.counters.reset();
    }

    /// The name of the production being processed.
    pub fn current(&self) -> Option<Id> {
        self.current
    }

    /// All productions known to this analyzer, in module order, followed by
    /// the ones added since.
    pub fn productions(&self) -> &[RRC<Production>] {
        &self.productions
    }

    /* ============ Lookup ============ */

    /// The single production called `name`.
    pub fn lookup(&self, name: Id) -> PackratResult<RRC<Production>> {
        match self.index.get(&name).map(Vec::as_slice) {
            Some([prod]) => Ok(Rc::clone(prod)),
            Some(prods) if prods.len() > 1 => Err(Error::ambiguous(
                name,
                prods
                    .iter()
                    .map(|p| match p.try_borrow() {
                        Ok(p) => p.qualified_name().to_string(),
                        Err(_) => "<in use>".to_string(),
                    })
                    .join(", "),
            )),
            _ => Err(Error::undefined(name, "nonterminal")),
        }
    }

    /* ============ Working on ============ */

    pub fn working_on(&mut self, name: Id) {
        self.working.insert(name);
    }

    pub fn not_working_on(&mut self, name: Id) {
        self.working.remove(&name);
    }

    pub fn is_being_worked_on(&self, name: Id) -> bool {
        self.working.contains(&name)
    }

    /* ============ Marks ============ */

    pub fn mark(&mut self, name: Id) {
        self.marked.insert(name);
    }

    pub fn unmark(&mut self, name: Id) {
        self.marked.remove(&name);
    }

    pub fn is_marked(&self, name: Id) -> bool {
        self.marked.contains(&name)
    }

    pub fn marked(&self) -> impl Iterator<Item = &Id> {
        self.marked.iter()
    }

    /* ============ Processed ============ */

    pub fn processed(&mut self, name: Id) {
        self.processed.insert(name);
    }

    pub fn is_processed(&self, name: Id) -> bool {
        self.processed.contains(&name)
    }

    /* ============ Adding and removing ============ */

    /// Start collecting new productions.
    pub fn start_adding(&mut self) {
        self.added.clear();
    }

    /// Make a new production known. It is inserted into the module by
    /// [Analyzer::add_new_productions_at].
    pub fn add(&mut self, prod: Production) -> RRC<Production> {
        let prod = crate::rrc(prod);
        self.insert(Rc::clone(&prod));
        self.added.push(Rc::clone(&prod));
        prod
    }

    /// Insert the productions added since [Analyzer::start_adding] into the
    /// module at `idx`. Returns how many were inserted.
    pub fn add_new_productions_at(
        &mut self,
        module: &mut Module,
        idx: usize,
    ) -> usize {
        let added = std::mem::take(&mut self.added);
        let count = added.len();
        let idx = idx.min(module.productions.len());
        module.productions.splice(idx..idx, added);
        count
    }

    /// Remove the production called `name` from the module and the index.
    pub fn remove(&mut self, module: &mut Module, name: Id) {
        let is_target = |p: &RRC<Production>| {
            p.try_borrow().is_ok_and(|p| p.qualified_name() == name)
        };
        module.productions.retain(|p| !is_target(p));
        self.productions.retain(|p| !is_target(p));
        self.index.retain(|_, prods| {
            prods.retain(|p| !is_target(p));
            !prods.is_empty()
        });
        self.marked.remove(&name);
    }

    /* ============ Names ============ */

    /// A fresh variable name.
    pub fn variable(&mut self) -> Id {
        let n = self.counters.var;
        self.counters.var += 1;
        Id::new(format!("{VARIABLE}{n}"))
    }

    /// A fresh variable name carrying `marker`.
    pub fn variable_with(&mut self, marker: &str) -> Id {
        let n = self.counters.var;
        self.counters.var += 1;
        Id::new(format!("{VARIABLE}{marker}${n}"))
    }

    fn derived(&self, suffix: &str, n: u32) -> Id {
        let base = self.current.unwrap_or_default();
        Id::new(format!("{base}{suffix}{n}"))
    }

    pub fn split(&mut self) -> Id {
        self.counters.split += 1;
        self.derived(SPLIT, self.counters.split - 1)
    }

    pub fn choice(&mut self) -> Id {
        self.counters.choice += 1;
        self.derived(CHOICE, self.counters.choice - 1)
    }

    pub fn star(&mut self) -> Id {
        self.counters.star += 1;
        self.derived(STAR, self.counters.star - 1)
    }

    pub fn plus(&mut self) -> Id {
        self.counters.plus += 1;
        self.derived(PLUS, self.counters.plus - 1)
    }

    pub fn option(&mut self) -> Id {
        self.counters.option += 1;
        self.derived(OPTION, self.counters.option - 1)
    }

    pub fn tail(&mut self) -> Id {
        self.counters.tail += 1;
        self.derived(TAIL, self.counters.tail - 1)
    }

    /// A fresh name for a production shared by several others. Names that
    /// are already defined are skipped.
    pub fn shared(&mut self) -> Id {
        loop {
            let name = Id::new(format!("{SHARED}{}", self.shared_count));
            self.shared_count += 1;
            if !self.index.contains_key(&name) {
                return name;
            }
        }
    }

    /// Whether the nonterminal was introduced by a pass.
    pub fn is_synthetic_nonterminal(name: Id) -> bool {
        name.as_str().contains(SEPARATOR)
    }

    /// Whether the variable was introduced by a pass.
    pub fn is_synthetic_variable(name: Id) -> bool {
        name.as_str().starts_with(VARIABLE)
    }

    /* ============ Stripping ============ */

    /// Unwrap single-alternative choices and single-element sequences. A
    /// single alternative with several elements stays wrapped in its choice.
    pub fn strip(e: &Element) -> &Element {
        let mut e = e;
        loop {
            e = match e {
                Element::Choice(c) => match c.alternatives.as_slice() {
                    [alt] if alt.len() == 1 => &alt.elements[0],
                    _ => return e,
                },
                Element::Sequence(s) if s.len() == 1 => &s.elements[0],
                _ => return e,
            };
        }
    }

    /// Strip choices whose only alternative is nothing but another choice.
    pub fn strip_choices(mut c: OrderedChoice) -> OrderedChoice {
        loop {
            let inner = match c.alternatives.as_mut_slice() {
                [alt] if alt.len() == 1 => match alt.elements.pop() {
                    Some(Element::Choice(inner)) => inner,
                    Some(e) => {
                        alt.elements.push(e);
                        return c;
                    }
                    None => return c,
                },
                _ => return c,
            };
            c = inner;
        }
    }

    pub fn unbind(e: &Element) -> &Element {
        match e {
            Element::Binding(b) => &b.element,
            e => e,
        }
    }

    pub fn strip_and_unbind(e: &Element) -> &Element {
        Self::strip(Self::unbind(Self::strip(e)))
    }

    /* ============ Copying ============ */

    /// A deep copy with fresh bindings.
    pub fn copy(&self, e: &Element) -> PackratResult<Element> {
        Copier::default().copy(e)
    }

    /* ============ Terminals ============ */

    /// Whether the sequence starts with a literal or a small class.
    pub fn has_terminal_prefix(s: &Sequence) -> bool {
        match s.elements.first() {
            Some(Element::CharLiteral(_) | Element::StringLiteral(_)) => true,
            Some(Element::CharClass(k)) => k.count() <= MAX_COUNT,
            _ => false,
        }
    }

    /// Whether the leading terminals contain a literal that still needs
    /// normalizing.
    fn needs_normalizing(s: &Sequence) -> bool {
        for e in &s.elements {
            match e {
                Element::CharLiteral(_) | Element::StringLiteral(_) => {
                    return true;
                }
                Element::CharClass(_) => {}
                _ => return false,
            }
        }
        false
    }

    /// Turn the leading character and string literals into one
    /// single-character class per character.
    pub fn normalize_terminals(s: Sequence) -> Sequence {
        if !Self::needs_normalizing(&s) {
            return s;
        }
        let pos = s.pos;
        let mut elements = Vec::with_capacity(s.len());
        let mut rest = s.elements.into_iter();
        for e in rest.by_ref() {
            match e {
                Element::CharLiteral(c) => {
                    elements.push(Element::CharClass(CharClass::single(c)))
                }
                Element::StringLiteral(text) => elements.extend(
                    text.chars()
                        .map(|c| Element::CharClass(CharClass::single(c))),
                ),
                e @ Element::CharClass(_) => elements.push(e),
                e => {
                    elements.push(e);
                    break;
                }
            }
        }
        elements.extend(rest);
        Sequence::new(elements).with_pos(pos)
    }

    /// Peel a sequence holding nothing but a choice.
    fn prepare_target(target: Element) -> Element {
        match target {
            Element::Sequence(mut s)
                if s.len() == 1 && matches!(s.elements[0], Element::Choice(_)) =>
            {
                s.elements.remove(0)
            }
            t => t,
        }
    }

    /// Join the source alternative into the last alternative of the choice
    /// and splice the result back in.
    fn join_into_last(
        source: Sequence,
        mut c: OrderedChoice,
        join: fn(Sequence, Option<Element>) -> Element,
    ) -> Element {
        match c.alternatives.pop() {
            Some(last) => match join(source, Some(Element::Sequence(last))) {
                Element::Choice(joined) => {
                    c.alternatives.extend(joined.alternatives);
                }
                e => c.alternatives.push(Sequence::ensure(e)),
            },
            None => c.alternatives.push(source),
        }
        Element::Choice(c)
    }

    /// The choice `target / source`.
    fn fallback(source: Sequence, target: Sequence) -> Element {
        let pos = target.pos;
        OrderedChoice::new(vec![target, source]).with_pos(pos).into()
    }

    /// `first` followed by the elements of `rest`.
    fn prepend(first: Element, rest: Element, pos: packrat_utils::GPosIdx) -> Element {
        let mut s = Sequence::ensure(rest);
        s.elements.insert(0, first);
        s.pos = pos;
        s.into()
    }

    /// Join a normalized alternative into the target, sharing leading
    /// character classes and building character switches where possible.
    pub fn join_terminals(source: Sequence, target: Option<Element>) -> Element {
        let target = match target {
            None => return source.into(),
            Some(t) => Self::prepare_target(t),
        };

        match target {
            Element::Sequence(mut t) => {
                let s1 = match source.elements.first() {
                    Some(Element::CharClass(k)) => Some(k.clone()),
                    _ => None,
                };
                let Some(sk) = s1 else {
                    return Self::fallback(source, t);
                };

                if let Some(Element::CharClass(tk)) = t.elements.first() {
                    if *tk == sk {
                        let pos = source.pos;
                        let joined = Self::join_terminals(
                            source.sub_sequence(1),
                            Some(t.sub_sequence(1).into()),
                        );
                        return Self::prepend(Element::CharClass(sk), joined, pos);
                    }
                }
                if sk.count() > MAX_COUNT {
                    return Self::fallback(source, t);
                }

                match t.elements.first_mut() {
                    Some(Element::CharClass(tk)) if tk.count() <= MAX_COUNT => {
                        let sw = CharSwitch::from_class(
                            tk.clone(),
                            t.sub_sequence(1).into(),
                        );
                        Self::join_terminals(
                            source,
                            Some(Sequence::new(vec![Element::CharSwitch(sw)]).into()),
                        )
                    }
                    Some(Element::CharSwitch(sw)) => {
                        let klass = CharClass::new(false, sk.ranges.clone());
                        let kase = sw.has_case(&klass);
                        if sk.exclusive {
                            if kase.is_some() && sw.cases.len() == 1 {
                                let base = sw.base.take().map(|b| *b);
                                sw.base = Some(Box::new(Self::join_terminals(
                                    source.sub_sequence(1),
                                    base,
                                )));
                                return t.into();
                            }
                        } else if let Some(idx) = kase {
                            let kase = &mut sw.cases[idx];
                            let element = kase.element.take().map(|e| *e);
                            kase.element = Some(Box::new(Self::join_terminals(
                                source.sub_sequence(1),
                                element,
                            )));
                            return t.into();
                        } else if !sw.overlaps(&klass) && sw.base.is_none() {
                            sw.cases.push(crate::CharCase {
                                klass,
                                element: Some(Box::new(
                                    source.sub_sequence(1).into(),
                                )),
                            });
                            return t.into();
                        }
                        Self::fallback(source, t)
                    }
                    _ => Self::fallback(source, t),
                }
            }
            Element::Choice(c) => {
                Self::join_into_last(source, c, Self::join_terminals)
            }
            other => Self::join_terminals(source, Some(Sequence::ensure(other).into())),
        }
    }

    fn bindings(e: &Element) -> Vec<BindingRef> {
        let mut refs = Vec::new();
        e.walk(&mut |e| {
            if let Element::Binding(b) = e {
                refs.push(b.to_ref());
            }
        });
        refs
    }

    /// Point the references in `tail` to bindings of `dropped` at the
    /// corresponding bindings of the equal element `kept`.
    fn redirect_bindings(kept: &Element, dropped: &Element, tail: &mut Element) {
        let pairs: Vec<(BindingRef, BindingRef)> = Self::bindings(dropped)
            .into_iter()
            .zip(Self::bindings(kept))
            .filter(|(d, k)| d.id != k.id)
            .collect();
        if pairs.is_empty() {
            return;
        }
        tail.walk_mut(&mut |e| {
            for r in e.binding_refs_mut() {
                if let Some((_, k)) = pairs.iter().find(|(d, _)| d.id == r.id) {
                    *r = *k;
                }
            }
        });
    }

    /// Whether both alternatives start with the same element.
    pub fn have_common_prefix(s1: &Sequence, s2: &Sequence) -> bool {
        match (s1.elements.first(), s2.elements.first()) {
            (Some(e1), Some(e2)) => e1 == e2,
            _ => false,
        }
    }

    /// Prepare `s2` for joining with `s1`.
    pub fn normalize_prefix(_s1: &Sequence, s2: Sequence) -> Sequence {
        s2
    }

    /// Join an alternative into the target, sharing common leading
    /// elements.
    pub fn join_prefixes(source: Sequence, target: Option<Element>) -> Element {
        let target = match target {
            None => return source.into(),
            Some(t) => Self::prepare_target(t),
        };

        match target {
            Element::Sequence(t) => {
                if source == t {
                    return source.into();
                }
                match (source.elements.first(), t.elements.first()) {
                    (Some(s1), Some(t1)) if s1 == t1 => {
                        let s1 = s1.clone();
                        let pos = source.pos;
                        let mut rest: Element = t.sub_sequence(1).into();
                        Self::redirect_bindings(&s1, t1, &mut rest);
                        let joined =
                            Self::join_prefixes(source.sub_sequence(1), Some(rest));
                        Self::prepend(s1, joined, pos)
                    }
                    _ => Self::fallback(source, t),
                }
            }
            Element::Choice(c) => {
                Self::join_into_last(source, c, Self::join_prefixes)
            }
            other => Self::join_prefixes(source, Some(Sequence::ensure(other).into())),
        }
    }

    /* ============ Text ============ */

    /// The text the element always matches, if it matches constant text.
    pub fn matching_text(&self, e: &Element) -> Option<String> {
        let mut text = String::new();
        if self.append_matching_text(e, &mut text) {
            Some(text)
        } else {
            None
        }
    }

    fn append_matching_text(&self, e: &Element, text: &mut String) -> bool {
        match e {
            Element::Choice(c) => match c.alternatives.as_slice() {
                [alt] => alt
                    .elements
                    .iter()
                    .all(|e| self.append_matching_text(e, text)),
                _ => false,
            },
            Element::Sequence(s) => {
                s.elements.iter().all(|e| self.append_matching_text(e, text))
            }
            Element::FollowedBy(_)
            | Element::NotFollowedBy(_)
            | Element::SemanticPredicate(_)
            | Element::Action(_)
            | Element::NodeMarker(_)
            | Element::NullLiteral => true,
            Element::Binding(b) => self.append_matching_text(&b.element, text),
            Element::StringMatch(m) => {
                self.append_matching_text(&m.element, text)
            }
            Element::NonTerminal(nt) => match self.lookup(nt.name) {
                Ok(prod) => match prod.try_borrow() {
                    Ok(p) => p.choice.alternatives.len() == 1
                        && p.choice.alternatives[0]
                            .elements
                            .iter()
                            .all(|e| self.append_matching_text(e, text)),
                    Err(_) => false,
                },
                Err(_) => false,
            },
            Element::StringLiteral(s) => {
                text.push_str(s);
                true
            }
            Element::CharLiteral(c) => {
                text.push(*c);
                true
            }
            Element::CharClass(k) => match k.ranges.as_slice() {
                [r] if !k.exclusive && r.first == r.last => {
                    text.push(r.first);
                    true
                }
                _ => false,
            },
            e => e.is_value(),
        }
    }

    /* ============ Input ============ */

    /// Run `test` on the choice of the production called `name`, memoizing
    /// the result. Cycles and failed lookups yield `fallback`.
    fn memoized(
        &mut self,
        name: Id,
        fallback: bool,
        table: fn(&mut Memo) -> &mut HashMap<Id, bool>,
        test: fn(&mut Self, &OrderedChoice) -> bool,
    ) -> bool {
        if let Some(result) = table(&mut self.memo).get(&name) {
            return *result;
        }
        if self.memo.working.contains(&name) {
            return fallback;
        }
        let Ok(prod) = self.lookup(name) else {
            return fallback;
        };
        let Ok(p) = prod.try_borrow() else {
            return fallback;
        };
        self.memo.working.insert(name);
        let result = test(self, &p.choice);
        self.memo.working.remove(&name);
        table(&mut self.memo).insert(name, result);
        result
    }

    fn restricts_choice(&mut self, c: &OrderedChoice) -> bool {
        !c.alternatives.is_empty()
            && c.alternatives.iter().all(|alt| {
                alt.elements.iter().any(|e| self.restricts_input(e))
            })
    }

    /// Whether the element may fail on some input, i.e., does not accept
    /// every input.
    pub fn restricts_input(&mut self, e: &Element) -> bool {
        match e {
            Element::Choice(c) => self.restricts_choice(c),
            Element::Repetition { once, element } => {
                *once && self.restricts_input(element)
            }
            Element::Optional(_) => false,
            Element::Sequence(s) => {
                s.elements.iter().any(|e| self.restricts_input(e))
            }
            Element::FollowedBy(_)
            | Element::NotFollowedBy(_)
            | Element::SemanticPredicate(_) => true,
            Element::NonTerminal(nt) => self.memoized(
                nt.name,
                true,
                |m| &mut m.restricts,
                Self::restricts_choice,
            ),
            Element::Binding(b) => self.restricts_input(&b.element),
            Element::StringMatch(_) => true,
            Element::Voided(e) => self.restricts_input(e),
            Element::ParserAction(_) => true,
            e => e.is_terminal(),
        }
    }

    fn consumes_choice(&mut self, c: &OrderedChoice) -> bool {
        c.alternatives
            .iter()
            .any(|alt| alt.elements.iter().any(|e| self.consumes_input(e)))
    }

    /// Whether the element may consume input.
    pub fn consumes_input(&mut self, e: &Element) -> bool {
        match e {
            Element::Choice(c) => self.consumes_choice(c),
            Element::Sequence(s) => {
                s.elements.iter().any(|e| self.consumes_input(e))
            }
            Element::FollowedBy(_)
            | Element::NotFollowedBy(_)
            | Element::SemanticPredicate(_) => false,
            Element::NonTerminal(nt) => self.memoized(
                nt.name,
                true,
                |m| &mut m.consumes,
                Self::consumes_choice,
            ),
            Element::ParserAction(_) => true,
            e if e.is_terminal() => true,
            e => match e.unary_child() {
                Some(child) => self.consumes_input(child),
                None => false,
            },
        }
    }

    fn empty_choice(&mut self, c: &OrderedChoice) -> bool {
        c.alternatives
            .iter()
            .any(|alt| alt.elements.iter().all(|e| self.matches_empty(e)))
    }

    /// Whether the element may succeed without consuming input.
    pub fn matches_empty(&mut self, e: &Element) -> bool {
        match e {
            Element::Choice(c) => self.empty_choice(c),
            Element::Repetition { once, element } => {
                !*once || self.matches_empty(element)
            }
            Element::Optional(_) => true,
            Element::Sequence(s) => {
                s.elements.iter().all(|e| self.matches_empty(e))
            }
            Element::FollowedBy(e) => self.matches_empty(e),
            Element::NotFollowedBy(e) => !self.matches_empty(e),
            Element::SemanticPredicate(_) => false,
            Element::NonTerminal(nt) => self.memoized(
                nt.name,
                false,
                |m| &mut m.empty,
                Self::empty_choice,
            ),
            Element::ParserAction(_) => false,
            e if e.is_terminal() => false,
            e => match e.unary_child() {
                Some(child) => self.matches_empty(child),
                None => true,
            },
        }
    }

    /// Whether the element is nothing but a negative syntactic predicate.
    pub fn is_not_followed_by(&self, e: &Element) -> bool {
        let mut working = HashSet::new();
        self.not_followed_by(Self::strip(e), &mut working)
    }

    fn not_followed_by(&self, e: &Element, working: &mut HashSet<Id>) -> bool {
        match e {
            Element::Choice(c) => {
                !c.alternatives.is_empty()
                    && c.alternatives.iter().all(|alt| {
                        !alt.is_empty()
                            && alt.elements.iter().all(|e| {
                                self.not_followed_by(Self::strip(e), working)
                            })
                    })
            }
            Element::Sequence(s) => {
                !s.is_empty()
                    && s.elements
                        .iter()
                        .all(|e| self.not_followed_by(Self::strip(e), working))
            }
            Element::NonTerminal(nt) => {
                if !working.insert(nt.name) {
                    return false;
                }
                let result = match self.lookup(nt.name) {
                    Ok(prod) => match prod.try_borrow() {
                        Ok(p) => {
                            let choice = Element::Choice(p.choice.clone());
                            self.not_followed_by(Self::strip(&choice), working)
                        }
                        Err(_) => false,
                    },
                    Err(_) => false,
                };
                working.remove(&nt.name);
                result
            }
            Element::NotFollowedBy(_) => true,
            _ => false,
        }
    }

    /* ============ Bindings ============ */

    fn is_void_nonterminal(&self, name: Id) -> bool {
        match self.lookup(name) {
            Ok(prod) => prod.try_borrow().is_ok_and(|p| p.ty.is_void()),
            Err(_) => false,
        }
    }

    /// Whether the element has a value that a binding can capture.
    pub fn is_bindable(&self, e: &Element) -> bool {
        match e {
            Element::NonTerminal(nt) => match self.lookup(nt.name) {
                Ok(prod) => prod.try_borrow().is_ok_and(|p| !p.ty.is_void()),
                Err(_) => false,
            },
            Element::NullLiteral
            | Element::Choice(_)
            | Element::Optional(_)
            | Element::Repetition { .. }
            | Element::AnyChar
            | Element::CharClass(_)
            | Element::CharLiteral(_)
            | Element::StringLiteral(_)
            | Element::StringMatch(_)
            | Element::ParseTreeNode { .. }
            | Element::Binding(_) => true,
            _ => false,
        }
    }

    /// Bind the single element of the alternative that has a value, unless
    /// it already is bound. Returns [None] if there is no such element or
    /// there are several.
    pub fn bind(
        &mut self,
        elements: &mut [Element],
        marker: Option<&str>,
    ) -> Option<BindingRef> {
        let mut found: Option<(usize, bool)> = None;
        for (i, e) in elements.iter().enumerate() {
            let is_binding = match e {
                Element::NonTerminal(nt) if self.is_void_nonterminal(nt.name) => {
                    continue;
                }
                Element::NonTerminal(_)
                | Element::NullLiteral
                | Element::Choice(_)
                | Element::Optional(_)
                | Element::Repetition { .. }
                | Element::AnyChar
                | Element::CharClass(_)
                | Element::CharLiteral(_)
                | Element::StringLiteral(_)
                | Element::StringMatch(_)
                | Element::ParseTreeNode { .. } => false,
                Element::Binding(_) => true,
                Element::FollowedBy(_)
                | Element::NotFollowedBy(_)
                | Element::SemanticPredicate(_)
                | Element::Voided(_)
                | Element::NodeMarker(_) => continue,
                Element::Action(a) if !a.sets_value() => continue,
                _ => return None,
            };
            if found.is_some() {
                return None;
            }
            found = Some((i, is_binding));
        }

        let (idx, is_binding) = found?;
        if let Element::Binding(b) = &elements[idx] {
            if is_binding {
                return Some(b.to_ref());
            }
        }
        let name = match marker {
            Some(marker) => self.variable_with(marker),
            None => self.variable(),
        };
        let bound = std::mem::replace(&mut elements[idx], Element::NullLiteral);
        let binding = Binding::new(name, bound);
        let r = binding.to_ref();
        elements[idx] = binding.into();
        Some(r)
    }

    /// The single binding in the alternative.
    pub fn get_binding(elements: &[Element]) -> Option<&Binding> {
        let mut bindings = elements.iter().filter_map(|e| match e {
            Element::Binding(b) => Some(b),
            _ => None,
        });
        match (bindings.next(), bindings.next()) {
            (Some(b), None) => Some(b),
            _ => None,
        }
    }

    /* ============ Values ============ */

    /// The element determining the alternative's semantic value.
    pub fn get_value<'a>(
        &self,
        elements: &'a [Element],
        ignore_actions: bool,
    ) -> Option<&'a Element> {
        let mut value = None;
        for e in elements {
            match e {
                Element::Binding(b) if b.name.as_str() == VALUE => value = Some(e),
                Element::Action(a) if !ignore_actions && a.sets_value() => {
                    value = Some(e)
                }
                Element::ParserAction(_) if !ignore_actions => value = Some(e),
                e if e.is_value() => value = Some(e),
                _ => {}
            }
        }
        if value.is_some() {
            return value;
        }

        let mut candidates = elements.iter().filter(|e| match e {
            Element::NonTerminal(nt) => !self.is_void_nonterminal(nt.name),
            e => self.is_bindable(e),
        });
        match (candidates.next(), candidates.next()) {
            (Some(e), None) => Some(e),
            _ => None,
        }
    }

    /// Whether the element explicitly sets the semantic value. With `all`,
    /// every alternative of a trailing choice must set it.
    pub fn sets_value(e: &Element, all: bool) -> bool {
        Self::sets_value_at(e, all, true)
    }

    /// Whether any of the elements, taken as one alternative, sets the
    /// semantic value.
    pub fn elements_set_value(elements: &[&Element], all: bool) -> bool {
        let last = elements.len().saturating_sub(1);
        elements
            .iter()
            .enumerate()
            .any(|(i, e)| Self::sets_value_at(e, all, i == last))
    }

    fn alternative_sets_value(s: &Sequence, all: bool) -> bool {
        let last = s.len().saturating_sub(1);
        s.elements
            .iter()
            .enumerate()
            .any(|(i, e)| Self::sets_value_at(e, all, i == last))
    }

    fn sets_value_at(e: &Element, all: bool, is_last: bool) -> bool {
        match e {
            Element::Choice(c) => {
                if !is_last {
                    return false;
                }
                let alt_sets =
                    |alt: &Sequence| Self::alternative_sets_value(alt, all);
                if all {
                    c.alternatives.iter().all(alt_sets)
                } else {
                    c.alternatives.iter().any(alt_sets)
                }
            }
            Element::Sequence(s) => {
                is_last && Self::alternative_sets_value(s, all)
            }
            Element::Voided(e) => Self::sets_value_at(e, all, is_last),
            Element::StringMatch(m) => {
                Self::sets_value_at(&m.element, all, is_last)
            }
            Element::Binding(b) => b.name.as_str() == VALUE,
            Element::Action(a) => a.sets_value(),
            Element::ParserAction(_) => true,
            e => e.is_value(),
        }
    }

    /// Whether the alternative sets its value to null.
    pub fn sets_null_value(elements: &[Element]) -> bool {
        let mut null = false;
        for e in elements {
            match e {
                Element::Binding(b) if b.name.as_str() == VALUE => return false,
                Element::Action(a) if a.sets_value() => return false,
                Element::NullValue => null = true,
                e if e.is_value() => return false,
                _ => {}
            }
        }
        null
    }

    /// Whether the element's value may be null.
    pub fn may_be_null(&self, e: &Element) -> bool {
        match e {
            Element::Optional(_) => true,
            Element::NonTerminal(nt) => match self.lookup(nt.name) {
                Ok(prod) => prod.try_borrow().is_ok_and(|p| p.props.option),
                Err(_) => false,
            },
            _ => false,
        }
    }

    /* ============ Types ============ */

    /// The type of the element's semantic value.
    pub fn type_of(&self, e: &Element) -> PackratResult<Type> {
        Ok(match e {
            Element::Choice(_) | Element::Sequence(_) => Type::Any,
            Element::Repetition { element, .. } => {
                match Self::single_binding(element) {
                    Some(b) => Type::list(self.type_of(&b.element)?),
                    None => Type::list(Type::Any),
                }
            }
            Element::Optional(element) => match Self::single_binding(element) {
                Some(b) => self.type_of(&b.element)?,
                None => Type::Any,
            },
            Element::Voided(_) => Type::Void,
            Element::Binding(b) => self.type_of(&b.element)?,
            Element::NonTerminal(nt) => {
                let prod = self.lookup(nt.name)?;
                let ty = match prod.try_borrow() {
                    Ok(p) => p.ty.clone(),
                    Err(_) => {
                        return Err(Error::contract(format!(
                            "type of production {} requested while it is rewritten",
                            nt.name
                        )));
                    }
                };
                ty
            }
            Element::AnyChar
            | Element::CharLiteral(_)
            | Element::CharClass(_)
            | Element::CharSwitch(_) => Type::Char,
            Element::StringLiteral(_) => Type::String,
            Element::StringMatch(_) => {
                if self.with_parse_tree {
                    Type::Node
                } else {
                    Type::String
                }
            }
            Element::ParseTreeNode { .. } => Type::Node,
            Element::NullLiteral => Type::Wildcard,
            e => {
                return Err(Error::contract(format!(
                    "element `{e}' has no value type"
                )));
            }
        })
    }

    /// The single binding inside a repeated or optional element.
    fn single_binding(e: &Element) -> Option<&Binding> {
        match Self::strip(e) {
            Element::Binding(b) => Some(b),
            Element::Sequence(s) => Self::get_binding(&s.elements),
            _ => None,
        }
    }
}
