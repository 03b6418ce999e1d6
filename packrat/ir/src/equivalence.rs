//! Structural equivalence modulo variable and nonterminal renaming.
use crate::{
    BindingRef, CharSwitch, Element, GenericValue, OrderedChoice, Production,
    Sequence, VALUE,
};
use packrat_utils::Id;
use std::collections::HashMap;

/// Tests whether two productions are the same up to the names of their
/// bound variables and of the productions themselves.
///
/// Variables are matched one-to-one: once `x` in the first production is
/// matched with `y` in the second, neither may be matched with anything
/// else within the same alternative. The value variable only matches
/// itself.
#[derive(Default)]
pub struct EquivalenceTester {
    /// Nonterminals of the second production mapped to the first.
    nts: HashMap<Id, Id>,
    /// Variables of the second production mapped to the first.
    vars: HashMap<Id, Id>,
    /// The inverse of `vars`.
    inverse: HashMap<Id, Id>,
}

impl EquivalenceTester {
    pub fn are_equivalent(&mut self, p1: &Production, p2: &Production) -> bool {
        if p1.attributes != p2.attributes || p1.ty != p2.ty {
            return false;
        }
        self.nts.clear();
        self.vars.clear();
        self.inverse.clear();
        self.nts.insert(p2.name, p1.name);
        self.nts.insert(p2.qualified_name(), p1.qualified_name());
        let result = self.choices(&p1.choice, &p2.choice);
        self.nts.clear();
        result
    }

    /// Whether the elements are equivalent, with no renaming of
    /// nonterminals.
    pub fn are_equivalent_elements(&mut self, e1: &Element, e2: &Element) -> bool {
        self.nts.clear();
        self.vars.clear();
        self.inverse.clear();
        self.equivalent(e1, e2)
    }

    fn choices(&mut self, c1: &OrderedChoice, c2: &OrderedChoice) -> bool {
        c1.alternatives.len() == c2.alternatives.len()
            && c1
                .alternatives
                .iter()
                .zip(&c2.alternatives)
                .all(|(a1, a2)| {
                    let vars = self.vars.clone();
                    let inverse = self.inverse.clone();
                    let result = self.sequences(a1, a2);
                    self.vars = vars;
                    self.inverse = inverse;
                    result
                })
    }

    fn sequences(&mut self, s1: &Sequence, s2: &Sequence) -> bool {
        s1.len() == s2.len()
            && s1
                .elements
                .iter()
                .zip(&s2.elements)
                .all(|(e1, e2)| self.equivalent(e1, e2))
    }

    /// Match variable `v1` of the first element with `v2` of the second. A
    /// binding introduces the match, a reference must use an existing one.
    fn variables(&mut self, v1: Id, v2: Id, introduce: bool) -> bool {
        match (self.vars.get(&v2), self.inverse.get(&v1)) {
            (Some(m1), Some(m2)) => *m1 == v1 && *m2 == v2,
            (None, None) => {
                if v1 != v2
                    && (v1.as_str() == VALUE || v2.as_str() == VALUE || !introduce)
                {
                    return false;
                }
                if !introduce {
                    return true;
                }
                self.vars.insert(v2, v1);
                self.inverse.insert(v1, v2);
                true
            }
            _ => false,
        }
    }

    fn references(&mut self, r1: &[BindingRef], r2: &[BindingRef]) -> bool {
        r1.len() == r2.len()
            && r1
                .iter()
                .zip(r2)
                .all(|(a, b)| self.variables(a.name, b.name, false))
    }

    fn nonterminals(&self, n1: Id, n2: Id) -> bool {
        n1 == n2 || self.nts.get(&n2) == Some(&n1)
    }

    fn generic_values(&mut self, v1: &GenericValue, v2: &GenericValue) -> bool {
        self.nonterminals(v1.name, v2.name)
            && self.references(&v1.children, &v2.children)
            && self.references(&v1.formatting, &v2.formatting)
    }

    fn switches(&mut self, s1: &CharSwitch, s2: &CharSwitch) -> bool {
        if s1.cases.len() != s2.cases.len() {
            return false;
        }
        for (c1, c2) in s1.cases.iter().zip(&s2.cases) {
            if c1.klass != c2.klass || !self.optional(&c1.element, &c2.element) {
                return false;
            }
        }
        self.optional(&s1.base, &s2.base)
    }

    fn optional(
        &mut self,
        e1: &Option<Box<Element>>,
        e2: &Option<Box<Element>>,
    ) -> bool {
        match (e1, e2) {
            (None, None) => true,
            (Some(e1), Some(e2)) => self.equivalent(e1, e2),
            _ => false,
        }
    }

    fn equivalent(&mut self, e1: &Element, e2: &Element) -> bool {
        use Element as E;
        match (e1, e2) {
            (E::Choice(c1), E::Choice(c2)) => self.choices(c1, c2),
            (E::Sequence(s1), E::Sequence(s2)) => self.sequences(s1, s2),
            (
                E::Repetition { once: o1, element: r1 },
                E::Repetition { once: o2, element: r2 },
            ) => o1 == o2 && self.equivalent(r1, r2),
            (E::Optional(a), E::Optional(b))
            | (E::FollowedBy(a), E::FollowedBy(b))
            | (E::NotFollowedBy(a), E::NotFollowedBy(b))
            | (E::Voided(a), E::Voided(b)) => self.equivalent(a, b),
            (E::Binding(b1), E::Binding(b2)) => {
                self.variables(b1.name, b2.name, true)
                    && self.equivalent(&b1.element, &b2.element)
            }
            (E::StringMatch(m1), E::StringMatch(m2)) => {
                m1.text == m2.text && self.equivalent(&m1.element, &m2.element)
            }
            (E::NonTerminal(n1), E::NonTerminal(n2)) => {
                self.nonterminals(n1.name, n2.name)
            }
            (E::CharSwitch(s1), E::CharSwitch(s2)) => self.switches(s1, s2),
            (
                E::ParseTreeNode {
                    predecessors: p1,
                    node: n1,
                    successors: s1,
                },
                E::ParseTreeNode {
                    predecessors: p2,
                    node: n2,
                    successors: s2,
                },
            ) => {
                self.references(p1, p2)
                    && match (n1, n2) {
                        (None, None) => true,
                        (Some(n1), Some(n2)) => {
                            self.variables(n1.name, n2.name, false)
                        }
                        _ => false,
                    }
                    && self.references(s1, s2)
            }
            (E::BindingValue(r1), E::BindingValue(r2)) => {
                self.variables(r1.name, r2.name, false)
            }
            (
                E::ProperListValue {
                    ty: t1,
                    elements: l1,
                    tail: tail1,
                },
                E::ProperListValue {
                    ty: t2,
                    elements: l2,
                    tail: tail2,
                },
            ) => {
                t1 == t2
                    && self.references(l1, l2)
                    && match (tail1, tail2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => self.variables(a.name, b.name, false),
                        _ => false,
                    }
            }
            (
                E::ActionBaseValue { list: l1, seed: s1 },
                E::ActionBaseValue { list: l2, seed: s2 },
            ) => {
                self.variables(l1.name, l2.name, false)
                    && self.variables(s1.name, s2.name, false)
            }
            (E::GenericNodeValue(v1), E::GenericNodeValue(v2)) => {
                self.generic_values(v1, v2)
            }
            (
                E::GenericActionValue { value: v1, first: f1 },
                E::GenericActionValue { value: v2, first: f2 },
            ) => {
                self.generic_values(v1, v2) && self.variables(*f1, *f2, true)
            }
            (
                E::GenericRecursionValue {
                    value: v1,
                    first: f1,
                    list: l1,
                },
                E::GenericRecursionValue {
                    value: v2,
                    first: f2,
                    list: l2,
                },
            ) => {
                self.generic_values(v1, v2)
                    && self.variables(*f1, *f2, true)
                    && self.variables(l1.name, l2.name, false)
            }
            (e1, e2) => e1 == e2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Binding, Copier, Type};

    fn alt(name: &str, var: &str) -> Sequence {
        let b = Binding::new(Id::new(var), Element::nonterminal(Id::new(name)));
        Sequence::new(vec![
            Element::CharLiteral('('),
            b.clone().into(),
            Element::BindingValue(b.to_ref()),
        ])
    }

    fn prod(name: &str, alts: Vec<Sequence>) -> Production {
        Production::new(Id::new(name), Type::Node, OrderedChoice::new(alts))
    }

    #[test]
    fn renamed_variables_are_equivalent() {
        let p1 = prod("A", vec![alt("X", "x")]);
        let p2 = prod("B", vec![alt("X", "y")]);
        let mut tester = EquivalenceTester::default();
        assert!(tester.are_equivalent(&p1, &p2));
        assert!(tester.are_equivalent(&p2, &p1));
    }

    #[test]
    fn self_references_are_renamed() {
        let p1 = prod("A", vec![alt("A", "x")]);
        let p2 = prod("B", vec![alt("B", "x")]);
        let p3 = prod("C", vec![alt("A", "x")]);
        let mut tester = EquivalenceTester::default();
        assert!(tester.are_equivalent(&p1, &p2));
        assert!(!tester.are_equivalent(&p2, &p3));
        assert!(!tester.are_equivalent(&p3, &p2));
    }

    #[test]
    fn value_variable_matches_only_itself() {
        let p1 = prod("A", vec![alt("X", VALUE)]);
        let p2 = prod("B", vec![alt("X", "y")]);
        let mut tester = EquivalenceTester::default();
        assert!(!tester.are_equivalent(&p1, &p2));
        assert!(!tester.are_equivalent(&p2, &p1));
    }

    #[test]
    fn variables_match_one_to_one() {
        let pair = |v1: &str, v2: &str| {
            let b1 = Binding::new(Id::new(v1), Element::AnyChar);
            let b2 = Binding::new(Id::new(v2), Element::AnyChar);
            Sequence::new(vec![
                b1.clone().into(),
                b2.clone().into(),
                Element::ProperListValue {
                    ty: Type::Char,
                    elements: vec![b1.to_ref(), b2.to_ref()],
                    tail: None,
                },
            ])
        };
        let p1 = prod("A", vec![pair("a", "b")]);
        let p2 = prod("B", vec![pair("c", "c")]);
        let mut tester = EquivalenceTester::default();
        assert!(!tester.are_equivalent(&p1, &p2));
        assert!(!tester.are_equivalent(&p2, &p1));
        let p3 = prod("C", vec![pair("b", "a")]);
        assert!(tester.are_equivalent(&p1, &p3));
    }

    #[test]
    fn copies_are_equivalent() {
        let p = prod("A", vec![alt("X", "x"), alt("A", "y")]);
        let copy = Copier::default().copy_production(&p).unwrap();
        assert!(EquivalenceTester::default().are_equivalent(&p, &copy));
    }

    #[test]
    fn elements_keep_their_nonterminals() {
        let mut tester = EquivalenceTester::default();
        let x = Element::Sequence(alt("X", "x"));
        let renamed = Element::Sequence(alt("X", "y"));
        let other = Element::Sequence(alt("Y", "x"));
        assert!(tester.are_equivalent_elements(&x, &renamed));
        assert!(!tester.are_equivalent_elements(&x, &other));
    }
}
