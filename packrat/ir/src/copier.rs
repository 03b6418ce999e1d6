//! Deep copies with fresh bindings.
use crate::{
    BindingId, BindingRef, Element, Grammar, Module, OrderedChoice, Production,
    Sequence, rrc,
};
use packrat_utils::{Error, PackratResult};
use std::collections::HashMap;

/// Copies elements, productions, and modules. Every binding in a copy gets
/// a fresh identity and the value elements of the copy refer to the new
/// bindings. A value element may only refer to bindings copied along with
/// it.
#[derive(Default)]
pub struct Copier {
    /// Maps the identities of the copied bindings to their copies, for the
    /// current top-level copy only.
    bindings: HashMap<BindingId, BindingRef>,
}

impl Copier {
    pub fn copy(&mut self, e: &Element) -> PackratResult<Element> {
        let mut copy = e.clone();
        self.renew(std::slice::from_mut(&mut copy))?;
        Ok(copy)
    }

    pub fn copy_sequence(&mut self, s: &Sequence) -> PackratResult<Sequence> {
        let mut copy = s.clone();
        self.renew(&mut copy.elements)?;
        Ok(copy)
    }

    pub fn copy_choice(
        &mut self,
        c: &OrderedChoice,
    ) -> PackratResult<OrderedChoice> {
        self.bindings.clear();
        let mut copy = c.clone();
        for alt in &mut copy.alternatives {
            self.refresh(&mut alt.elements);
        }
        for alt in &mut copy.alternatives {
            self.patch(&mut alt.elements)?;
        }
        Ok(copy)
    }

    pub fn copy_production(
        &mut self,
        prod: &Production,
    ) -> PackratResult<Production> {
        Ok(Production {
            choice: self.copy_choice(&prod.choice)?,
            ..prod.clone()
        })
    }

    pub fn copy_module(&mut self, module: &Module) -> PackratResult<Module> {
        let productions = module
            .productions
            .iter()
            .map(|p| Ok(rrc(self.copy_production(&p.borrow())?)))
            .collect::<PackratResult<_>>()?;
        Ok(Module {
            name: module.name,
            header: module.header.clone(),
            body: module.body.clone(),
            footer: module.footer.clone(),
            attributes: module.attributes.clone(),
            dependencies: module.dependencies.clone(),
            productions,
            root: module.root,
        })
    }

    pub fn copy_grammar(&mut self, grammar: &Grammar) -> PackratResult<Grammar> {
        let modules = grammar
            .modules
            .iter()
            .map(|m| self.copy_module(m))
            .collect::<PackratResult<_>>()?;
        Ok(Grammar::new(modules))
    }

    /// Start a new copy of the elements.
    fn renew(&mut self, elements: &mut [Element]) -> PackratResult<()> {
        self.bindings.clear();
        self.refresh(elements);
        self.patch(elements)
    }

    /// Give every binding a fresh identity.
    fn refresh(&mut self, elements: &mut [Element]) {
        let bindings = &mut self.bindings;
        let mut renew = |e: &mut Element| {
            if let Element::Binding(b) = e {
                let fresh = BindingId::fresh();
                bindings.insert(
                    b.id,
                    BindingRef {
                        id: fresh,
                        name: b.name,
                    },
                );
                b.id = fresh;
            }
        };
        for e in elements {
            e.walk_mut(&mut renew);
        }
    }

    /// Point the binding references at the fresh bindings.
    fn patch(&self, elements: &mut [Element]) -> PackratResult<()> {
        let mut missing = None;
        let mut redirect = |e: &mut Element| {
            for r in e.binding_refs_mut() {
                match self.bindings.get(&r.id) {
                    Some(copy) => *r = *copy,
                    None => {
                        missing.get_or_insert(r.name);
                    }
                }
            }
        };
        for e in elements {
            e.walk_mut(&mut redirect);
        }
        match missing {
            None => Ok(()),
            Some(name) => Err(Error::contract(format!(
                "Copying incomplete element without binding for {name}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Binding;
    use packrat_utils::Id;

    #[test]
    fn bindings_are_fresh_and_patched() {
        let b = Binding::new(Id::new("v$1"), Element::AnyChar);
        let original = Element::sequence(vec![
            b.clone().into(),
            Element::BindingValue(b.to_ref()),
        ]);
        let copy = Copier::default().copy(&original).unwrap();
        assert_eq!(copy, original);

        let Element::Sequence(s) = &copy else {
            panic!("expected a sequence");
        };
        let (Element::Binding(nb), Element::BindingValue(r)) =
            (&s.elements[0], &s.elements[1])
        else {
            panic!("unexpected shape {copy}");
        };
        assert_ne!(nb.id, b.id);
        assert_eq!(r.id, nb.id);
    }

    #[test]
    fn incomplete_elements_are_rejected() {
        let b = Binding::new(Id::new("v$1"), Element::AnyChar);
        let dangling = Element::BindingValue(b.to_ref());
        assert!(Copier::default().copy(&dangling).is_err());
    }

    #[test]
    fn copies_are_independent() {
        let b = Binding::new(Id::new("x"), Element::AnyChar);
        let prod = Production::new(
            Id::new("P"),
            crate::Type::Any,
            OrderedChoice::new(vec![Sequence::new(vec![
                b.clone().into(),
                Element::BindingValue(b.to_ref()),
            ])]),
        );
        let mut copier = Copier::default();
        let mut copy = copier.copy_production(&prod).unwrap();
        copy.choice.alternatives[0].elements.push(Element::NullValue);
        assert_eq!(prod.choice.alternatives[0].len(), 2);
    }

    #[test]
    fn grammar_copies_do_not_share_productions() {
        let prod = Production::new(
            Id::new("P"),
            crate::Type::Void,
            OrderedChoice::new(vec![Sequence::new(vec![Element::AnyChar])]),
        );
        let grammar = Grammar::new(vec![Module::new(Id::new("M"), vec![prod])]);
        let copy = Copier::default().copy_grammar(&grammar).unwrap();
        assert_eq!(copy.modules.len(), 1);
        assert_eq!(copy.modules[0].name, grammar.modules[0].name);
        copy.modules[0].productions[0].borrow_mut().choice.alternatives.clear();
        let original = grammar.modules[0].productions[0].borrow();
        assert_eq!(original.choice.alternatives.len(), 1);
    }
}
