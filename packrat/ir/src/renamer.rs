//! Renaming nonterminals.
use crate::{Analyzer, Element, Module, OrderedChoice, Production};
use packrat_utils::Id;
use std::collections::HashMap;

/// Maps a nonterminal to its new name.
pub trait Translation {
    fn map(&self, name: Id, analyzer: &Analyzer) -> Id;
}

/// Rename the nonterminals in the map and keep all others.
impl Translation for HashMap<Id, Id> {
    fn map(&self, name: Id, _analyzer: &Analyzer) -> Id {
        self.get(&name).copied().unwrap_or(name)
    }
}

/// Rewrites every nonterminal reference through a [Translation].
pub struct Renamer<'a, T: Translation> {
    analyzer: &'a Analyzer,
    translation: T,
}

impl<'a, T: Translation> Renamer<'a, T> {
    pub fn new(analyzer: &'a Analyzer, translation: T) -> Self {
        Renamer {
            analyzer,
            translation,
        }
    }

    pub fn rename(&self, e: &mut Element) {
        e.walk_mut(&mut |e| {
            if let Element::NonTerminal(nt) = e {
                nt.name = self.translation.map(nt.name, self.analyzer);
            }
        });
    }

    pub fn rename_choice(&self, c: &mut OrderedChoice) {
        for alt in &mut c.alternatives {
            for e in &mut alt.elements {
                self.rename(e);
            }
        }
    }

    pub fn rename_production(&self, prod: &mut Production) {
        self.rename_choice(&mut prod.choice);
    }

    /// Rename the references in every production of the module.
    pub fn rename_module(&self, module: &Module) {
        for prod in &module.productions {
            self.rename_production(&mut prod.borrow_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sequence, Type};

    #[test]
    fn renames_nested_references() {
        let a = Id::new("A");
        let b = Id::new("B");
        let module = Module::new(
            Id::new("M"),
            vec![Production::new(
                Id::new("P"),
                Type::Void,
                OrderedChoice::new(vec![Sequence::new(vec![
                    Element::star(Element::nonterminal(a)),
                    Element::nonterminal(Id::new("C")),
                ])]),
            )],
        );
        let analyzer = Analyzer::new(&module);
        let map: HashMap<Id, Id> = [(a, b)].into_iter().collect();
        Renamer::new(&analyzer, map).rename_module(&module);
        let p = module.productions[0].borrow();
        assert_eq!(p.choice.to_string(), "(B* C)");
    }
}
