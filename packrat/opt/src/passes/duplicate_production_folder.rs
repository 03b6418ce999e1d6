use super::is_generic;
use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use itertools::Itertools;
use packrat_ir::{
    self as ir, Analyzer, EquivalenceTester, Production, RRC, Renamer,
};
use packrat_utils::{Id, PackratResult};
use std::collections::HashMap;
use std::rc::Rc;

/// Folds productions that are the same up to variable names into a single
/// shared production.
///
/// Public and generic productions are never folded. The shared production
/// takes the attributes, type, and body of the first production of each
/// group and records the names of all folded productions. Since folding
/// can make further productions equivalent, the pass repeats until no
/// duplicates remain.
pub struct DuplicateProductionFolder {
    verbose: bool,
}

impl ConstructVisitor for DuplicateProductionFolder {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(DuplicateProductionFolder {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for DuplicateProductionFolder {
    fn name() -> &'static str {
        "duplicate-production-folder"
    }

    fn description() -> &'static str {
        "fold equivalent productions into shared ones"
    }
}

/// The names a production stands for.
fn sources(p: &Production) -> Vec<Id> {
    p.props
        .duplicates
        .clone()
        .unwrap_or_else(|| vec![p.qualified_name()])
}

impl DuplicateProductionFolder {
    /// The productions after `idx` that can be folded into the one at
    /// `idx`.
    fn duplicates(
        module: &ir::Module,
        idx: usize,
        tester: &mut EquivalenceTester,
        analyzer: &Analyzer,
    ) -> Vec<RRC<Production>> {
        let p1 = module.productions[idx].borrow();
        if !p1.is_full()
            || p1.is_public()
            || is_generic(&p1)
            || analyzer.is_marked(p1.qualified_name())
        {
            return vec![];
        }
        module.productions[idx + 1..]
            .iter()
            .filter(|p2| {
                let p2 = p2.borrow();
                p2.is_full()
                    && !p2.is_public()
                    && !analyzer.is_marked(p2.qualified_name())
                    && p1.props.text_only == p2.props.text_only
                    && p1.props.token == p2.props.token
                    && tester.are_equivalent(&p1, &p2)
            })
            .map(Rc::clone)
            .collect()
    }

    /// Build the production replacing `first` and `rest`, recording the
    /// new names in `folded` and marking `rest` for removal.
    fn share(
        module_name: Id,
        first: &Production,
        rest: &[RRC<Production>],
        folded: &mut HashMap<Id, Id>,
        analyzer: &mut Analyzer,
    ) -> Production {
        let name = analyzer.shared();
        let mut duplicates = sources(first);
        let mut option = first.props.option;
        folded.insert(first.name, name);
        folded.insert(first.qualified_name(), name);
        for p2 in rest {
            let p2 = p2.borrow();
            duplicates.extend(sources(&p2));
            option |= p2.props.option;
            analyzer.mark(p2.qualified_name());
            folded.insert(p2.name, name);
            folded.insert(p2.qualified_name(), name);
        }

        let mut shared = Production::new(name, first.ty.clone(), first.choice.clone());
        shared.attributes = first.attributes.clone();
        shared.qname = first
            .qname
            .map(|_| Id::new(format!("{module_name}.{name}")));
        shared.pos = first.pos;
        shared.props.duplicates = Some(duplicates);
        shared.props.text_only = first.props.text_only;
        shared.props.token = first.props.token;
        shared.props.option = option;
        shared
    }
}

impl Visitor for DuplicateProductionFolder {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let mut tester = EquivalenceTester::default();
        let mut found = false;
        loop {
            analyzer.init(module);
            let mut folded = HashMap::new();
            let mut idx = 0;
            while idx < module.productions.len() {
                let rest = Self::duplicates(module, idx, &mut tester, analyzer);
                if rest.is_empty() {
                    idx += 1;
                    continue;
                }
                let first = Rc::clone(&module.productions[idx]);
                let (qname, shared) = {
                    let p1 = first.borrow();
                    let shared =
                        Self::share(module.name, &p1, &rest, &mut folded, analyzer);
                    (p1.qualified_name(), shared)
                };
                analyzer.remove(module, qname);
                analyzer.start_adding();
                analyzer.add(shared);
                analyzer.add_new_productions_at(module, idx);
                idx += 1;
            }

            if folded.is_empty() {
                break;
            }
            found = true;
            Renamer::new(analyzer, folded).rename_module(module);
            let marked: Vec<Id> = analyzer.marked().copied().collect();
            for name in marked {
                analyzer.unmark(name);
                analyzer.remove(module, name);
            }
        }

        if found {
            for prod in &module.productions {
                let p = prod.borrow();
                if let Some(duplicates) = &p.props.duplicates {
                    trace!(
                        self.verbose,
                        "[Folding {} into {}]",
                        duplicates.iter().join(", "),
                        p.qualified_name()
                    );
                }
            }
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::{Element, Type};

    #[test]
    fn folds_equivalent_productions() {
        let mut ctx = context(vec![
            public(prod("P", Type::Void, vec![vec![nt("X"), nt("Y"), nt("Z")]])),
            prod("X", Type::Void, vec![vec![lit('x')], vec![lit('y')]]),
            prod("Y", Type::Void, vec![vec![lit('x')], vec![lit('y')]]),
            prod("Z", Type::Void, vec![vec![lit('y')], vec![lit('x')]]),
        ]);
        run::<DuplicateProductionFolder>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["($$Shared1 $$Shared1 Z)"]);
        assert!(!has(&ctx, "X") && !has(&ctx, "Y"));
        let shared = get(&ctx, "$$Shared1");
        assert_eq!(
            shared.borrow().props.duplicates,
            Some(vec![id("X"), id("Y")])
        );
    }

    #[test]
    fn folding_exposes_further_duplicates() {
        let mut ctx = context(vec![
            public(prod("P", Type::Void, vec![vec![nt("A"), nt("B")]])),
            prod("A", Type::Void, vec![vec![lit('a'), nt("C")]]),
            prod("B", Type::Void, vec![vec![lit('a'), nt("D")]]),
            prod("C", Type::Void, vec![vec![lit('c')]]),
            prod("D", Type::Void, vec![vec![lit('c')]]),
        ]);
        run::<DuplicateProductionFolder>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["($$Shared2 $$Shared2)"]);
        assert_eq!(alts(&ctx, "$$Shared2"), vec!["('a' $$Shared1)"]);
        assert_eq!(ctx.grammar.modules[0].productions.len(), 3);
    }

    #[test]
    fn public_and_differently_classified_productions_stay() {
        let mut ctx = context(vec![
            public(prod("P", Type::Void, vec![vec![lit('p')]])),
            public(prod("Q", Type::Void, vec![vec![lit('p')]])),
            prod("S", Type::String, vec![vec![lit('s')]]),
            prod("T", Type::String, vec![vec![lit('s')]]),
        ]);
        get(&ctx, "S").borrow_mut().props.text_only = true;
        run::<DuplicateProductionFolder>(&mut ctx);
        for name in ["P", "Q", "S", "T"] {
            assert!(has(&ctx, name), "{name} was folded");
        }
    }

    #[test]
    fn folds_recursive_productions() {
        let mut ctx = context(vec![
            public(prod("P", Type::Void, vec![vec![nt("L"), nt("M")]])),
            prod("L", Type::Void, vec![vec![lit('('), nt("L"), lit(')')], vec![]]),
            prod("M", Type::Void, vec![vec![lit('('), nt("M"), lit(')')], vec![]]),
        ]);
        run::<DuplicateProductionFolder>(&mut ctx);
        assert_eq!(alts(&ctx, "$$Shared1"), vec!["('(' $$Shared1 ')')", "()"]);
        assert!(matches!(
            get(&ctx, "P").borrow().choice.alternatives[0].elements[1],
            Element::NonTerminal(nt) if nt.name == id("$$Shared1")
        ));
    }
}
