//! Properties of the grammar transformations over generated grammars.
mod common;

use common::*;
use packrat_ir::{
    Analyzer, Binding, BindingId, Copier, Cost, Element, EquivalenceTester,
    Sequence, Type,
};
use packrat_opt::passes::{
    ChoiceExpander, CostEstimator, DuplicateProductionFolder, Inliner,
    MetaDataCreator, ReferenceCounter, Simplifier,
};
use packrat_opt::traversal::Visitor;
use packrat_utils::Id;
use proptest::prelude::*;
use std::collections::HashSet;

/// Bind every element and collect the bindings into a list value.
fn bound_sequence(elements: Vec<Element>) -> Sequence {
    let mut refs = Vec::new();
    let mut bound = Vec::new();
    for (i, e) in elements.into_iter().enumerate() {
        let b = Binding::new(Id::new(format!("x{i}")), e);
        refs.push(b.to_ref());
        bound.push(b.into());
    }
    bound.push(Element::ProperListValue {
        ty: Type::list(Type::Any),
        elements: refs,
        tail: None,
    });
    Sequence::new(bound)
}

fn binding_ids(s: &Sequence) -> Vec<BindingId> {
    let mut ids = Vec::new();
    for e in &s.elements {
        e.walk(&mut |e| {
            if let Element::Binding(b) = e {
                ids.push(b.id);
            }
        });
    }
    ids
}

fn cost_of(ctx: &packrat_ir::Context, name: &str) -> Cost {
    let module = module(ctx);
    CostEstimator::default().estimate(module, &mut Analyzer::new(module));
    let prod = module.find(Id::new(name)).expect("production exists");
    let cost = prod.borrow().props.cost.expect("cost is estimated");
    cost
}

proptest! {
    #[test]
    fn simplification_is_idempotent(prods in grammar()) {
        let mut ctx = context(prods);
        Simplifier::do_pass_default(&mut ctx).unwrap();
        let once = snapshot(&ctx);
        Simplifier::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(once, snapshot(&ctx));
    }

    #[test]
    fn simplification_preserves_the_language(
        prods in grammar(),
        inputs in inputs(),
    ) {
        let mut ctx = context(prods);
        let before = language(&ctx, &inputs);
        Simplifier::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(before, language(&ctx, &inputs));
    }

    #[test]
    fn productions_are_equivalent_to_their_copies(prods in grammar()) {
        let ctx = context(prods);
        let mut tester = EquivalenceTester::default();
        for prod in &module(&ctx).productions {
            let p = prod.borrow();
            let copy = Copier::default().copy_production(&p).unwrap();
            prop_assert!(tester.are_equivalent(&p, &copy));
        }
    }

    #[test]
    fn equivalence_is_symmetric(prods in grammar()) {
        let ctx = context(prods);
        let prods = &module(&ctx).productions;
        let mut tester = EquivalenceTester::default();
        for p1 in prods {
            for p2 in prods {
                let (p1, p2) = (p1.borrow(), p2.borrow());
                prop_assert_eq!(
                    tester.are_equivalent(&p1, &p2),
                    tester.are_equivalent(&p2, &p1)
                );
            }
        }
    }

    #[test]
    fn copies_have_fresh_bindings(
        elements in prop::collection::vec(expression(), 1..5),
    ) {
        let original = bound_sequence(elements);
        let copy = Copier::default().copy_sequence(&original).unwrap();

        let old: HashSet<_> = binding_ids(&original).into_iter().collect();
        let new: Vec<_> = binding_ids(&copy);
        prop_assert_eq!(old.len(), new.len());
        let new: HashSet<_> = new.into_iter().collect();
        prop_assert!(old.is_disjoint(&new));

        let Some(Element::ProperListValue { elements, .. }) =
            copy.elements.last()
        else {
            panic!("expected a list value, found {copy}");
        };
        prop_assert!(elements.iter().all(|r| new.contains(&r.id)));
    }

    #[test]
    fn adding_elements_never_lowers_the_cost(
        prods in grammar(),
        extra in expression(),
    ) {
        let ctx = context(prods);
        let before = cost_of(&ctx, "P0");
        {
            let p0 = &module(&ctx).productions[0];
            // Unresolved references are unbounded, which is fine here.
            p0.borrow_mut().choice.alternatives[0].elements.push(extra);
        }
        prop_assert!(cost_of(&ctx, "P0") >= before);
    }

    #[test]
    fn inlining_preserves_the_language(
        prods in grammar(),
        inputs in inputs(),
    ) {
        let mut ctx = context(prods);
        let before = language(&ctx, &inputs);
        Inliner::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(before, language(&ctx, &inputs));
    }

    #[test]
    fn inlining_preserves_results(
        prods in valued_grammar(),
        inputs in inputs(),
    ) {
        let mut ctx = context(prods);
        let before = results(&ctx, &inputs);
        Inliner::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(before, results(&ctx, &inputs));
    }

    #[test]
    fn choice_expansion_preserves_results(
        prods in valued_grammar(),
        inputs in inputs(),
    ) {
        let mut ctx = context(prods);
        let before = results(&ctx, &inputs);
        MetaDataCreator::do_pass_default(&mut ctx).unwrap();
        ReferenceCounter::do_pass_default(&mut ctx).unwrap();
        ChoiceExpander::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(before, results(&ctx, &inputs));
    }

    #[test]
    fn valued_productions_are_equivalent_to_their_copies(
        prods in valued_grammar(),
    ) {
        let ctx = context(prods);
        let mut tester = EquivalenceTester::default();
        for prod in &module(&ctx).productions {
            let p = prod.borrow();
            let copy = Copier::default().copy_production(&p).unwrap();
            prop_assert!(tester.are_equivalent(&p, &copy));
        }
    }

    #[test]
    fn folding_preserves_the_language(
        prods in grammar(),
        inputs in inputs(),
    ) {
        let mut ctx = context(prods);
        let before = language(&ctx, &inputs);
        DuplicateProductionFolder::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(before, language(&ctx, &inputs));
    }

    #[test]
    fn folding_is_idempotent(prods in grammar()) {
        let mut ctx = context(prods);
        DuplicateProductionFolder::do_pass_default(&mut ctx).unwrap();
        let once = snapshot(&ctx);
        DuplicateProductionFolder::do_pass_default(&mut ctx).unwrap();
        prop_assert_eq!(once, snapshot(&ctx));
    }
}

#[test]
fn repetitions_and_recursion_are_unbounded() {
    let ctx = context(vec![
        prod("Loop", vec![vec![Element::star(lit('a'))]]),
        prod("Rec", vec![vec![lit('a'), nt("Rec")], vec![]]),
        prod(
            "Flat",
            vec![vec![text("ab"), Element::Optional(Box::new(lit('c')))]],
        ),
    ]);
    assert!(cost_of(&ctx, "Loop").is_unbounded());
    assert!(cost_of(&ctx, "Rec").is_unbounded());
    assert_eq!(cost_of(&ctx, "Flat"), Cost::new(4));
}
