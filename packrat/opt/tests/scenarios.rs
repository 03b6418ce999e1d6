//! Pass plans run through the pass manager on small grammars.
mod common;

use common::*;
use packrat_ir::Element;
use packrat_opt::pass_manager::PassManager;
use packrat_opt::passes::LeftRecurser;
use packrat_opt::traversal::Visitor;

fn plan(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn recursive(ctx: &packrat_ir::Context) -> Vec<String> {
    module(ctx)
        .productions
        .iter()
        .filter(|p| p.borrow().props.recursive)
        .map(|p| p.borrow().name.to_string())
        .collect()
}

#[test]
fn direct_left_recursion_is_detected() {
    let mut ctx = context(vec![prod(
        "A",
        vec![vec![nt("A"), lit('x')], vec![lit('y')]],
    )]);
    LeftRecurser::do_pass_default(&mut ctx).unwrap();
    assert_eq!(recursive(&ctx), vec!["A"]);
}

#[test]
fn recursion_after_input_is_not_left_recursion() {
    let mut ctx = context(vec![prod(
        "A",
        vec![vec![lit('y'), Element::Optional(Box::new(nt("A"))), lit('x')]],
    )]);
    LeftRecurser::do_pass_default(&mut ctx).unwrap();
    assert!(recursive(&ctx).is_empty());
}

#[test]
fn default_passes_list_their_aliases() {
    let pm = PassManager::default_passes().unwrap();
    let help = pm.complete_help();
    for alias in ["classify", "pre-opt", "values", "post-opt", "all", "tree"] {
        assert!(help.contains(&format!("- {alias}: ")), "{alias} is missing");
    }
    assert!(help.contains("* max-cost: "));
    assert!(pm.specific_help("simplifier").is_some());
}

#[test]
fn unknown_passes_are_rejected() {
    let pm = PassManager::default_passes().unwrap();
    let mut ctx = context(vec![prod("A", vec![vec![lit('a')]])]);
    let res = pm.execute_plan(&mut ctx, &plan(&["no-such-pass"]), &[], &[], false);
    assert!(res.is_err());
}

#[test]
fn optimization_preserves_the_language() {
    let mut ctx = context(vec![
        prod(
            "Start",
            vec![
                vec![nt("Word"), lit(' '), nt("Word")],
                vec![nt("Word"), lit('!')],
                vec![text("ab"), lit('?')],
            ],
        ),
        prod("Word", vec![vec![Element::plus(nt("Letter"))]]),
        prod("Letter", vec![vec![lit('a')], vec![lit('b')]]),
        prod("Unused", vec![vec![lit('u')]]),
    ]);
    let inputs: Vec<String> = ["ab ba", "a!", "ab?", "ab", "", "b b", "ba"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let matches = |ctx: &packrat_ir::Context| -> Vec<Option<usize>> {
        inputs
            .iter()
            .map(|input| Interpreter::new(module(ctx), input).parse("Start"))
            .collect()
    };
    let before = matches(&ctx);
    assert_eq!(
        before,
        vec![Some(5), Some(2), Some(3), None, None, Some(3), None]
    );

    let pm = PassManager::default_passes().unwrap();
    pm.execute_plan(&mut ctx, &plan(&["pre-opt"]), &[], &[], false)
        .unwrap();
    assert_eq!(before, matches(&ctx));
    assert!(module(&ctx).find(packrat_utils::Id::new("Unused")).is_none());
}

#[test]
fn excluded_passes_do_not_run() {
    let mut ctx = context(vec![
        prod("A", vec![vec![lit('a')]]),
        prod("B", vec![vec![lit('b')]]),
    ]);
    let pm = PassManager::default_passes().unwrap();
    pm.execute_plan(
        &mut ctx,
        &plan(&["dead-production-eliminator"]),
        &plan(&["dead-production-eliminator"]),
        &[],
        false,
    )
    .unwrap();
    assert_eq!(module(&ctx).productions.len(), 2);
}
