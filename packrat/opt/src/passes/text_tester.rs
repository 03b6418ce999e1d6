use crate::analysis::GreatestFixpoint;
use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{self as ir, Analyzer, Element, OrderedChoice, VALUE};
use packrat_utils::{Id, PackratResult};

/// How a reference from a candidate body to another production is judged.
pub(super) enum Reference {
    /// The reference never disqualifies the candidate.
    Holds,
    /// The candidate qualifies only if the referenced production does.
    Depends(Id),
    Fails,
}

/// Collect the productions `choice` depends on, or [None] if the choice
/// contains a construct that disqualifies it. Syntactic and semantic
/// predicates are ignored; nonterminals are judged by `judge`.
pub(super) fn body_dependencies(
    choice: &OrderedChoice,
    judge: &mut dyn FnMut(Id) -> Reference,
) -> Option<Vec<Id>> {
    let mut deps = Vec::new();
    let lexical = choice
        .alternatives
        .iter()
        .all(|alt| alt.elements.iter().all(|e| collect(e, judge, &mut deps)));
    lexical.then_some(deps)
}

fn collect(
    e: &Element,
    judge: &mut dyn FnMut(Id) -> Reference,
    deps: &mut Vec<Id>,
) -> bool {
    match e {
        Element::FollowedBy(_)
        | Element::NotFollowedBy(_)
        | Element::SemanticPredicate(_) => true,
        Element::Binding(b) => {
            b.name.as_str() != VALUE && collect(&b.element, judge, deps)
        }
        Element::NonTerminal(nt) => match judge(nt.name) {
            Reference::Holds => true,
            Reference::Depends(name) => {
                deps.push(name);
                true
            }
            Reference::Fails => false,
        },
        Element::Choice(c) => c
            .alternatives
            .iter()
            .all(|alt| alt.elements.iter().all(|e| collect(e, judge, deps))),
        Element::Sequence(s) => s.elements.iter().all(|e| collect(e, judge, deps)),
        Element::CharSwitch(sw) => sw
            .cases
            .iter()
            .filter_map(|kase| kase.element.as_deref())
            .chain(sw.base.as_deref())
            .all(|e| collect(e, judge, deps)),
        Element::Action(a) => !a.sets_value(),
        Element::NullLiteral => true,
        e if e.is_terminal() => true,
        // Node markers, parser actions, parse tree nodes and value
        // elements all contribute something other than text.
        e => match e.unary_child() {
            Some(child) => collect(child, judge, deps),
            None => false,
        },
    }
}

/// Marks string-valued productions that only ever return the text they
/// matched.
///
/// A production is text-only if its alternatives consist of terminals,
/// predicates, bindings other than to the value variable, actions that do
/// not set the value, and references to other text-only productions.
/// Mutually recursive productions are text-only together unless one of
/// them is disqualified.
pub struct TextTester {
    verbose: bool,
}

impl ConstructVisitor for TextTester {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(TextTester {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for TextTester {
    fn name() -> &'static str {
        "text-tester"
    }

    fn description() -> &'static str {
        "recognize string productions that only return the matched text"
    }
}

impl Visitor for TextTester {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let mut fixpoint = GreatestFixpoint::default();
        for prod in &module.productions {
            let p = prod.borrow();
            if !p.is_full() || !p.ty.is_string() {
                continue;
            }
            let deps = body_dependencies(&p.choice, &mut |name| {
                let Ok(target) = analyzer.lookup(name) else {
                    return Reference::Fails;
                };
                match target.try_borrow() {
                    Ok(t) if t.ty.is_string() => {
                        Reference::Depends(t.qualified_name())
                    }
                    _ => Reference::Fails,
                }
            });
            fixpoint.candidate(p.qualified_name(), deps);
        }

        let text_only = fixpoint.solve();
        for prod in &module.productions {
            let mut p = prod.borrow_mut();
            if text_only.contains(&p.qualified_name()) {
                trace!(self.verbose, "[Recognizing {} as text-only]", p.qualified_name());
                p.props.text_only = true;
            }
        }
        Ok(Action::Stop)
    }
}
