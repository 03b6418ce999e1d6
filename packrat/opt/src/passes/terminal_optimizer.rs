use super::prefix_folder::splice;
use crate::traversal::{
    Action, ConstructVisitor, Named, Position, Rewriter, VisResult, Visitor,
    rewrite_production, walk_element,
};
use packrat_ir::{
    self as ir, Analyzer, CharSwitch, Element, MAX_COUNT, OrderedChoice, RRC,
    Sequence,
};
use packrat_utils::{Id, PackratResult};

/// Turns runs of alternatives starting with terminals into character
/// switches.
///
/// Leading literals of each run are broken into single-character classes,
/// alternatives starting with the same class are merged, and alternatives
/// starting with small, distinct classes are dispatched through a
/// [CharSwitch]. Remaining character classes with more than one but at most
/// [MAX_COUNT] characters become switches over the rest of their sequence.
/// Syntactic predicates are left alone.
pub struct TerminalOptimizer {
    verbose: bool,
    current: Id,
}

impl ConstructVisitor for TerminalOptimizer {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(TerminalOptimizer {
            verbose: ctx.config.verbose(),
            current: Id::default(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for TerminalOptimizer {
    fn name() -> &'static str {
        "terminal-optimizer"
    }

    fn description() -> &'static str {
        "dispatch alternatives starting with terminals through character switches"
    }
}

fn switchable(e: &Element) -> bool {
    matches!(e, Element::CharClass(k) if (2..=MAX_COUNT).contains(&k.count()))
}

impl Rewriter for TerminalOptimizer {
    fn rewrite_choice(
        &mut self,
        c: OrderedChoice,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let mut folded = Vec::with_capacity(c.alternatives.len());
        let mut alternatives = c.alternatives.into_iter().peekable();
        while let Some(head) = alternatives.next() {
            if !Analyzer::has_terminal_prefix(&head) {
                folded.push(head);
                continue;
            }
            let mut run = vec![head];
            while let Some(next) =
                alternatives.next_if(Analyzer::has_terminal_prefix)
            {
                run.push(next);
            }
            if run.len() == 1 {
                folded.extend(run);
                continue;
            }

            let joined = run
                .into_iter()
                .map(Analyzer::normalize_terminals)
                .fold(None, |joined, s| Some(Analyzer::join_terminals(s, joined)));
            if let Some(joined) = joined {
                splice(&mut folded, joined);
            }
            trace!(self.verbose, "[Folding terminals in {}]", self.current);
        }

        let child = pos.alternative();
        let alternatives = folded
            .into_iter()
            .map(|alt| {
                let alt = self.rewrite_sequence(alt, child, analyzer)?;
                Ok(Sequence::ensure(alt))
            })
            .collect::<PackratResult<_>>()?;
        Ok(OrderedChoice {
            alternatives,
            pos: c.pos,
        }
        .into())
    }

    fn rewrite_sequence(
        &mut self,
        s: Sequence,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let len = s.len();
        let mut elements = s
            .elements
            .into_iter()
            .enumerate()
            .map(|(i, e)| self.rewrite_element(e, pos.element(i, len), analyzer))
            .collect::<PackratResult<Vec<_>>>()?;

        for i in (0..elements.len()).rev() {
            if !switchable(&elements[i]) {
                continue;
            }
            let rest = Sequence::new(elements.split_off(i + 1)).with_pos(s.pos);
            if let Some(Element::CharClass(k)) = elements.pop() {
                let sw = CharSwitch::from_class(k, rest.into());
                elements.push(Element::CharSwitch(sw));
                trace!(self.verbose, "[Creating char switch in {}]", self.current);
            }
        }

        Ok(Sequence {
            name: s.name,
            elements,
            pos: s.pos,
        }
        .into())
    }

    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        if e.is_predicate() {
            return Ok(e);
        }
        walk_element(self, e, pos, analyzer)
    }
}

impl Visitor for TerminalOptimizer {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        self.current = prod.borrow().qualified_name();
        rewrite_production(self, prod, analyzer)?;
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::{CharClass, CharRange, Type};

    fn digits() -> Element {
        Element::CharClass(CharClass::new(false, vec![CharRange::new('0', '9')]))
    }

    fn optimized(alternatives: Vec<Vec<Element>>) -> Vec<Sequence> {
        let mut ctx = context(vec![prod("P", Type::Void, alternatives)]);
        run::<TerminalOptimizer>(&mut ctx);
        get(&ctx, "P").borrow().choice.alternatives.clone()
    }

    #[test]
    fn dispatches_on_leading_characters() {
        let alts = optimized(vec![
            vec![lit('a'), lit('b')],
            vec![lit('c'), lit('d')],
            vec![text("xy")],
            vec![nt("Other")],
        ]);
        assert_eq!(alts.len(), 2);
        let [Element::CharSwitch(sw)] = alts[0].elements.as_slice() else {
            panic!("expected a switch, found {}", alts[0]);
        };
        assert_eq!(sw.cases.len(), 3);
        assert_eq!(sw.cases[0].klass, CharClass::single('a'));
        assert_eq!(sw.cases[2].klass, CharClass::single('x'));
        assert!(sw.base.is_none());
        assert_eq!(alts[1].to_string(), "(Other)");
    }

    #[test]
    fn shares_common_leading_characters() {
        let alts = optimized(vec![vec![text("ab")], vec![text("ac")]]);
        assert_eq!(alts.len(), 1);
        let [Element::CharClass(a), Element::CharSwitch(sw)] =
            alts[0].elements.as_slice()
        else {
            panic!("expected a shared prefix, found {}", alts[0]);
        };
        assert_eq!(*a, CharClass::single('a'));
        assert_eq!(sw.cases.len(), 2);
    }

    #[test]
    fn small_classes_become_switches() {
        let alts = optimized(vec![vec![digits(), lit('x')]]);
        let [Element::CharSwitch(sw)] = alts[0].elements.as_slice() else {
            panic!("expected a switch, found {}", alts[0]);
        };
        assert_eq!(sw.cases.len(), 1);
        assert_eq!(sw.cases[0].element.as_deref().map(ToString::to_string), Some("('x')".to_string()));
    }

    #[test]
    fn predicates_are_left_alone() {
        let pred = Element::FollowedBy(Box::new(Element::sequence(vec![digits(), lit('x')])));
        let alts = optimized(vec![vec![pred.clone(), nt("X")]]);
        assert_eq!(alts[0].elements[0], pred);
    }
}
