use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{
    self as ir, Analyzer, BindingRef, Element, GenericKind, GenericValue,
    OrderedChoice, Production, RRC, Sequence, TransformOracle, Type,
};
use packrat_utils::{Id, PackratResult};
use std::mem;
use std::rc::Rc;

/// Marker of the variables bound by the generifier.
const MARKER: &str = "g";

/// Whether the production creates generic nodes, either directly or
/// through a transformed left recursion.
pub fn is_generic(p: &Production) -> bool {
    p.props.generic.is_some() || p.ty.is_generic_node()
}

/// Whether each alternative of the production creates one generic node.
/// Generic productions that the oracle considers transformable are left to
/// the left-recursion transformation instead.
pub fn is_generic_node(p: &Production, oracle: &dyn TransformOracle) -> bool {
    match p.props.generic {
        Some(kind) => kind == GenericKind::Node,
        None => p.ty.is_generic_node() && !oracle.is_transformable(p),
    }
}

/// Adds the semantic values of generic productions.
///
/// Every alternative of a generic node production that does not set its
/// own value gets a generic node value. The node's children are the values
/// of the alternative's components: repetitions, options, string matches,
/// literals, null literals, parse tree nodes, and references to productions
/// that are not void are bound to fresh variables for this purpose;
/// existing bindings are used as they are. Characters, predicates, and
/// voided elements do not contribute. A node marker names the node;
/// otherwise it is named after the production.
pub struct Generifier {
    oracle: Rc<dyn TransformOracle>,
    verbose: bool,
    /// The qualified name of the production being processed.
    current: Id,
    children: Vec<BindingRef>,
    markers: Vec<Id>,
}

impl ConstructVisitor for Generifier {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(Generifier {
            oracle: Rc::clone(&ctx.oracle),
            verbose: ctx.config.verbose(),
            current: Id::default(),
            children: Vec::new(),
            markers: Vec::new(),
        })
    }

    fn clear_data(&mut self) {
        self.children.clear();
        self.markers.clear();
    }
}

impl Named for Generifier {
    fn name() -> &'static str {
        "generifier"
    }

    fn description() -> &'static str {
        "add generic node values to generic productions"
    }
}

impl Generifier {
    fn bind(&mut self, e: Element, analyzer: &mut Analyzer) -> Element {
        let binding = ir::Binding::new(analyzer.variable_with(MARKER), e);
        self.children.push(binding.to_ref());
        binding.into()
    }

    fn choice(
        &mut self,
        mut c: OrderedChoice,
        analyzer: &mut Analyzer,
    ) -> PackratResult<OrderedChoice> {
        let alternatives = mem::take(&mut c.alternatives);
        for alt in alternatives {
            let alt = Element::Sequence(alt);
            let alt = if Analyzer::sets_value(&alt, true) {
                Sequence::ensure(alt)
            } else {
                self.sequence(Sequence::ensure(alt), analyzer)?
            };
            c.alternatives.push(alt);
        }
        Ok(c)
    }

    fn sequence(
        &mut self,
        mut s: Sequence,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Sequence> {
        let base = self.children.len();
        let base2 = self.markers.len();

        let elements = mem::take(&mut s.elements);
        for e in elements {
            let e = self.element(e, analyzer)?;
            s.elements.push(e);
        }

        if !s.has_trailing_choice() {
            let name = match self.markers.last() {
                Some(marker) => match self.current.qualifier() {
                    Some(module) => marker.qualify(module),
                    None => *marker,
                },
                None => self.current,
            };
            s.add(Element::GenericNodeValue(GenericValue {
                name,
                children: self.children.clone(),
                formatting: Vec::new(),
            }));
        }

        self.children.truncate(base);
        self.markers.truncate(base2);
        Ok(s)
    }

    fn element(
        &mut self,
        e: Element,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        Ok(match e {
            Element::Choice(c) => self.choice(c, analyzer)?.into(),
            Element::Repetition { .. }
            | Element::Optional(_)
            | Element::StringMatch(_)
            | Element::StringLiteral(_)
            | Element::ParseTreeNode { .. }
            | Element::NullLiteral => self.bind(e, analyzer),
            Element::Binding(ref b) => {
                self.children.push(b.to_ref());
                e
            }
            Element::NonTerminal(nt) => {
                if analyzer.type_of(&e)?.is_void() {
                    e
                } else {
                    self.bind(Element::NonTerminal(nt), analyzer)
                }
            }
            Element::NodeMarker(marker) => {
                self.markers.push(marker);
                e
            }
            e => e,
        })
    }
}

impl Visitor for Generifier {
    fn production(
        &mut self,
        prod: &RRC<Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        if !is_generic_node(&prod.borrow(), self.oracle.as_ref()) {
            return Ok(Action::Continue);
        }
        self.current = prod.borrow().qualified_name();
        let choice = mem::take(&mut prod.borrow_mut().choice);
        let choice = self.choice(choice, analyzer)?;

        let mut p = prod.borrow_mut();
        p.choice = choice;
        if p.ty == Type::Generic {
            p.ty = Type::Node;
        }
        trace!(self.verbose, "[Recognizing {} as generic node]", self.current);
        p.props.generic = Some(GenericKind::Node);
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::VALUE;

    #[test]
    fn adds_generic_node_values() {
        let mut ctx = context(vec![
            prod(
                "Sum",
                Type::Generic,
                vec![
                    vec![nt("Term"), lit('+'), nt("Spacing"), nt("Term")],
                    vec![Element::NodeMarker(id("Neg")), lit('-'), nt("Term")],
                    vec![bind(VALUE, nt("Term"))],
                ],
            ),
            prod("Term", Type::Node, vec![vec![lit('x')]]),
            prod("Spacing", Type::Void, vec![vec![Element::star(lit(' '))]]),
        ]);
        run::<Generifier>(&mut ctx);
        let sum = get(&ctx, "Sum");
        assert_eq!(sum.borrow().ty, Type::Node);
        assert_eq!(sum.borrow().props.generic, Some(GenericKind::Node));
        assert_eq!(
            alts(&ctx, "Sum"),
            vec![
                "(v$g$1:Term '+' Spacing v$g$2:Term GenericNodeValue(Sum, [v$g$1, v$g$2], []))",
                "(@Neg '-' v$g$3:Term GenericNodeValue(Neg, [v$g$3], []))",
                "(yyValue:Term)",
            ]
        );
    }

    #[test]
    fn trailing_choices_share_children() {
        let mut ctx = context(vec![
            prod(
                "Call",
                Type::Generic,
                vec![vec![
                    bind("f", nt("Name")),
                    choice(vec![vec![lit('('), Element::Optional(Box::new(nt("Name"))), lit(')')], vec![]]),
                ]],
            ),
            prod("Name", Type::String, vec![vec![Element::plus(Element::AnyChar)]]),
        ]);
        run::<Generifier>(&mut ctx);
        assert_eq!(
            alts(&ctx, "Call"),
            vec![
                "(f:Name ('(' v$g$1:Name? ')' GenericNodeValue(Call, [f, v$g$1], []) / GenericNodeValue(Call, [f], [])))"
            ]
        );
    }
}
