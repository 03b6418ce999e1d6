use crate::traversal::{
    Action, ConstructVisitor, DiagnosticContext, DiagnosticPass, Named,
    VisResult, Visitor,
};
use packrat_ir::{
    self as ir, Analyzer, Binding, BindingRef, Element, RRC, Sequence, Type,
    VALUE,
};
use packrat_utils::{Error, GPosIdx, Id, PackratResult};

/// Marker of the variables bound by this pass.
const MARKER: &str = "l";

/// Adds the value element building the list to every alternative of a
/// list-valued production that does not set its value yet.
///
/// All bindable elements of such an alternative are bound. Without
/// bindings, the value is the empty list. A single list-valued binding is
/// passed through. Otherwise, the bound elements are collected into a
/// proper list whose tail is the last binding if that binding is a list
/// itself. With `optionVariant`, lists of generic nodes get their element
/// type from the unification of all bound elements.
pub struct ListMaker {
    diag: DiagnosticContext,
    variant: bool,
    /// Declared type of the production being processed.
    ty: Type,
    /// Unified element type of the production being processed, if it is
    /// inferred and consistent so far.
    element: Option<Type>,
}

impl ConstructVisitor for ListMaker {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(ListMaker {
            diag: DiagnosticContext::default(),
            variant: ctx.config.option_variant,
            ty: Type::Void,
            element: None,
        })
    }

    fn clear_data(&mut self) {
        self.element = None;
    }
}

impl Named for ListMaker {
    fn name() -> &'static str {
        "list-maker"
    }

    fn description() -> &'static str {
        "add the value elements of list-valued productions"
    }
}

impl DiagnosticPass for ListMaker {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

impl ListMaker {
    /// Process the alternative `s`, whose enclosing alternatives contribute
    /// the elements on `stack`.
    fn sequence(
        &mut self,
        s: &mut Sequence,
        stack: &mut Vec<Element>,
        analyzer: &mut Analyzer,
    ) -> PackratResult<()> {
        let base = stack.len();
        let trailing = if s.has_trailing_choice() {
            s.elements.pop()
        } else {
            None
        };
        stack.append(&mut s.elements);

        let last = match trailing {
            Some(Element::Choice(mut c)) => {
                for alt in &mut c.alternatives {
                    self.sequence(alt, stack, analyzer)?;
                }
                Some(Element::Choice(c))
            }
            _ => {
                let elements: Vec<&Element> = stack.iter().collect();
                if Analyzer::elements_set_value(&elements, false) {
                    None
                } else {
                    self.value(stack, s.pos, analyzer)?
                }
            }
        };

        s.elements.extend(stack.drain(base..));
        s.elements.extend(last);
        Ok(())
    }

    /// Bind the bindable elements and build the value element.
    fn value(
        &mut self,
        elements: &mut [Element],
        pos: GPosIdx,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Option<Element>> {
        let mut bindings: Vec<(usize, BindingRef, Type)> = Vec::new();
        for i in 0..elements.len() {
            if !matches!(elements[i], Element::Binding(_)) {
                if !analyzer.is_bindable(&elements[i]) {
                    continue;
                }
                let name = analyzer.variable_with(MARKER);
                let e = std::mem::replace(&mut elements[i], Element::NullLiteral);
                elements[i] = Binding::new(name, e).into();
            }
            if let Element::Binding(b) = &elements[i] {
                bindings.push((i, b.to_ref(), analyzer.type_of(&b.element)?));
            }
        }

        if let Some(mut element) = self.element.take() {
            let mut consistent = true;
            for (_, _, t) in &bindings {
                let t = t.argument().filter(|_| t.is_list()).unwrap_or(t);
                match element.unify(t, true) {
                    Some(u) => element = u,
                    None => {
                        self.diag.err(
                            Error::malformed_structure(format!(
                                "unable to determine consistent list element \
                                 type: `{element}' and `{t}'"
                            ))
                            .with_pos(&pos),
                        );
                        consistent = false;
                        break;
                    }
                }
            }
            if consistent {
                self.element = Some(element);
            }
        }

        Ok(match bindings.as_slice() {
            [] => Some(Element::EmptyListValue),
            [(i, b, t)] if t.is_list() => {
                if Analyzer::is_synthetic_variable(b.name) {
                    if let Element::Binding(b) = &mut elements[*i] {
                        b.name = Id::new(VALUE);
                    }
                    None
                } else {
                    Some(Element::BindingValue(*b))
                }
            }
            [init @ .., (_, last, t)] => {
                let (init, tail) = if t.is_list() {
                    (init, Some(*last))
                } else {
                    (bindings.as_slice(), None)
                };
                Some(Element::ProperListValue {
                    ty: self.ty.clone(),
                    elements: init.iter().map(|(_, b, _)| *b).collect(),
                    tail,
                })
            }
        })
    }
}

impl Visitor for ListMaker {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let ty = prod.borrow().ty.clone();
        if !ty.is_list() {
            return Ok(Action::Continue);
        }
        self.element = ty
            .argument()
            .filter(|arg| self.variant && arg.is_generic_node())
            .map(|_| Type::Wildcard);
        self.ty = ty;

        // The choice is taken out so that the production's type can be
        // looked up while its alternatives change.
        let mut choice = std::mem::take(&mut prod.borrow_mut().choice);
        let mut stack = Vec::new();
        let res = choice
            .alternatives
            .iter_mut()
            .try_for_each(|alt| self.sequence(alt, &mut stack, analyzer));
        let mut p = prod.borrow_mut();
        p.choice = choice;
        res?;

        if let Some(element) = self.element.take() {
            let element = match element {
                Type::Wildcard => Type::Node,
                t => t,
            };
            p.ty = Type::list(element);
        }
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;

    fn made(
        prods: Vec<ir::Production>,
        variant: bool,
    ) -> (ir::Context, ListMaker) {
        let mut ctx = context(prods);
        ctx.config.option_variant = variant;
        let pass = run::<ListMaker>(&mut ctx);
        (ctx, pass)
    }

    fn void(e: Element) -> Element {
        Element::Voided(Box::new(e))
    }

    #[test]
    fn builds_list_values() {
        let (ctx, pass) = made(
            vec![
                prod(
                    "Items",
                    Type::list(Type::Node),
                    vec![
                        vec![nt("Item"), void(lit(',')), nt("Items")],
                        vec![nt("Item"), nt("Item")],
                        vec![void(lit(';'))],
                    ],
                ),
                prod("Item", Type::Node, vec![vec![nt("Id")]]),
                prod("Id", Type::Node, vec![vec![lit('i')]]),
            ],
            false,
        );
        assert!(!pass.diagnostics().has_errors());
        assert_eq!(
            alts(&ctx, "Items"),
            vec![
                "(v$l$1:Item void:',' v$l$2:Items \
                 ProperListValue<Pair<Node>>([v$l$1], v$l$2))",
                "(v$l$3:Item v$l$4:Item \
                 ProperListValue<Pair<Node>>([v$l$3, v$l$4]))",
                "(void:';' EmptyListValue)",
            ]
        );
    }

    #[test]
    fn single_lists_pass_through() {
        let (ctx, _) = made(
            vec![
                prod(
                    "Wrapped",
                    Type::list(Type::Node),
                    vec![
                        vec![void(lit('(')), nt("Items"), void(lit(')'))],
                        vec![
                            void(lit('[')),
                            bind("items", nt("Items")),
                            void(lit(']')),
                        ],
                    ],
                ),
                prod(
                    "Items",
                    Type::list(Type::Node),
                    vec![vec![lit('x'), Element::EmptyListValue]],
                ),
            ],
            false,
        );
        assert_eq!(
            alts(&ctx, "Wrapped"),
            vec![
                "(void:'(' yyValue:Items void:')')",
                "(void:'[' items:Items void:']' BindingValue(items))",
            ]
        );
    }

    #[test]
    fn trailing_choices_share_the_prefix_binding() {
        let (ctx, _) = made(
            vec![
                prod(
                    "Items",
                    Type::list(Type::Node),
                    vec![vec![
                        nt("Item"),
                        choice(vec![vec![void(lit(',')), nt("Items")], vec![]]),
                    ]],
                ),
                prod("Item", Type::Node, vec![vec![lit('i'), Element::NullValue]]),
            ],
            false,
        );
        assert_eq!(
            alts(&ctx, "Items"),
            vec![
                "(v$l$1:Item (void:',' v$l$2:Items \
                 ProperListValue<Pair<Node>>([v$l$1], v$l$2) \
                 / ProperListValue<Pair<Node>>([v$l$1])))"
            ]
        );
    }

    #[test]
    fn alternatives_with_values_are_kept() {
        let (ctx, _) = made(
            vec![prod(
                "Items",
                Type::list(Type::Node),
                vec![vec![lit('n'), Element::NullValue]],
            )],
            false,
        );
        assert_eq!(alts(&ctx, "Items"), vec!["('n' NullValue)"]);
    }

    #[test]
    fn infers_generic_element_types() {
        let (ctx, pass) = made(
            vec![
                prod(
                    "Nodes",
                    Type::list(Type::Generic),
                    vec![vec![nt("A"), nt("B")], vec![nt("C")]],
                ),
                prod("A", Type::Generic, vec![vec![lit('a')]]),
                prod("B", Type::Node, vec![vec![lit('b')]]),
                prod("C", Type::list(Type::Token), vec![vec![lit('c')]]),
            ],
            true,
        );
        assert!(!pass.diagnostics().has_errors());
        assert_eq!(get(&ctx, "Nodes").borrow().ty, Type::list(Type::Node));
    }

    #[test]
    fn reports_inconsistent_element_types() {
        let (ctx, pass) = made(
            vec![
                prod(
                    "Nodes",
                    Type::list(Type::Generic),
                    vec![vec![nt("A"), nt("S")]],
                ),
                prod("A", Type::Generic, vec![vec![lit('a')]]),
                prod("S", Type::String, vec![vec![lit('s')]]),
            ],
            true,
        );
        let errors: Vec<_> = pass.diagnostics().errors_iter().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message().contains("consistent list element type"));
        assert_eq!(get(&ctx, "Nodes").borrow().ty, Type::list(Type::Generic));
    }
}
