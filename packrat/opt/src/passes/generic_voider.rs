use crate::traversal::{
    Action, ConstructVisitor, DiagnosticContext, DiagnosticPass, Named,
    Position, Rewriter, VisResult, Visitor, rewrite_production, walk_element,
};
use packrat_ir::{self as ir, Analyzer, Attribute, Element, Type, VALUE};
use packrat_utils::{Error, PackratResult};

/// Voids all node-valued productions of modules marked `genericAsVoid`.
///
/// Productions of type node or list of node become void. A binding to the
/// value variable of such a production that is itself voided is replaced by
/// the bare nonterminal; every other binding or string match of a voided
/// nonterminal is an error, since its value no longer exists.
pub struct GenericVoider {
    /// Whether the production being rewritten was voided.
    current_voided: bool,
    diag: DiagnosticContext,
}

impl ConstructVisitor for GenericVoider {
    fn from(_ctx: &ir::Context) -> PackratResult<Self> {
        Ok(GenericVoider {
            current_voided: false,
            diag: DiagnosticContext::default(),
        })
    }

    fn clear_data(&mut self) {
        self.current_voided = false;
    }
}

impl Named for GenericVoider {
    fn name() -> &'static str {
        "generic-voider"
    }

    fn description() -> &'static str {
        "void node-valued productions in modules with the genericAsVoid attribute"
    }
}

impl DiagnosticPass for GenericVoider {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

fn is_node_valued(ty: &Type) -> bool {
    ty.is_node() || (ty.is_list() && ty.argument().is_some_and(Type::is_node))
}

impl GenericVoider {
    /// Check a binding or string match after its operand was rewritten.
    fn check(&mut self, e: Element, analyzer: &Analyzer) -> Element {
        let Some(Element::NonTerminal(nt)) =
            e.unary_child().map(Analyzer::strip)
        else {
            return e;
        };
        let nt = *nt;
        let voided = analyzer
            .lookup(nt.name)
            .is_ok_and(|p| p.try_borrow().is_ok_and(|p| p.props.voided));
        if !voided {
            return e;
        }
        match &e {
            Element::StringMatch(_) => {
                self.diag.err(
                    Error::malformed_structure(format!(
                        "string match for now voided nonterminal '{}'",
                        nt.name
                    ))
                    .with_pos(&e),
                );
                e
            }
            Element::Binding(b)
                if b.name.as_str() == VALUE && self.current_voided =>
            {
                Element::NonTerminal(nt)
            }
            _ => {
                self.diag.err(
                    Error::malformed_structure(format!(
                        "binding for now voided nonterminal '{}'",
                        nt.name
                    ))
                    .with_pos(&e),
                );
                e
            }
        }
    }
}

impl Rewriter for GenericVoider {
    fn rewrite_element(
        &mut self,
        e: Element,
        pos: Position,
        analyzer: &mut Analyzer,
    ) -> PackratResult<Element> {
        let e = walk_element(self, e, pos, analyzer)?;
        Ok(match e {
            Element::Binding(_) | Element::StringMatch(_) => {
                self.check(e, analyzer)
            }
            e => e,
        })
    }
}

impl Visitor for GenericVoider {
    fn start(
        &mut self,
        module: &mut ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        if !module.has_attribute(Attribute::GenericAsVoid) {
            return Ok(Action::Stop);
        }
        for prod in &module.productions {
            let mut p = prod.borrow_mut();
            if is_node_valued(&p.ty) {
                p.ty = Type::Void;
                p.props.voided = true;
            }
        }
        for prod in &module.productions {
            if !prod.borrow().is_full() {
                continue;
            }
            analyzer.process(&prod.borrow());
            self.current_voided = prod.borrow().props.voided;
            rewrite_production(self, prod, analyzer)?;
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;

    #[test]
    fn voids_node_productions() {
        let mut ctx = context(vec![
            prod("A", Type::Node, vec![vec![bind(VALUE, nt("B"))]]),
            prod("B", Type::Generic, vec![vec![lit('b')]]),
            prod("L", Type::list(Type::Node), vec![vec![nt("B")]]),
            prod("S", Type::String, vec![vec![nt("A")]]),
        ]);
        ctx.grammar.modules[0]
            .attributes
            .insert(Attribute::GenericAsVoid);
        let pass = run::<GenericVoider>(&mut ctx);
        assert!(!pass.diagnostics().has_errors());
        assert!(get(&ctx, "A").borrow().ty.is_void());
        assert!(get(&ctx, "L").borrow().props.voided);
        assert!(get(&ctx, "S").borrow().ty.is_string());
        assert_eq!(alts(&ctx, "A"), vec!["(B)"]);
    }

    #[test]
    fn reports_bindings_of_voided_productions() {
        let mut ctx = context(vec![
            prod("S", Type::String, vec![vec![bind("x", nt("B"))]]),
            prod(
                "T",
                Type::String,
                vec![vec![Element::string_match("b", nt("B"))]],
            ),
            prod("B", Type::Node, vec![vec![lit('b')]]),
        ]);
        ctx.grammar.modules[0]
            .attributes
            .insert(Attribute::GenericAsVoid);
        let pass = run::<GenericVoider>(&mut ctx);
        assert_eq!(pass.diagnostics().errors_iter().count(), 2);
    }

    #[test]
    fn leaves_other_modules_alone() {
        let mut ctx = context(vec![prod("B", Type::Node, vec![vec![lit('b')]])]);
        run::<GenericVoider>(&mut ctx);
        assert!(get(&ctx, "B").borrow().ty.is_node());
    }
}
