use super::{DeadProductionEliminator, Simplifier, is_generic};
use crate::traversal::{
    Action, ConstructVisitor, Named, ParseVal, PassOpt, VisResult, Visitor,
};
use packrat_ir::{
    self as ir, Analyzer, Attributes, Element, OrderedChoice, RRC, Sequence,
    TransformOracle, VALUE, is_recursive,
};
use packrat_utils::{Id, PackratResult};
use std::rc::Rc;

/// Reduces the grammar to the shape of the abstract syntax trees it builds.
///
/// Voided elements, semantic predicates, value elements, and actions that
/// do not set the semantic value are removed, as are references to void
/// productions. Bindings are replaced by their elements, except for the
/// bindings of a generic production's value. Productions that neither
/// build generic nodes, lists, text, or tokens keep only their bindings
/// and value-setting actions. Unless `keep-lexical` is set, text-only and
/// token productions lose their bodies and are marked as redacted. Every
/// production's declared type becomes its `dtype`, and the resulting
/// grammar is simplified and stripped of unreachable productions and of all
/// attributes.
pub struct TreeExtractor {
    oracle: Rc<dyn TransformOracle>,
    keep_lexical: bool,
    simplifier: Simplifier,
    eliminator: DeadProductionEliminator,
    /// Classification of the production being extracted.
    generic: bool,
    list: bool,
    text_only: bool,
    token: bool,
    sets_value: bool,
}

impl ConstructVisitor for TreeExtractor {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        let opts = Self::get_opts(ctx)?;
        Ok(TreeExtractor {
            oracle: Rc::clone(&ctx.oracle),
            keep_lexical: opts["keep-lexical"].bool()?,
            simplifier: <Simplifier as ConstructVisitor>::from(ctx)?,
            eliminator: <DeadProductionEliminator as ConstructVisitor>::from(ctx)?,
            generic: false,
            list: false,
            text_only: false,
            token: false,
            sets_value: false,
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for TreeExtractor {
    fn name() -> &'static str {
        "tree-extractor"
    }

    fn description() -> &'static str {
        "reduce the grammar to the shape of its abstract syntax trees"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "keep-lexical",
            "keep the bodies of text-only and token productions",
            ParseVal::Bool(false),
            PassOpt::parse_bool,
        )]
    }
}

impl TreeExtractor {
    fn sequence(
        &mut self,
        s: &mut Sequence,
        analyzer: &Analyzer,
    ) -> PackratResult<()> {
        s.name = None;
        let len = s.elements.len();
        for (i, e) in std::mem::take(&mut s.elements).into_iter().enumerate() {
            let e = match e {
                Element::Choice(c) if i + 1 == len => {
                    s.elements.push(self.element(c.into(), analyzer)?);
                    continue;
                }
                Element::Voided(_) | Element::SemanticPredicate(_) => continue,
                e if e.is_value() => continue,
                Element::Action(mut a) => {
                    if a.sets_value() {
                        self.sets_value = true;
                        a.code = vec![format!("{VALUE} = ...")];
                        a.indent = vec![0];
                        s.elements.push(Element::Action(a));
                    }
                    continue;
                }
                Element::Binding(b)
                    if !self.generic || b.name.as_str() != VALUE =>
                {
                    *b.element
                }
                e @ Element::Binding(_) => e,
                _ if !self.generic
                    && !self.list
                    && !self.text_only
                    && !self.token =>
                {
                    continue;
                }
                e => e,
            };
            if let Element::NonTerminal(nt) = &e {
                if analyzer.lookup(nt.name)?.borrow().ty.is_void() {
                    continue;
                }
            }
            s.elements.push(self.element(e, analyzer)?);
        }
        Ok(())
    }

    fn element(
        &mut self,
        e: Element,
        analyzer: &Analyzer,
    ) -> PackratResult<Element> {
        Ok(match e {
            Element::Choice(mut c) => {
                for alt in &mut c.alternatives {
                    self.sequence(alt, analyzer)?;
                }
                c.into()
            }
            Element::Sequence(mut s) => {
                self.sequence(&mut s, analyzer)?;
                s.into()
            }
            Element::CharSwitch(mut sw) => {
                let cases = sw.cases.iter_mut().map(|k| &mut k.element);
                for slot in cases.chain(std::iter::once(&mut sw.base)) {
                    if let Some(e) = slot.take() {
                        *slot = Some(Box::new(self.element(*e, analyzer)?));
                    }
                }
                Element::CharSwitch(sw)
            }
            mut e => {
                if let Some(child) = e.unary_child_mut() {
                    let operand = std::mem::replace(child, Element::NullLiteral);
                    let operand = self.element(operand, analyzer)?;
                    *child = Analyzer::strip(&operand).clone();
                }
                e
            }
        })
    }

    /// The declared type as shown in the tree view.
    fn dtype(&self, ty: &ir::Type) -> String {
        if self.generic {
            "define<Node>".to_string()
        } else if self.text_only {
            "define<String>".to_string()
        } else if self.token {
            "define<Token>".to_string()
        } else if self.list || self.sets_value {
            format!("define<{ty}>")
        } else {
            format!("expand<{ty}>")
        }
    }
}

impl Visitor for TreeExtractor {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let mut choice = {
            let mut p = prod.borrow_mut();
            self.generic = is_generic(&p);
            self.list = p.ty.is_list();
            self.text_only = p.props.text_only;
            self.token = p.props.token;
            self.sets_value = false;

            if self.generic && self.oracle.is_transformable(&p) {
                let mut choice = std::mem::take(&mut p.choice);
                for alt in &mut choice.alternatives {
                    if is_recursive(alt, &p) {
                        continue;
                    }
                    if let Some(b) = analyzer.bind(&mut alt.elements, None) {
                        for e in &mut alt.elements {
                            e.rename_binding(b.id, Id::new(VALUE));
                        }
                    }
                }
                p.choice = choice;
            }

            if (self.text_only || self.token) && !self.keep_lexical {
                p.choice = OrderedChoice::new(vec![Sequence::default()]);
                p.props.redacted = true;
                p.props.dtype = Some(self.dtype(&p.ty));
                return Ok(Action::Continue);
            }
            std::mem::take(&mut p.choice)
        };

        // The production stays unborrowed while its alternatives are
        // reduced, since they may refer to it.
        let res = choice
            .alternatives
            .iter_mut()
            .try_for_each(|alt| self.sequence(alt, analyzer));
        let mut p = prod.borrow_mut();
        p.choice = choice;
        res?;
        p.props.dtype = Some(self.dtype(&p.ty));
        Ok(Action::Continue)
    }

    fn finish(
        &mut self,
        module: &mut ir::Module,
        _analyzer: &mut Analyzer,
    ) -> VisResult {
        self.simplifier.traverse_module(module)?;
        self.simplifier.clear_data();
        self.eliminator.traverse_module(module)?;
        module.header = None;
        module.body = None;
        module.footer = None;
        module.attributes = Attributes::default();
        for prod in &module.productions {
            prod.borrow_mut().attributes = Attributes::default();
        }
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use ir::{Attribute, Type};

    fn action(code: &str) -> Element {
        let action = ir::Action::new(vec![code.to_string()], vec![0]).unwrap();
        Element::Action(action)
    }

    #[test]
    fn reduces_generic_productions_to_their_shape() {
        let mut ctx = context(vec![
            public(prod(
                "Expr",
                Type::Generic,
                vec![vec![
                    bind("l", nt("Term")),
                    Element::Voided(Box::new(lit('+'))),
                    nt("Spacing"),
                    bind("r", nt("Number")),
                    Element::NullValue,
                ]],
            )),
            prod("Term", Type::Node, vec![vec![nt("Number")]]),
            prod("Number", Type::String, vec![vec![text("1")]]),
            prod("Spacing", Type::Void, vec![vec![lit(' ')]]),
        ]);
        get(&ctx, "Number").borrow_mut().props.text_only = true;
        run::<TreeExtractor>(&mut ctx);

        assert_eq!(alts(&ctx, "Expr"), vec!["(Term Number)"]);
        // Term neither sets a value nor builds a node of its own.
        assert_eq!(alts(&ctx, "Term"), vec!["()"]);
        assert!(!has(&ctx, "Spacing"));
        let number = get(&ctx, "Number");
        assert!(number.borrow().props.redacted);
        assert_eq!(number.borrow().props.dtype.as_deref(), Some("define<String>"));
        assert_eq!(
            get(&ctx, "Expr").borrow().props.dtype.as_deref(),
            Some("define<Node>")
        );
        assert!(!get(&ctx, "Expr").borrow().has_attribute(Attribute::Public));
    }

    #[test]
    fn keeps_value_setting_actions() {
        let mut ctx = context(vec![
            public(prod(
                "P",
                Type::Node,
                vec![vec![
                    bind("x", nt("Q")),
                    action("count++;"),
                    action("yyValue = make(x);"),
                ]],
            )),
            prod("Q", Type::Node, vec![vec![lit('q'), Element::NullValue]]),
        ]);
        run::<TreeExtractor>(&mut ctx);
        let prod = get(&ctx, "P");
        let p = prod.borrow();
        let alternatives = &p.choice.alternatives;
        assert_eq!(alternatives[0].elements.len(), 2);
        let Element::Action(a) = &alternatives[0].elements[1] else {
            panic!("expected an action, found {}", alternatives[0]);
        };
        assert_eq!(a.code, vec!["yyValue = ..."]);
        assert_eq!(p.props.dtype.as_deref(), Some("define<Node>"));
        assert_eq!(
            get(&ctx, "Q").borrow().props.dtype.as_deref(),
            Some("expand<Node>")
        );
    }

    #[test]
    fn lexical_bodies_can_be_kept() {
        let mut ctx = context(vec![
            public(prod(
                "Word",
                Type::String,
                vec![vec![Element::plus(nt("Letter"))]],
            )),
            prod("Letter", Type::String, vec![vec![lit('a')]]),
        ]);
        get(&ctx, "Word").borrow_mut().props.text_only = true;
        ctx.extra_opts = vec!["tree-extractor:keep-lexical".to_string()];
        run::<TreeExtractor>(&mut ctx);
        assert_eq!(alts(&ctx, "Word"), vec!["(Letter+)"]);
        assert!(!get(&ctx, "Word").borrow().props.redacted);
    }

    #[test]
    fn malformed_flags_are_rejected() {
        let mut ctx = context(vec![public(prod("P", Type::Void, vec![vec![lit('p')]]))]);
        ctx.extra_opts = vec!["tree-extractor:keep-lexical=maybe".to_string()];
        assert!(TreeExtractor::do_pass_default(&mut ctx).is_err());
    }

    #[test]
    fn removes_productions_that_become_unreachable() {
        let mut ctx = context(vec![
            public(prod(
                "P",
                Type::list(Type::Node),
                vec![vec![nt("Q"), nt("V")]],
            )),
            prod("Q", Type::Node, vec![vec![lit('q'), Element::NullValue]]),
            prod("V", Type::Void, vec![vec![lit('v')]]),
        ]);
        run::<TreeExtractor>(&mut ctx);
        assert_eq!(alts(&ctx, "P"), vec!["(Q)"]);
        assert!(!has(&ctx, "V"));
    }
}
