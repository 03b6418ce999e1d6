use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{
    self as ir, Analyzer, Binding, Element, MetaData, OrderedChoice, RRC,
    Sequence, Type,
};
use packrat_utils::{Error, PackratResult};

/// Records in each production's [MetaData] which temporaries its parser
/// needs and the structure of its nested repetitions and options.
///
/// Requires every production to carry meta-data already.
pub struct MetaDataSetter {
    verbose: bool,
}

impl ConstructVisitor for MetaDataSetter {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(MetaDataSetter {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for MetaDataSetter {
    fn name() -> &'static str {
        "meta-data-setter"
    }

    fn description() -> &'static str {
        "record the temporaries and nesting structure of every production"
    }
}

/// Replace unknown parts of a type by [Type::Any].
fn concretize(t: Type) -> Type {
    match t {
        Type::Wildcard => Type::Any,
        Type::List(t) => Type::list(concretize(*t)),
        Type::Action(t) => Type::Action(Box::new(concretize(*t))),
        t => t,
    }
}

/// The binding capturing the value of a repeated or optional element.
fn bound_in(e: &Element) -> Option<&Binding> {
    match e {
        Element::Sequence(s) => Analyzer::get_binding(&s.elements),
        Element::Binding(b) => Some(b),
        _ => None,
    }
}

/// The state of the walk over one production.
#[derive(Default)]
struct Walk {
    md: MetaData,
    top_level: bool,
    repeated: bool,
    optional: bool,
    first: bool,
    bound: bool,
    predicate: bool,
    not_followed_by: bool,
    last_in_predicate: bool,
    repetition_level: usize,
    option_level: usize,
}

impl Walk {
    fn new(md: MetaData) -> Self {
        Walk {
            md: MetaData {
                repetitions: Vec::new(),
                bound_repetitions: Vec::new(),
                options: Vec::new(),
                ..md
            },
            top_level: true,
            ..Default::default()
        }
    }

    fn in_not_followed_by(&self) -> bool {
        self.predicate && self.not_followed_by
    }

    /// A terminal consuming `len` characters.
    fn terminal(&mut self, len: usize) {
        self.md.requires_char = true;
        if self.predicate {
            if !self.last_in_predicate || len > 1 {
                self.md.requires_pred_index = true;
            }
        } else {
            self.md.requires_index = true;
        }
    }

    fn choice(
        &mut self,
        c: &OrderedChoice,
        analyzer: &Analyzer,
    ) -> PackratResult<()> {
        let top = self.top_level;
        self.top_level = false;
        for alt in &c.alternatives {
            if top {
                self.first = true;
            }
            self.sequence(alt, analyzer)?;
        }
        Ok(())
    }

    fn sequence(&mut self, s: &Sequence, analyzer: &Analyzer) -> PackratResult<()> {
        self.top_level = false;
        let repeated = std::mem::take(&mut self.repeated);
        let optional = std::mem::take(&mut self.optional);
        self.bound = false;
        let size = s.len();
        for (i, e) in s.elements.iter().enumerate() {
            self.last_in_predicate =
                self.predicate && !repeated && !optional && i + 1 == size;
            self.element(e, analyzer)?;
        }
        self.repeated = repeated;
        self.optional = optional;
        Ok(())
    }

    /// Unify the type bound inside a repeated or optional element into
    /// `slot`.
    fn unify_bound(
        slot: &mut Option<Type>,
        e: &Element,
        analyzer: &Analyzer,
    ) -> PackratResult<()> {
        let Some(b) = bound_in(e) else {
            return Err(Error::pass_assumption(
                MetaDataSetter::name(),
                format!("bound repetition or option without binding: {e}"),
            ));
        };
        let t = analyzer.type_of(&b.element)?;
        let current = slot.take().unwrap_or(Type::Wildcard);
        *slot = current.unify(&t, false);
        Ok(())
    }

    fn element(&mut self, e: &Element, analyzer: &Analyzer) -> PackratResult<()> {
        match e {
            Element::Choice(c) => self.choice(c, analyzer)?,
            Element::Sequence(s) => self.sequence(s, analyzer)?,
            Element::Repetition { once, element } => {
                self.top_level = false;
                let repeated = std::mem::replace(&mut self.repeated, true);
                let optional = std::mem::take(&mut self.optional);
                self.first = false;
                let bound = std::mem::take(&mut self.bound);
                self.repetition_level += 1;
                let level = self.repetition_level - 1;
                if self.md.repetitions.len() <= level {
                    self.md.repetitions.push(false);
                    self.md.bound_repetitions.push(None);
                }
                if *once {
                    self.md.repetitions[level] = true;
                }
                if bound {
                    Self::unify_bound(
                        &mut self.md.bound_repetitions[level],
                        element,
                        analyzer,
                    )?;
                }
                self.element(element, analyzer)?;
                self.repeated = repeated;
                self.optional = optional;
                self.repetition_level -= 1;
            }
            Element::Optional(element) => {
                self.top_level = false;
                let repeated = std::mem::take(&mut self.repeated);
                let optional = std::mem::take(&mut self.optional);
                self.first = false;
                let bound = std::mem::take(&mut self.bound);
                self.option_level += 1;
                let level = self.option_level - 1;
                if self.md.options.len() <= level {
                    self.md.options.push(None);
                }
                if bound {
                    Self::unify_bound(&mut self.md.options[level], element, analyzer)?;
                }
                self.element(element, analyzer)?;
                self.repeated = repeated;
                self.optional = optional;
                self.option_level -= 1;
            }
            Element::FollowedBy(element) | Element::NotFollowedBy(element) => {
                self.top_level = false;
                self.bound = false;
                let not = matches!(e, Element::NotFollowedBy(_));
                if not {
                    self.md.requires_pred_match = true;
                }
                let first = self.first;
                self.predicate = true;
                self.not_followed_by = not;
                self.element(element, analyzer)?;
                self.predicate = false;
                self.first = first;
            }
            Element::Voided(element) => {
                self.top_level = false;
                self.bound = false;
                self.element(element, analyzer)?;
            }
            Element::Binding(b) => {
                self.top_level = false;
                self.bound = true;
                self.element(&b.element, analyzer)?;
            }
            Element::StringMatch(m) => {
                self.top_level = false;
                self.bound = false;
                if !self.in_not_followed_by() {
                    self.md.requires_base_index = true;
                }
                self.first = false;
                self.element(&m.element, analyzer)?;
            }
            Element::NonTerminal(_) => {
                self.top_level = false;
                self.first = false;
                self.bound = false;
                if self.predicate {
                    self.md.requires_pred_result = true;
                } else {
                    self.md.requires_result = true;
                }
            }
            Element::StringLiteral(text) => {
                self.top_level = false;
                self.bound = false;
                if !self.in_not_followed_by() {
                    self.md.requires_base_index = true;
                }
                self.first = false;
                self.terminal(text.chars().count());
            }
            Element::AnyChar | Element::CharLiteral(_) | Element::CharClass(_) => {
                self.top_level = false;
                self.first = false;
                self.bound = false;
                self.terminal(1);
            }
            Element::CharSwitch(sw) => {
                self.top_level = false;
                self.first = false;
                self.bound = false;
                self.terminal(1);
                let cases = sw.cases.iter().filter_map(|k| k.element.as_deref());
                for e in cases.chain(sw.base.as_deref()) {
                    self.element(e, analyzer)?;
                }
            }
            Element::ParserAction(_) => {
                self.top_level = false;
                self.first = false;
                self.bound = false;
                self.md.requires_base_index = true;
            }
            _ => {
                self.top_level = false;
                self.bound = false;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> MetaData {
        for t in self.md.bound_repetitions.iter_mut() {
            if let Some(ty) = t.take() {
                *t = Some(Type::list(concretize(ty)));
            }
        }
        for t in self.md.options.iter_mut() {
            if let Some(ty) = t.take() {
                *t = Some(concretize(ty));
            }
        }
        self.md
    }
}

impl Visitor for MetaDataSetter {
    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        analyzer: &mut Analyzer,
    ) -> VisResult {
        let md = {
            let p = prod.borrow();
            let Some(md) = p.props.meta_data.clone() else {
                return Err(Error::pass_assumption(
                    Self::name(),
                    format!("production {} has no meta-data", p.qualified_name()),
                ));
            };
            let mut walk = Walk::new(md);
            walk.choice(&p.choice, analyzer)?;
            walk.finish()
        };
        let mut p = prod.borrow_mut();
        trace!(
            self.verbose,
            "[Meta-data of {}: {} repetitions, {} options]",
            p.qualified_name(),
            md.repetitions.len(),
            md.options.len()
        );
        p.props.meta_data = Some(md);
        Ok(Action::Continue)
    }
}
