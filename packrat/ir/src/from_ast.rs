//! Lowering the serialized grammar into the IR.
use crate::ast::{self, ActionDef, ElementDef, ProductionKindDef};
use crate::{
    Action, Analyzer, Attribute, Attributes, CharClass, DependencyKind,
    Element, Grammar, Module, ModuleDependency, OrderedChoice, Production,
    ProductionKind, Props, Sequence, Type, rrc,
};
use packrat_utils::{Error, FileIdx, GPosIdx, Id, PackratResult};

/// Build the IR for the grammar. Positions refer to `file`.
pub fn ast_to_ir(grammar: ast::GrammarDef, file: FileIdx) -> PackratResult<Grammar> {
    let builder = Builder { file };
    let modules = grammar
        .modules
        .into_iter()
        .map(|m| builder.module(m))
        .collect::<PackratResult<_>>()?;
    Ok(Grammar::new(modules))
}

/// Parse a declared type as written in the host language.
pub fn parse_type(text: &str) -> Type {
    let text = text.trim();
    if let Some(inner) = generic_argument(text, &["Pair", "List"]) {
        return Type::list(parse_type(inner));
    }
    if let Some(inner) = generic_argument(text, &["Action"]) {
        return Type::Action(Box::new(parse_type(inner)));
    }
    match text {
        "void" => Type::Void,
        "String" => Type::String,
        "Node" | "GNode" => Type::Node,
        "generic" => Type::Generic,
        "Token" => Type::Token,
        "char" | "Character" => Type::Char,
        "Object" => Type::Any,
        "?" => Type::Wildcard,
        other => Type::Named(Id::new(other)),
    }
}

fn generic_argument<'a>(text: &'a str, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        text.strip_prefix(name)?
            .strip_prefix('<')?
            .strip_suffix('>')
    })
}

fn attributes(names: &[String]) -> Attributes {
    names.iter().map(|n| Attribute::from_name(n)).collect()
}

fn action(def: ActionDef) -> PackratResult<Action> {
    match def {
        ActionDef::Text(text) => {
            let lines = text.split(['\n', '\r']).count();
            Action::from_text(&text, vec![0; lines])
        }
        ActionDef::Lines { code, indent } => Action::new(code, indent),
    }
}

struct Builder {
    file: FileIdx,
}

impl Builder {
    fn pos(&self, pos: Option<ast::PosDef>) -> GPosIdx {
        match pos {
            Some(p) => GPosIdx::new(self.file, p.line, p.column),
            None => GPosIdx::UNKNOWN,
        }
    }

    fn module(&self, def: ast::ModuleDef) -> PackratResult<Module> {
        let name = Id::new(&def.name);
        let dependencies = def
            .dependencies
            .into_iter()
            .map(|d| {
                let kind = match d.kind {
                    ast::DependencyKindDef::Import => DependencyKind::Import,
                    ast::DependencyKindDef::Instantiate => {
                        DependencyKind::Instantiation
                    }
                    ast::DependencyKindDef::Modify => DependencyKind::Modification,
                };
                ModuleDependency::new(
                    kind,
                    Id::new(d.module),
                    d.arguments.into_iter().map(Id::new).collect(),
                    d.target.map(Id::new),
                )
            })
            .collect();
        let productions = def
            .productions
            .into_iter()
            .map(|p| Ok(rrc(self.production(p)?)))
            .collect::<PackratResult<_>>()?;
        Ok(Module {
            name,
            header: def.header.map(action).transpose()?,
            body: def.body.map(action).transpose()?,
            footer: def.footer.map(action).transpose()?,
            attributes: attributes(&def.attributes),
            dependencies,
            productions,
            root: None,
        })
    }

    fn production(&self, def: ast::ProductionDef) -> PackratResult<Production> {
        let pos = self.pos(def.pos);
        let kind = match def.kind {
            ProductionKindDef::Full => ProductionKind::Full,
            ProductionKindDef::Addition => ProductionKind::AlternativeAddition {
                sequence: Id::new(def.sequence.ok_or_else(|| {
                    Error::malformed_structure(format!(
                        "alternative addition {} without target sequence",
                        def.name
                    ))
                    .with_pos(&pos)
                })?),
                before: def.before,
            },
            ProductionKindDef::Removal => ProductionKind::AlternativeRemoval {
                sequences: def.sequences.into_iter().map(Id::new).collect(),
            },
            ProductionKindDef::Override => ProductionKind::Override {
                complete: def.complete,
            },
        };
        let alternatives = def
            .alternatives
            .into_iter()
            .map(|a| self.alternative(a))
            .collect::<PackratResult<_>>()?;
        Ok(Production {
            kind,
            attributes: attributes(&def.attributes),
            ty: parse_type(&def.ty),
            name: Id::new(&def.name),
            qname: def.qualified_name.map(Id::new),
            choice: Analyzer::strip_choices(
                OrderedChoice::new(alternatives).with_pos(pos),
            ),
            props: Props {
                dtype: Some(def.ty),
                ..Props::default()
            },
            pos,
        })
    }

    fn alternative(&self, def: ast::AlternativeDef) -> PackratResult<Sequence> {
        let elements = def
            .elements
            .into_iter()
            .map(|e| self.element(e))
            .collect::<PackratResult<_>>()?;
        let mut seq = Sequence::new(elements).with_pos(self.pos(def.pos));
        seq.name = def.name.map(Id::new);
        Ok(seq)
    }

    fn boxed(&self, def: ElementDef) -> PackratResult<Box<Element>> {
        Ok(Box::new(self.element(def)?))
    }

    fn element(&self, def: ElementDef) -> PackratResult<Element> {
        Ok(match def {
            ElementDef::Nt(name) => Element::nonterminal(Id::new(name)),
            ElementDef::Choice(alts) => Element::Choice(OrderedChoice::new(
                alts.into_iter()
                    .map(|a| self.alternative(a))
                    .collect::<PackratResult<_>>()?,
            )),
            ElementDef::Seq(elements) => Element::sequence(
                elements
                    .into_iter()
                    .map(|e| self.element(e))
                    .collect::<PackratResult<_>>()?,
            ),
            ElementDef::Star(e) => Element::Repetition {
                once: false,
                element: self.boxed(*e)?,
            },
            ElementDef::Plus(e) => Element::Repetition {
                once: true,
                element: self.boxed(*e)?,
            },
            ElementDef::Opt(e) => Element::Optional(self.boxed(*e)?),
            ElementDef::And(e) => Element::FollowedBy(self.boxed(*e)?),
            ElementDef::Not(e) => Element::NotFollowedBy(self.boxed(*e)?),
            ElementDef::Pred(a) => Element::SemanticPredicate(action(a)?),
            ElementDef::Bind { name, element } => {
                Element::bind(Id::new(name), self.element(*element)?)
            }
            ElementDef::Match { text, element } => {
                Element::string_match(text, self.element(*element)?)
            }
            ElementDef::Void(e) => Element::Voided(self.boxed(*e)?),
            ElementDef::Any => Element::AnyChar,
            ElementDef::Char(c) => Element::CharLiteral(c),
            ElementDef::Class { spec, exclusive } => {
                let mut klass = CharClass::parse(&spec)?;
                klass.exclusive = exclusive;
                Element::CharClass(klass)
            }
            ElementDef::String(text) => Element::StringLiteral(text),
            ElementDef::Action(a) => Element::Action(action(a)?),
            ElementDef::ParserAction(a) => Element::ParserAction(action(a)?),
            ElementDef::Null => Element::NullLiteral,
            ElementDef::NodeMarker(name) => Element::NodeMarker(Id::new(name)),
        })
    }
}
