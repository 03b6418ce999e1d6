//! Builders shared by the unit tests of the passes.
use crate::traversal::{ConstructVisitor, Named, Visitor};
use packrat_ir::{
    Attribute, Config, Context, Element, Grammar, Module, OrderedChoice,
    Production, RRC, Sequence, Type,
};
use packrat_utils::Id;

pub fn id(name: &str) -> Id {
    Id::new(name)
}

pub fn nt(name: &str) -> Element {
    Element::nonterminal(Id::new(name))
}

pub fn lit(c: char) -> Element {
    Element::CharLiteral(c)
}

pub fn text(s: &str) -> Element {
    Element::StringLiteral(s.to_string())
}

pub fn bind(name: &str, e: Element) -> Element {
    Element::bind(Id::new(name), e)
}

pub fn alt(elements: Vec<Element>) -> Sequence {
    Sequence::new(elements)
}

pub fn choice(alts: Vec<Vec<Element>>) -> Element {
    Element::choice(alts.into_iter().map(Sequence::new).collect())
}

pub fn prod(name: &str, ty: Type, alts: Vec<Vec<Element>>) -> Production {
    Production::new(
        Id::new(name),
        ty,
        OrderedChoice::new(alts.into_iter().map(Sequence::new).collect()),
    )
}

pub fn public(p: Production) -> Production {
    p.with_attributes([Attribute::Public])
}

pub fn module(prods: Vec<Production>) -> Module {
    Module::new(Id::new("Test"), prods)
}

pub fn context(prods: Vec<Production>) -> Context {
    Context::new(Grammar::new(vec![module(prods)]), Config::default())
}

/// Run the pass with its default construction.
pub fn run<P>(ctx: &mut Context) -> P
where
    P: Visitor + ConstructVisitor + Named,
{
    P::do_pass_default(ctx).unwrap()
}

pub fn get(ctx: &Context, name: &str) -> RRC<Production> {
    ctx.grammar.modules[0].find(Id::new(name)).unwrap()
}

pub fn has(ctx: &Context, name: &str) -> bool {
    ctx.grammar.modules[0].find(Id::new(name)).is_some()
}

/// The alternatives of a production, one string each.
pub fn alts(ctx: &Context, name: &str) -> Vec<String> {
    get(ctx, name)
        .borrow()
        .choice
        .alternatives
        .iter()
        .map(|alt| alt.to_string())
        .collect()
}
