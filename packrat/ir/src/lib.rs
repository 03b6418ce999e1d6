//! Internal representation of grammars and the services the optimization
//! passes share.
mod action;
mod analyzer;
mod attribute;
mod chars;
mod common;
mod config;
mod context;
mod copier;
mod element;
mod equivalence;
mod module;
mod printer;
mod production;
mod recursion;
mod renamer;
mod types;

pub mod ast;
pub mod from_ast;

pub use action::{Action, VALUE};
pub use analyzer::{
    Analyzer, CHOICE, MAX_COUNT, OPTION, PLUS, SEPARATOR, SHARED, SPLIT, STAR,
    TAIL, VARIABLE,
};
pub use attribute::{Attribute, Attributes, GetAttributes};
pub use chars::{CharClass, CharRange};
pub use common::{RRC, rrc};
pub use config::Config;
pub use context::{Context, ExtraOpts};
pub use copier::Copier;
pub use element::{
    Binding, BindingId, BindingRef, CharCase, CharSwitch, Element,
    GenericValue, NonTerminal, OrderedChoice, Sequence, StringMatch,
};
pub use equivalence::EquivalenceTester;
pub use from_ast::ast_to_ir;
pub use module::{DependencyKind, Grammar, Module, ModuleDependency};
pub use printer::Printer;
pub use production::{
    Cost, GenericKind, MetaData, Production, ProductionKind, Props,
};
pub use recursion::{NeverTransformable, TransformOracle, is_base, is_recursive};
pub use renamer::{Renamer, Translation};
pub use types::Type;
