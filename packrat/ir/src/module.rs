use crate::{
    Action, Attribute, Attributes, GetAttributes, Production, RRC, rrc,
};
use packrat_utils::{GetName, Id};

/// The ways a module can depend on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyKind {
    Import,
    Instantiation,
    Modification,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDependency {
    pub kind: DependencyKind,
    pub module: Id,
    pub arguments: Vec<Id>,
    /// The name the dependency is visible under, if it is renamed.
    pub target: Option<Id>,
}

impl ModuleDependency {
    pub fn new(
        kind: DependencyKind,
        module: Id,
        arguments: Vec<Id>,
        target: Option<Id>,
    ) -> Self {
        ModuleDependency {
            kind,
            module,
            arguments,
            target: target.filter(|t| *t != module),
        }
    }
}

/// A grammar module. Productions are shared through [RRC] handles; use the
/// [crate::Copier] for an independent copy.
#[derive(Debug, Default)]
pub struct Module {
    pub name: Id,
    pub header: Option<Action>,
    pub body: Option<Action>,
    pub footer: Option<Action>,
    pub attributes: Attributes,
    pub dependencies: Vec<ModuleDependency>,
    pub productions: Vec<RRC<Production>>,
    /// The production every other public production is reachable from,
    /// once known.
    pub root: Option<Id>,
}

impl Module {
    pub fn new(name: Id, productions: Vec<Production>) -> Self {
        Module {
            name,
            productions: productions.into_iter().map(rrc).collect(),
            ..Default::default()
        }
    }

    pub fn has_attribute(&self, attr: Attribute) -> bool {
        self.attributes.has(attr)
    }

    /// Whether productions can carry state across invocations.
    pub fn is_stateful(&self) -> bool {
        self.has_attribute(Attribute::Stateful)
    }

    pub fn find(&self, name: Id) -> Option<RRC<Production>> {
        self.productions
            .iter()
            .find(|p| {
                let p = p.borrow();
                p.qualified_name() == name || p.name == name
            })
            .cloned()
    }
}

impl GetName for Module {
    fn name(&self) -> Id {
        self.name
    }
}

impl GetAttributes for Module {
    fn get_attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn get_mut_attributes(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

/// A complete grammar.
#[derive(Debug, Default)]
pub struct Grammar {
    pub modules: Vec<Module>,
}

impl Grammar {
    pub fn new(modules: Vec<Module>) -> Self {
        Grammar { modules }
    }
}
