use packrat_utils::Id;
use smallvec::SmallVec;
use std::fmt;

/// Attributes of productions and modules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Public,
    Transient,
    Inline,
    Memoized,
    Stateful,
    Resetting,
    Explicit,
    NoInline,
    /// Module only: generic productions have no value.
    GenericAsVoid,
    /// Module only: keep formatting in the parse tree.
    WithParseTree,
    /// Module only: suppress warnings.
    NoWarnings,
    /// Module only: bindings are constant.
    Constant,
    /// Attribute without meaning to the optimizer.
    Other(Id),
}

impl Attribute {
    pub fn from_name(name: &str) -> Self {
        match name {
            "public" => Attribute::Public,
            "transient" => Attribute::Transient,
            "inline" => Attribute::Inline,
            "memoized" => Attribute::Memoized,
            "stateful" => Attribute::Stateful,
            "resetting" => Attribute::Resetting,
            "explicit" => Attribute::Explicit,
            "noinline" | "no-inline" => Attribute::NoInline,
            "genericAsVoid" => Attribute::GenericAsVoid,
            "withParseTree" => Attribute::WithParseTree,
            "nowarn" | "noWarnings" => Attribute::NoWarnings,
            "constant" => Attribute::Constant,
            other => Attribute::Other(Id::new(other)),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Public => "public",
            Attribute::Transient => "transient",
            Attribute::Inline => "inline",
            Attribute::Memoized => "memoized",
            Attribute::Stateful => "stateful",
            Attribute::Resetting => "resetting",
            Attribute::Explicit => "explicit",
            Attribute::NoInline => "noinline",
            Attribute::GenericAsVoid => "genericAsVoid",
            Attribute::WithParseTree => "withParseTree",
            Attribute::NoWarnings => "nowarn",
            Attribute::Constant => "constant",
            Attribute::Other(id) => id.as_str(),
        };
        write!(f, "{name}")
    }
}

/// A set of attributes. Order is irrelevant for equality but preserved for
/// printing.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    attrs: SmallVec<[Attribute; 4]>,
}

impl Attributes {
    pub fn has(&self, attr: Attribute) -> bool {
        self.attrs.contains(&attr)
    }

    pub fn insert(&mut self, attr: Attribute) {
        if !self.has(attr) {
            self.attrs.push(attr);
        }
    }

    pub fn remove(&mut self, attr: Attribute) {
        self.attrs.retain(|a| *a != attr);
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.attrs.iter().all(|a| other.has(*a))
    }
}

impl Eq for Attributes {}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut attrs = Attributes::default();
        for attr in iter {
            attrs.insert(attr);
        }
        attrs
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

/// Structures that carry an attribute set.
pub trait GetAttributes {
    fn get_attributes(&self) -> &Attributes;
    fn get_mut_attributes(&mut self) -> &mut Attributes;
}
