//! Declared types of productions and bound elements. The host-language type
//! system is opaque to the optimizer; only the shape of the tag matters.
use packrat_utils::Id;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Type {
    /// No semantic value.
    #[default]
    Void,
    /// The text matched by a production.
    String,
    /// A statically typed AST node.
    Node,
    /// A dynamically typed node built by generic productions.
    Generic,
    /// A token carrying its text.
    Token,
    /// A single character.
    Char,
    /// Any value.
    Any,
    /// An unknown type that unifies with everything.
    Wildcard,
    /// A list of values.
    List(Box<Type>),
    /// A deferred action producing a value.
    Action(Box<Type>),
    /// Any other host-language type.
    Named(Id),
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String)
    }

    /// Generic nodes and tokens are nodes too.
    pub fn is_node(&self) -> bool {
        matches!(self, Type::Node | Type::Generic | Type::Token)
    }

    pub fn is_generic_node(&self) -> bool {
        matches!(self, Type::Generic)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Type::List(_))
    }

    /// The element type of a list or action type.
    pub fn argument(&self) -> Option<&Type> {
        match self {
            Type::List(t) | Type::Action(t) => Some(t),
            _ => None,
        }
    }

    /// Unify two types. In strict mode, incompatible types fail to unify;
    /// otherwise they unify to [Type::Any].
    pub fn unify(&self, other: &Type, strict: bool) -> Option<Type> {
        let result = match (self, other) {
            _ if self == other => Some(self.clone()),
            (Type::Wildcard, t) | (t, Type::Wildcard) => Some(t.clone()),
            (Type::List(a), Type::List(b)) => {
                a.unify(b, true).map(Type::list)
            }
            (Type::Action(a), Type::Action(b)) => {
                a.unify(b, true).map(|t| Type::Action(Box::new(t)))
            }
            (a, b) if a.is_node() && b.is_node() => Some(Type::Node),
            _ => None,
        };
        match result {
            None if !strict => Some(Type::Any),
            r => r,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::String => write!(f, "String"),
            Type::Node => write!(f, "Node"),
            Type::Generic => write!(f, "generic"),
            Type::Token => write!(f, "Token"),
            Type::Char => write!(f, "char"),
            Type::Any => write!(f, "Object"),
            Type::Wildcard => write!(f, "?"),
            Type::List(t) => write!(f, "Pair<{t}>"),
            Type::Action(t) => write!(f, "Action<{t}>"),
            Type::Named(name) => write!(f, "{name}"),
        }
    }
}
