use crate::GSym;

/// Separator between a module name and a production name in a qualified
/// nonterminal.
pub const QUALIFIER_SEPARATOR: char = '.';

/// Represents an identifier in a grammar: a nonterminal, a bound variable,
/// a module name, or a node marker.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id {
    id: GSym,
}

impl Id {
    pub fn new<S: ToString>(id: S) -> Self {
        Self {
            id: GSym::new(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.id.as_str()
    }

    /// Returns true if this identifier contains a module qualifier.
    pub fn is_qualified(&self) -> bool {
        self.as_str().contains(QUALIFIER_SEPARATOR)
    }

    /// Qualify this identifier with `module`. Already qualified identifiers
    /// are returned unchanged.
    pub fn qualify(&self, module: Id) -> Id {
        if self.is_qualified() {
            *self
        } else {
            Id::new(format!("{module}{QUALIFIER_SEPARATOR}{self}"))
        }
    }

    /// Strip the module qualifier, if any.
    pub fn unqualify(&self) -> Id {
        match self.as_str().rsplit_once(QUALIFIER_SEPARATOR) {
            Some((_, name)) => Id::new(name),
            None => *self,
        }
    }

    /// The module qualifier, if any.
    pub fn qualifier(&self) -> Option<Id> {
        self.as_str()
            .rsplit_once(QUALIFIER_SEPARATOR)
            .map(|(module, _)| Id::new(module))
    }
}

/* =================== Impls for Id to make them easier to use ============== */

impl Default for Id {
    fn default() -> Self {
        Id::new("")
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.id, f)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.id, f)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::new(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::new(s)
    }
}

impl PartialEq<GSym> for Id {
    fn eq(&self, other: &GSym) -> bool {
        self.id == *other
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.id == GSym::new(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.id == GSym::new(other)
    }
}

impl PartialEq<String> for Id {
    fn eq(&self, other: &String) -> bool {
        self.id == GSym::new(other)
    }
}

/// A trait representing something in the IR that has a name.
pub trait GetName {
    /// Return a reference to the object's name
    fn name(&self) -> Id;
}

#[cfg(test)]
mod tests {
    use super::Id;

    #[test]
    fn qualification() {
        let nt = Id::new("Expression");
        let q = nt.qualify(Id::new("xtc.lang.Java"));
        assert_eq!(q, "xtc.lang.Java.Expression");
        assert_eq!(q.unqualify(), "Expression");
        assert_eq!(q.qualifier(), Some(Id::new("xtc.lang.Java")));
        assert_eq!(q.qualify(Id::new("other")), q);
        assert_eq!(nt.qualifier(), None);
    }
}
